use contracts::{CheckpointPayload, MetricsSummary};

use crate::MetricsConfig;

const REPUTATION_KEY: &str = "reputation";

/// Summarizes one checkpoint with the default (case-sensitive) label policy.
///
/// Returns `None` when the checkpoint has no `social_environment.agents` or no
/// `physical_environment.resources` key at all. Present-but-empty collections
/// produce a zeroed summary instead.
pub fn compute_metrics(checkpoint: &CheckpointPayload) -> Option<MetricsSummary> {
    compute_metrics_with(checkpoint, &MetricsConfig::default())
}

pub fn compute_metrics_with(
    checkpoint: &CheckpointPayload,
    config: &MetricsConfig,
) -> Option<MetricsSummary> {
    let agents = checkpoint.agents()?;
    let resources = checkpoint.resources()?;

    let total_agents = agents.len();
    let moral_agents = agents
        .iter()
        .filter(|agent| config.moral_label_match.is_moral(&agent.agent_type))
        .count();

    let (average_hp, min_hp, max_hp) =
        spread(agents.iter().map(|agent| agent.state.hp)).unwrap_or((0.0, 0.0, 0.0));
    let reputation = spread(agents.iter().filter_map(|agent| {
        agent
            .state
            .extra
            .get(REPUTATION_KEY)
            .and_then(|value| value.as_f64())
    }));

    let total_resources = resources.iter().map(|resource| resource.quantity).sum::<f64>();
    let average_resources = if resources.is_empty() {
        0.0
    } else {
        total_resources / resources.len() as f64
    };

    Some(MetricsSummary {
        total_agents,
        moral_agents,
        non_moral_agents: total_agents - moral_agents,
        average_hp,
        min_hp,
        max_hp,
        total_resources,
        average_resources,
        crisis_level: checkpoint.crisis_level().unwrap_or(0.0),
        average_reputation: reputation.map(|(average, _, _)| average),
        min_reputation: reputation.map(|(_, min, _)| min),
        max_reputation: reputation.map(|(_, _, max)| max),
    })
}

/// Average, min and max in one pass; `None` for an empty sequence.
fn spread(mut values: impl Iterator<Item = f64>) -> Option<(f64, f64, f64)> {
    let first = values.next()?;
    let (sum, count, min, max) = values.fold(
        (first, 1_usize, first, first),
        |(sum, count, min, max), value| (sum + value, count + 1, min.min(value), max.max(value)),
    );
    Some((sum / count as f64, min, max))
}
