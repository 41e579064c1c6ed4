use contracts::{AgentHistoryPoint, CheckpointPayload};
use rayon::prelude::*;

use crate::{compute_metrics_with, MetricsConfig};

/// Builds the moral/non-moral population series for a run.
///
/// Input order does not matter; the result is sorted by time step. Checkpoints
/// without metrics are skipped rather than plotted as zero.
pub fn agent_history(
    checkpoints: &[(i64, CheckpointPayload)],
    config: &MetricsConfig,
) -> Vec<AgentHistoryPoint> {
    let point = |(time_step, payload): &(i64, CheckpointPayload)| {
        compute_metrics_with(payload, config).map(|metrics| AgentHistoryPoint {
            time_step: *time_step,
            moral_agents: metrics.moral_agents,
            non_moral_agents: metrics.non_moral_agents,
        })
    };

    let mut points = if checkpoints.len() <= 1 {
        checkpoints.iter().filter_map(point).collect::<Vec<_>>()
    } else {
        checkpoints.par_iter().filter_map(point).collect::<Vec<_>>()
    };

    points.sort_by_key(|point| point.time_step);
    points
}
