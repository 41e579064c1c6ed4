use contracts::CheckpointPayload;
use metrics_core::{compute_metrics, compute_metrics_with, MetricsConfig, MoralLabelMatch};
use proptest::prelude::*;
use serde_json::{json, Value};

fn build_checkpoint(agents: &[(String, f64)], resources: &[f64]) -> CheckpointPayload {
    let agents = agents
        .iter()
        .enumerate()
        .map(|(i, (agent_type, hp))| {
            json!({ "id": format!("agent_{i}"), "type": agent_type, "state": { "hp": hp } })
        })
        .collect::<Vec<Value>>();
    let resources = resources
        .iter()
        .map(|quantity| json!({ "quantity": quantity }))
        .collect::<Vec<Value>>();

    CheckpointPayload::from_value(&json!({
        "social_environment": { "agents": agents },
        "physical_environment": { "resources": resources, "crisis": { "level": 1 } }
    }))
    .expect("generated checkpoint should decode")
}

fn agent_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("moral".to_string()),
        Just("immoral".to_string()),
        Just("neutral".to_string()),
        Just("Moral".to_string()),
    ]
}

fn population() -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec((agent_type(), 0.0_f64..200.0), 0..40)
}

#[test]
fn documented_scenarios() {
    let mixed = build_checkpoint(
        &[
            ("moral".to_string(), 10.0),
            ("immoral".to_string(), 20.0),
            ("moral".to_string(), 30.0),
        ],
        &[],
    );
    let metrics = compute_metrics(&mixed).expect("metrics");
    assert_eq!(
        (metrics.total_agents, metrics.moral_agents, metrics.non_moral_agents),
        (3, 2, 1)
    );
    assert_eq!((metrics.average_hp, metrics.min_hp, metrics.max_hp), (20.0, 10.0, 30.0));

    let empty_agents = build_checkpoint(&[], &[5.0, 15.0]);
    let metrics = compute_metrics(&empty_agents).expect("metrics");
    assert_eq!(metrics.total_agents, 0);
    assert_eq!((metrics.average_hp, metrics.min_hp, metrics.max_hp), (0.0, 0.0, 0.0));
    assert_eq!(metrics.total_resources, 20.0);
    assert_eq!(metrics.average_resources, 10.0);

    let no_social = CheckpointPayload::from_value(&json!({
        "physical_environment": { "resources": [] }
    }))
    .expect("decode");
    assert!(compute_metrics(&no_social).is_none());

    let neutral = build_checkpoint(&[("neutral".to_string(), 50.0)], &[]);
    let metrics = compute_metrics(&neutral).expect("metrics");
    assert_eq!(metrics.non_moral_agents, 1);
    assert_eq!(metrics.total_agents, 1);
}

proptest! {
    #[test]
    fn categories_partition_total(agents in population(), resources in prop::collection::vec(0.0_f64..50.0, 0..10)) {
        let checkpoint = build_checkpoint(&agents, &resources);
        for policy in [MoralLabelMatch::Exact, MoralLabelMatch::CaseInsensitive] {
            let config = MetricsConfig { moral_label_match: policy };
            let metrics = compute_metrics_with(&checkpoint, &config).expect("metrics");
            prop_assert_eq!(metrics.moral_agents + metrics.non_moral_agents, metrics.total_agents);
            prop_assert_eq!(metrics.total_agents, agents.len());
        }
    }

    #[test]
    fn average_hp_within_range(agents in population()) {
        let metrics = compute_metrics(&build_checkpoint(&agents, &[])).expect("metrics");
        if metrics.total_agents > 0 {
            prop_assert!(metrics.min_hp <= metrics.average_hp + 1e-9);
            prop_assert!(metrics.average_hp <= metrics.max_hp + 1e-9);
        } else {
            prop_assert_eq!((metrics.average_hp, metrics.min_hp, metrics.max_hp), (0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn empty_resources_never_nan(agents in population()) {
        let metrics = compute_metrics(&build_checkpoint(&agents, &[])).expect("metrics");
        prop_assert_eq!(metrics.average_resources, 0.0);
        prop_assert_eq!(metrics.total_resources, 0.0);
    }

    #[test]
    fn repeated_calls_are_identical(agents in population(), resources in prop::collection::vec(0.0_f64..50.0, 0..10)) {
        let checkpoint = build_checkpoint(&agents, &resources);
        let before = checkpoint.clone();
        let first = compute_metrics(&checkpoint);
        let second = compute_metrics(&checkpoint);
        prop_assert_eq!(first, second);
        prop_assert_eq!(checkpoint, before);
    }

    #[test]
    fn agent_order_does_not_matter(agents in population(), rotate in 0_usize..40) {
        let mut permuted = agents.clone();
        permuted.reverse();
        if !permuted.is_empty() {
            let shift = rotate % permuted.len();
            permuted.rotate_left(shift);
        }

        let original = compute_metrics(&build_checkpoint(&agents, &[])).expect("metrics");
        let shuffled = compute_metrics(&build_checkpoint(&permuted, &[])).expect("metrics");

        prop_assert_eq!(original.total_agents, shuffled.total_agents);
        prop_assert_eq!(original.moral_agents, shuffled.moral_agents);
        prop_assert_eq!(original.non_moral_agents, shuffled.non_moral_agents);
        prop_assert_eq!(original.min_hp, shuffled.min_hp);
        prop_assert_eq!(original.max_hp, shuffled.max_hp);
        prop_assert!((original.average_hp - shuffled.average_hp).abs() < 1e-9);
    }
}
