//! Typed schema for one simulation checkpoint as written by the morality simulation.
//!
//! Every section is optional on the wire. Collections the aggregator depends on are
//! `Option<Vec<_>>` so a missing key and an empty array stay distinguishable.
//! Fields the aggregator never reads decode leniently: missing or `null` means default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckpointPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CheckpointMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_environment: Option<PhysicalEnvironment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_environment: Option<SocialEnvironment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Events>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Logs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub observations: Vec<Value>,
}

impl CheckpointPayload {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn agents(&self) -> Option<&[Agent]> {
        self.social_environment
            .as_ref()
            .and_then(|social| social.agents.as_deref())
    }

    pub fn resources(&self) -> Option<&[Resource]> {
        self.physical_environment
            .as_ref()
            .and_then(|physical| physical.resources.as_deref())
    }

    pub fn crisis_level(&self) -> Option<f64> {
        self.physical_environment
            .as_ref()
            .and_then(|physical| physical.crisis.as_ref())
            .and_then(|crisis| crisis.level)
    }

    /// Grid size, preferring the physical layer's dimensions over the social layer's.
    pub fn dimensions(&self) -> Option<[u32; 2]> {
        self.physical_environment
            .as_ref()
            .and_then(|physical| physical.dimensions)
            .or_else(|| {
                self.social_environment
                    .as_ref()
                    .and_then(|social| social.dimensions)
            })
    }

    /// Id of the agent whose turn it is, if the metadata carries an execution queue.
    pub fn current_agent_id(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        let index = usize::try_from(metadata.current_agent_index?).ok()?;
        metadata.excution_queue.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckpointMetadata {
    pub run_id: Option<String>,
    pub version: Option<String>,
    pub start_date: Option<String>,
    pub description: Option<String>,
    /// Wire name carries the simulation's spelling.
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub excution_queue: Vec<String>,
    pub simulation_name: Option<String>,
    pub total_time_steps: Option<i64>,
    pub current_time_step: Option<i64>,
    pub current_agent_index: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Events {
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub action_logs: Vec<Value>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub global_events: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Logs {
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub debug_logs: Vec<Value>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub error_logs: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPosition {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhysicalEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis: Option<Crisis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<[u32; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Crisis {
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub affected_areas: Vec<Value>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub crisis_probability: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub id: String,
    #[serde(default)]
    pub location: Option<GridPosition>,
    pub quantity: f64,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub regrow_time_remaining: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<Agent>>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub cemetery: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub id: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub state: AgentState,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub inventory: Vec<InventoryItem>,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub action_history: Vec<AgentAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub hp: f64,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub location: Option<GridPosition>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Simulation-specific state (reputation, food_stock, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    /// Some simulation versions label inventory entries with `type` instead.
    #[serde(
        default,
        alias = "type",
        deserialize_with = "crate::serde_null_default::deserialize"
    )]
    pub resource_id: String,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentAction {
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub action_type: String,
    #[serde(default, deserialize_with = "crate::serde_null_default::deserialize")]
    pub reason: String,
    /// Variant-specific fields such as `target_agent_id` or `target_location`.
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl AgentAction {
    pub fn kind(&self) -> ActionKind {
        ActionKind::parse(&self.action_type)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Move,
    Collect,
    Consume,
    Share,
    Attack,
    Rob,
    Reproduce,
    Communicate,
    DoNothing,
    Other,
}

impl ActionKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "move" => Self::Move,
            "collect" => Self::Collect,
            "consume" => Self::Consume,
            "share" => Self::Share,
            "attack" => Self::Attack,
            "rob" => Self::Rob,
            "reproduce" => Self::Reproduce,
            "communicate" => Self::Communicate,
            "do_nothing" | "donothing" => Self::DoNothing,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_empty_collections_stay_distinct() {
        let missing = CheckpointPayload::from_value(&json!({
            "social_environment": {},
            "physical_environment": { "resources": [] }
        }))
        .expect("decode");
        assert!(missing.agents().is_none());
        assert_eq!(missing.resources().map(<[Resource]>::len), Some(0));

        let empty = CheckpointPayload::from_value(&json!({
            "social_environment": { "agents": [] }
        }))
        .expect("decode");
        assert_eq!(empty.agents().map(<[Agent]>::len), Some(0));
        assert!(empty.resources().is_none());
    }

    #[test]
    fn agent_state_keeps_simulation_specific_fields() {
        let agent: Agent = serde_json::from_value(json!({
            "id": "a1",
            "type": "moral",
            "state": { "hp": 42, "age": 3, "reputation": -1, "food_stock": 2 },
            "action_history": [
                { "action_type": "Share", "reason": "kin", "target_agent_id": "a2" }
            ]
        }))
        .expect("decode agent");

        assert_eq!(agent.state.hp, 42.0);
        assert_eq!(agent.state.extra.get("reputation"), Some(&json!(-1)));
        assert_eq!(agent.action_history[0].kind(), ActionKind::Share);
        assert_eq!(
            agent.action_history[0].details.get("target_agent_id"),
            Some(&json!("a2"))
        );
    }

    #[test]
    fn current_agent_resolves_from_execution_queue() {
        let payload = CheckpointPayload::from_value(&json!({
            "metadata": { "excution_queue": ["a1", "a2"], "current_agent_index": 1 }
        }))
        .expect("decode");
        assert_eq!(payload.current_agent_id(), Some("a2"));

        let out_of_range = CheckpointPayload::from_value(&json!({
            "metadata": { "excution_queue": ["a1"], "current_agent_index": 4 }
        }))
        .expect("decode");
        assert_eq!(out_of_range.current_agent_id(), None);
    }

    #[test]
    fn alternate_inventory_and_action_shapes_decode() {
        let agent: Agent = serde_json::from_value(json!({
            "id": "a1",
            "type": "moral",
            "state": { "hp": 100 },
            "inventory": [{ "type": "berries", "quantity": 2, "phase": "ripe" }],
            "action_history": [
                { "at_time_step": 3, "reasoning": "hungry", "actions": ["collect"] }
            ]
        }))
        .expect("decode agent");

        assert_eq!(agent.inventory[0].resource_id, "berries");
        assert_eq!(agent.action_history[0].action_type, "");
        assert_eq!(agent.action_history[0].kind(), ActionKind::Other);
        assert_eq!(
            agent.action_history[0].details.get("reasoning"),
            Some(&json!("hungry"))
        );
    }

    #[test]
    fn null_peripheral_fields_decode_as_defaults() {
        let payload = CheckpointPayload::from_value(&json!({
            "metadata": { "excution_queue": null },
            "physical_environment": {
                "crisis": { "level": 1, "affected_areas": null, "crisis_probability": null },
                "resources": [{ "id": null, "quantity": 3, "regrow_time_remaining": null }]
            },
            "social_environment": {
                "agents": [{ "type": "moral", "state": { "hp": 5 }, "inventory": null, "action_history": null }],
                "cemetery": null,
                "relationships": null
            },
            "events": { "action_logs": null, "global_events": [{ "kind": "storm" }] },
            "logs": { "debug_logs": null },
            "observations": null
        }))
        .expect("decode");

        assert_eq!(payload.agents().map(<[Agent]>::len), Some(1));
        assert_eq!(payload.resources().map(<[Resource]>::len), Some(1));
        assert_eq!(payload.crisis_level(), Some(1.0));
        assert!(payload.observations.is_empty());
    }

    #[test]
    fn agent_without_hp_is_rejected() {
        let decoded = CheckpointPayload::from_value(&json!({
            "social_environment": { "agents": [{ "id": "a1", "type": "moral", "state": {} }] }
        }));
        assert!(decoded.is_err());
    }
}
