//! Read models for dashboard panels (grid, agent roster, agent detail, timeline).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionKind, AgentAction, GridPosition};

pub const DEFAULT_GRID_SIZE: u32 = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<GridCell>,
    pub out_of_bounds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub position: GridPosition,
    pub resources: Vec<CellResource>,
    pub agents: Vec<CellAgent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellResource {
    pub id: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CellAgent {
    pub id: String,
    pub agent_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentRosterEntry {
    pub id: String,
    pub agent_type: String,
    pub hp: f64,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Wounded,
    Critical,
}

impl HealthBand {
    pub fn from_hp(hp: f64) -> Self {
        if hp > 70.0 {
            Self::Healthy
        } else if hp > 30.0 {
            Self::Wounded
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryGroup {
    pub resource_id: String,
    pub quantity: f64,
    pub stacks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentAction {
    /// Position in the agent's full action history.
    pub index: usize,
    pub kind: ActionKind,
    pub action: AgentAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDetail {
    pub id: String,
    pub agent_type: String,
    pub hp: f64,
    /// HP clamped to the 0..=100 gauge.
    pub hp_gauge: f64,
    pub health: HealthBand,
    pub age: Option<f64>,
    pub location: Option<GridPosition>,
    pub parent_id: Option<String>,
    pub extra_state: BTreeMap<String, Value>,
    pub inventory: Vec<InventoryGroup>,
    pub recent_actions: Vec<RecentAction>,
    pub total_actions: usize,
    pub is_current: bool,
    pub memory: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBounds {
    pub min_time_step: Option<i64>,
    pub max_time_step: Option<i64>,
    pub time_steps: Vec<i64>,
}
