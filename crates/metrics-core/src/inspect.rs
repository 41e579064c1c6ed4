use std::collections::BTreeMap;

use contracts::views::{
    AgentDetail, AgentRosterEntry, CellAgent, CellResource, GridCell, GridView, HealthBand,
    InventoryGroup, RecentAction, TimelineBounds, DEFAULT_GRID_SIZE,
};
use contracts::{Agent, CheckpointPayload, GridPosition};

pub const DEFAULT_RECENT_ACTIONS: usize = 10;

/// State keys the agent detail panel renders in dedicated widgets.
const PROMOTED_STATE_KEYS: [&str; 4] = ["hp", "age", "location", "food_stock"];

pub fn grid_view(checkpoint: &CheckpointPayload) -> GridView {
    let [width, height] = checkpoint
        .dimensions()
        .unwrap_or([DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE]);
    let in_bounds = |position: &GridPosition| {
        position.x >= 0
            && position.y >= 0
            && position.x < i64::from(width)
            && position.y < i64::from(height)
    };

    let mut cells = BTreeMap::<(i64, i64), GridCell>::new();
    let mut out_of_bounds = 0_usize;

    for resource in checkpoint.resources().unwrap_or_default() {
        let Some(position) = resource.location else {
            continue;
        };
        if !in_bounds(&position) {
            out_of_bounds += 1;
            continue;
        }
        cell_at(&mut cells, position).resources.push(CellResource {
            id: resource.id.clone(),
            quantity: resource.quantity,
        });
    }

    for agent in checkpoint.agents().unwrap_or_default() {
        let Some(position) = agent.state.location else {
            continue;
        };
        if !in_bounds(&position) {
            out_of_bounds += 1;
            continue;
        }
        cell_at(&mut cells, position).agents.push(CellAgent {
            id: agent.id.clone(),
            agent_type: agent.agent_type.clone(),
        });
    }

    GridView {
        width,
        height,
        // Row-major: y first, then x.
        cells: cells.into_values().collect(),
        out_of_bounds,
    }
}

fn cell_at(cells: &mut BTreeMap<(i64, i64), GridCell>, position: GridPosition) -> &mut GridCell {
    cells
        .entry((position.y, position.x))
        .or_insert_with(|| GridCell {
            position,
            resources: Vec::new(),
            agents: Vec::new(),
        })
}

pub fn agent_roster(checkpoint: &CheckpointPayload) -> Vec<AgentRosterEntry> {
    let current = checkpoint.current_agent_id();
    checkpoint
        .agents()
        .unwrap_or_default()
        .iter()
        .map(|agent| AgentRosterEntry {
            id: agent.id.clone(),
            agent_type: agent.agent_type.clone(),
            hp: agent.state.hp,
            is_current: current == Some(agent.id.as_str()),
        })
        .collect()
}

/// Detail view for one agent, or `None` if no agent has that id.
pub fn agent_detail(
    checkpoint: &CheckpointPayload,
    agent_id: &str,
    recent_limit: usize,
) -> Option<AgentDetail> {
    let agent = checkpoint
        .agents()?
        .iter()
        .find(|agent| agent.id == agent_id)?;

    let extra_state = agent
        .state
        .extra
        .iter()
        .filter(|(key, _)| !PROMOTED_STATE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Some(AgentDetail {
        id: agent.id.clone(),
        agent_type: agent.agent_type.clone(),
        hp: agent.state.hp,
        hp_gauge: agent.state.hp.clamp(0.0, 100.0),
        health: HealthBand::from_hp(agent.state.hp),
        age: agent.state.age,
        location: agent.state.location,
        parent_id: agent.state.parent_id.clone(),
        extra_state,
        inventory: group_inventory(agent),
        recent_actions: recent_actions(agent, recent_limit),
        total_actions: agent.action_history.len(),
        is_current: checkpoint.current_agent_id() == Some(agent_id),
        memory: agent.memory.clone(),
    })
}

fn group_inventory(agent: &Agent) -> Vec<InventoryGroup> {
    let mut groups = BTreeMap::<&str, InventoryGroup>::new();
    for item in &agent.inventory {
        let group = groups
            .entry(item.resource_id.as_str())
            .or_insert_with(|| InventoryGroup {
                resource_id: item.resource_id.clone(),
                quantity: 0.0,
                stacks: 0,
            });
        group.quantity += item.quantity;
        group.stacks += 1;
    }
    groups.into_values().collect()
}

fn recent_actions(agent: &Agent, limit: usize) -> Vec<RecentAction> {
    agent
        .action_history
        .iter()
        .enumerate()
        .rev()
        .take(limit)
        .map(|(index, action)| RecentAction {
            index,
            kind: action.kind(),
            action: action.clone(),
        })
        .collect()
}

pub fn timeline_bounds(time_steps: &[i64]) -> TimelineBounds {
    let mut steps = time_steps.to_vec();
    steps.sort_unstable();
    steps.dedup();

    TimelineBounds {
        min_time_step: steps.first().copied(),
        max_time_step: steps.last().copied(),
        time_steps: steps,
    }
}
