//! Read-only observation of the arena for rendering collaborators.

use crate::agent::{Agent, LifecycleState};
use arena_env::{AgentId, TickId};
use serde::{Deserialize, Serialize};

/// What a renderer needs to draw one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub rank: u32,
    #[serde(flatten)]
    pub state: LifecycleState,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            x: agent.position.x,
            y: agent.position.y,
            radius: agent.radius,
            rank: agent.rank,
            state: agent.state,
        }
    }
}

/// Snapshot of both collections after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Last tick processed, if any
    pub tick: Option<TickId>,

    pub arena_width: i32,
    pub arena_height: i32,

    pub active: Vec<AgentView>,

    /// In finish order
    pub finished: Vec<AgentView>,

    /// Outstanding outcome requests
    pub pending_buckets: usize,
}

impl WorldSnapshot {
    /// Number of active agents currently fighting.
    pub fn fighting_count(&self) -> usize {
        self.active
            .iter()
            .filter(|view| matches!(view.state, LifecycleState::Fighting { .. }))
            .count()
    }
}
