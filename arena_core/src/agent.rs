//! The per-entity record and its lifecycle state machine.
//!
//! ```text
//!              pairing found              k == fight_duration
//!  Floating ─────────────────► Fighting(0) ··· Fighting(k) ─────────► Floating
//!     │                                     k+1 each tick
//!     │ rank == max_rank (motion phase)
//!     ▼
//!  Finished (terminal)
//! ```

use arena_env::{AgentId, Vec2i};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Moving freely, eligible for pairing
    Floating,

    /// Engaged; `elapsed` counts ticks since the fight started
    Fighting { elapsed: u32 },

    /// Retired at max rank; never changes again
    Finished,
}

/// One simulated agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique for the agent's lifetime
    pub id: AgentId,

    /// Center position
    pub position: Vec2i,

    /// Per-tick displacement while floating
    pub velocity: Vec2i,

    /// Shared across all agents of a run
    pub radius: i32,

    /// Always within `0..=max_rank`
    pub rank: u32,

    pub state: LifecycleState,
}

impl Agent {
    /// Creates a fresh rank-0 floating agent.
    pub fn new(id: AgentId, position: Vec2i, velocity: Vec2i, radius: i32) -> Self {
        Self {
            id,
            position,
            velocity,
            radius,
            rank: 0,
            state: LifecycleState::Floating,
        }
    }

    /// Sets the starting rank (builder-style, used by tests and fixtures).
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.state, LifecycleState::Floating)
    }

    pub fn is_fighting(&self) -> bool {
        matches!(self.state, LifecycleState::Fighting { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, LifecycleState::Finished)
    }

    /// `Floating → Fighting(0)`. Returns false if the agent was not floating.
    pub fn start_fight(&mut self) -> bool {
        if self.is_floating() {
            self.state = LifecycleState::Fighting { elapsed: 0 };
            true
        } else {
            false
        }
    }

    /// Advances the fight timer by one tick.
    ///
    /// `Fighting(k) → Fighting(k+1)` while `k < fight_duration`, then
    /// `Fighting(fight_duration) → Floating`. Returns true when the agent
    /// was released back to floating. Other states are untouched.
    pub fn advance_fight_timer(&mut self, fight_duration: u32) -> bool {
        match self.state {
            LifecycleState::Fighting { elapsed } if elapsed < fight_duration => {
                self.state = LifecycleState::Fighting {
                    elapsed: elapsed + 1,
                };
                false
            }
            LifecycleState::Fighting { .. } => {
                self.state = LifecycleState::Floating;
                true
            }
            LifecycleState::Floating | LifecycleState::Finished => false,
        }
    }

    /// `Floating → Finished`. Returns false if the agent was not floating.
    pub fn retire(&mut self) -> bool {
        if self.is_floating() {
            self.state = LifecycleState::Finished;
            true
        } else {
            false
        }
    }

    /// Squared center-to-center distance.
    pub fn distance_sq(&self, other: &Agent) -> i64 {
        let dx = (self.position.x - other.position.x) as i64;
        let dy = (self.position.y - other.position.y) as i64;
        dx * dx + dy * dy
    }

    /// True when the two circles touch or overlap.
    pub fn in_combat_range(&self, other: &Agent) -> bool {
        let reach = (self.radius + other.radius) as i64;
        self.distance_sq(other) <= reach * reach
    }

    /// Applies a win: one rank up (capped), velocity replaced.
    pub fn apply_win(&mut self, vector: Vec2i, max_rank: u32) {
        self.rank = (self.rank + 1).min(max_rank);
        self.velocity = vector;
    }

    /// Applies a loss: one rank down, floored at zero. Velocity is kept.
    pub fn apply_loss(&mut self) {
        self.rank = self.rank.saturating_sub(1);
    }
}
