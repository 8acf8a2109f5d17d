//! Common types shared between the engine and its collaborators.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Integer 2-D vector used for positions, velocities and outcome vectors.
pub type Vec2i = Vector2<i32>;

/// Unique identifier for an agent.
///
/// Assigned once at population creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier delivered by the tick source.
///
/// Expected to increase, but the engine does not key anything on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TickId(pub u64);

impl std::fmt::Display for TickId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Tag correlating an outcome request with its response.
///
/// Minted by the engine from a monotonic counter, one per tick, so two
/// pending buckets can never share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub u64);

impl CorrelationId {
    /// Returns the id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Which agent of a combat pair wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

/// Result of one fight, as drawn by the randomness collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightOutcome {
    /// Winning side of the pair
    pub side: Side,

    /// Post-fight velocity, applied to the winner only
    pub vector: Vec2i,
}

impl FightOutcome {
    /// Creates an outcome from a side and a velocity.
    pub fn new(side: Side, vx: i32, vy: i32) -> Self {
        Self {
            side,
            vector: Vec2i::new(vx, vy),
        }
    }
}

/// Request for `count` outcomes, tagged with a correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub correlation_id: CorrelationId,
    pub count: usize,
}

/// Ordered outcomes answering an earlier [`OutcomeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeResponse {
    pub correlation_id: CorrelationId,
    pub outcomes: Vec<FightOutcome>,
}

impl OutcomeResponse {
    /// Creates a response.
    pub fn new(correlation_id: CorrelationId, outcomes: Vec<FightOutcome>) -> Self {
        Self {
            correlation_id,
            outcomes,
        }
    }

    /// Returns the number of outcomes carried.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the response carries no outcomes.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
