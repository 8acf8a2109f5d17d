//! Arena Core - Discrete-Time Rank-Combat Engine
//!
//! A closed population of agents drifts around a rectangular arena. Agents
//! of equal rank that touch start a fight; fight outcomes are decided by an
//! external collaborator and arrive asynchronously, correlated to the tick
//! that asked for them. Winners climb a rank, losers drop one, and an agent
//! reaching the top rank retires.
//!
//! 1. **Motion**: fixed unit step per tick, sign-flip reflection at walls
//! 2. **Pairing**: same-rank circle overlap, first match in population order
//! 3. **Resolution**: tick-correlated request/response with pending buckets

pub mod agent;
pub mod config;
pub mod engine;
pub mod init;
pub mod motion;
pub mod pairing;
pub mod population;
pub mod resolution;
pub mod snapshot;

// Re-export key types for convenience
pub use agent::{Agent, LifecycleState};
pub use config::{ArenaConfig, ConfigError};
pub use engine::{Engine, EngineStats, TickOutput};
pub use init::spawn_population;
pub use pairing::{CombatPair, ExclusiveMatch, FirstMatch, PairingPolicy};
pub use population::{InvariantViolation, Population};
pub use resolution::{PendingBucket, ResolutionReport, ResolutionStatus};
pub use snapshot::{AgentView, WorldSnapshot};
