//! Arena Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seams that let the arena engine run
//! in both **Production** (tokio) and **Simulation** (seeded, virtual clock)
//! environments.
//!
//! # Core Concept: The Reactor Pattern
//!
//! The engine itself never draws a random number and never waits on a clock.
//! Everything it cannot decide deterministically goes through a collaborator:
//! - Time (`now()`, `sleep()`) paces the tick source
//! - Fight outcomes (`request()`, `recv()`) come from an [`OutcomeSource`]
//! - Randomness for initialization comes from [`ArenaContext::derive_rng`]
//!
//! By deriving all entropy from a single 64-bit seed, any run becomes
//! reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use arena_env::{ArenaContext, OutcomeSource};
//!
//! async fn drive<Ctx: ArenaContext, Src: OutcomeSource>(ctx: &Ctx, src: &Src) {
//!     loop {
//!         tokio::select! {
//!             response = src.recv() => apply(response),
//!             _ = ctx.sleep(Duration::from_millis(33)) => tick(),
//!         }
//!     }
//! }
//! ```

mod context;
mod outcome;
mod types;
mod error;
mod tokio_impl;

pub use context::ArenaContext;
pub use outcome::{OutcomePolicy, OutcomeSource};
pub use types::{
    AgentId, CorrelationId, FightOutcome, OutcomeRequest, OutcomeResponse, Side, TickId, Vec2i,
};
pub use error::EnvError;
pub use tokio_impl::{TokioContext, TokioOutcomeSource};
