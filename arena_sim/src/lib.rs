//! Arena Deterministic Simulation Testing (DST) Harness
//!
//! This crate provides a controlled environment in which the rank-combat
//! engine runs deterministically, plus a realtime driver for wall-clock runs.
//!
//! # Core Principle: Everything Comes From Outside
//!
//! The engine owns no clock, no randomness and no I/O. The harness supplies:
//! - **Ticks**: monotonically increasing tick ids, one per step
//! - **Outcomes**: a simulated collaborator with latency, loss, duplication
//!   and length faults
//! - **Randomness**: all entropy derived from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock + seeded RNG streams)      │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │ tick                         ▲ response             │
//! │  ┌────▼──────────┐  request   ┌──────┴────────────┐         │
//! │  │    Engine     │───────────►│ SimOutcomeSource  │         │
//! │  │ (arena_core)  │◄───────────│ (fault injection) │         │
//! │  └───────────────┘  on_resol. └───────────────────┘         │
//! │       │                                                     │
//! │  ┌────▼──────────────────────────────┐                      │
//! │  │            Oracle                 │                      │
//! │  │  (population invariants)          │                      │
//! │  └───────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use arena_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_ticks(500).run(ScenarioId::Delayed);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
pub mod live;
mod oracle;
mod outcomes;
mod runner;
pub mod scenarios;
mod world;

pub use context::{SimContext, FAULT_STREAM, OUTCOME_STREAM, POPULATION_STREAM};
pub use error::SimError;
pub use exporter::{SimEvent, SimExport, SimFrame};
pub use live::{run_realtime, run_tokio, LiveConfig, LiveSummary};
pub use oracle::{Oracle, OracleViolation};
pub use outcomes::{DeliveryStats, FaultProfile, SimOutcomeSource};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use world::{SimConfig, SimWorld, StepSummary};
