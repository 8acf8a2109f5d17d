//! SimWorld - The simulation harness container.
//!
//! The world plays the tick source: it mints increasing tick ids, runs the
//! engine's tick, forwards any outcome request to the simulated collaborator
//! and then, as a separate unit of work, feeds every response that has come
//! due back into the engine. The Oracle checks invariants after both steps.

use crate::context::{SimContext, FAULT_STREAM, OUTCOME_STREAM, POPULATION_STREAM};
use crate::error::SimError;
use crate::oracle::Oracle;
use crate::outcomes::{DeliveryStats, FaultProfile, SimOutcomeSource};

use arena_core::pairing::policy_by_name;
use arena_core::{spawn_population, ArenaConfig, Engine, EngineStats, ResolutionReport, WorldSnapshot};
use arena_env::{ArenaContext, OutcomePolicy, OutcomeSource, TickId};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Arena and population settings
    pub arena: ArenaConfig,

    /// Collaborator fault injection
    pub faults: FaultProfile,

    /// Pairing policy name (`first_match` or `exclusive`)
    pub policy: String,

    /// Virtual time per tick
    pub tick_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            arena: ArenaConfig::default(),
            faults: FaultProfile::none(),
            policy: "first_match".to_string(),
            tick_interval: Duration::from_millis(33),
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.arena = arena;
        self
    }

    pub fn with_faults(mut self, faults: FaultProfile) -> Self {
        self.faults = faults;
        self
    }

    /// Sets the pairing policy by name.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

/// What happened during one world step.
#[derive(Debug, Clone, Default)]
pub struct StepSummary {
    pub tick: Option<TickId>,

    /// Pairs recorded this tick
    pub new_pairs: usize,

    /// Agents retired this tick
    pub retired: usize,

    /// Responses applied after the tick
    pub resolutions: Vec<ResolutionReport>,
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    engine: Engine,

    outcomes: SimOutcomeSource,

    oracle: Oracle,

    /// Last tick id issued
    tick: TickId,

    request_failures: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let context = SimContext::shared(config.seed);

        let population = spawn_population(&config.arena, &mut context.derive_rng(POPULATION_STREAM))?;
        let policy =
            policy_by_name(&config.policy).ok_or_else(|| SimError::UnknownPolicy(config.policy.clone()))?;
        let engine = Engine::new(config.arena.clone(), population)?.with_policy(policy);

        let outcomes = SimOutcomeSource::new(
            OutcomePolicy::new(config.arena.max_velocity_x, config.arena.max_velocity_y),
            config.faults,
            context.derive_rng(OUTCOME_STREAM),
            context.derive_rng(FAULT_STREAM),
        )?;

        let mut oracle = Oracle::new(config.arena.max_rank);
        oracle
            .check(engine.population())
            .map_err(|violation| SimError::Invariant {
                tick: TickId(0),
                violation,
            })?;

        Ok(Self {
            config,
            context,
            engine,
            outcomes,
            oracle,
            tick: TickId(0),
            request_failures: 0,
        })
    }

    /// Advances simulation by one tick, then delivers due responses.
    pub fn step(&mut self) -> Result<StepSummary, SimError> {
        self.tick = TickId(self.tick.0 + 1);
        let tick = self.tick;

        self.context.advance_time(self.config.tick_interval);
        self.outcomes.advance_to(tick);

        let output = self.engine.on_tick(tick);
        if let Some(request) = output.request {
            if let Err(e) = self.outcomes.request(request) {
                self.request_failures += 1;
                warn!("Outcome request {} failed: {}", request.correlation_id, e);
            }
        }
        self.verify()?;

        let resolutions = self.deliver_due()?;

        Ok(StepSummary {
            tick: Some(tick),
            new_pairs: output.new_pairs.len(),
            retired: output.retired.len(),
            resolutions,
        })
    }

    /// Delivers every response that is due now.
    fn deliver_due(&mut self) -> Result<Vec<ResolutionReport>, SimError> {
        let mut reports = Vec::new();
        while let Some(response) = self.outcomes.try_recv() {
            reports.push(self.engine.on_resolution(response));
            self.verify()?;
        }
        Ok(reports)
    }

    /// Delivers everything still in flight without running more ticks.
    ///
    /// Used at the end of a run so that only genuinely lost responses
    /// remain as pending buckets.
    pub fn drain(&mut self) -> Result<Vec<ResolutionReport>, SimError> {
        let mut reports = Vec::new();
        while let Some(due) = self.outcomes.next_due() {
            self.outcomes.advance_to(due);
            reports.extend(self.deliver_due()?);
        }
        Ok(reports)
    }

    fn verify(&mut self) -> Result<(), SimError> {
        self.oracle
            .check(self.engine.population())
            .map_err(|violation| SimError::Invariant {
                tick: self.tick,
                violation,
            })
    }

    /// Returns the engine (read-only).
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Observation snapshot for renderers.
    pub fn snapshot(&self) -> WorldSnapshot {
        self.engine.snapshot()
    }

    pub fn engine_stats(&self) -> &EngineStats {
        self.engine.stats()
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.outcomes.stats()
    }

    pub fn request_failures(&self) -> u64 {
        self.request_failures
    }

    /// Returns the last tick id issued.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Ticks the oldest pending bucket has been waiting, if any.
    pub fn oldest_pending_age(&self) -> Option<u64> {
        self.engine
            .oldest_pending()
            .map(|bucket| self.tick.0.saturating_sub(bucket.opened_at.0))
    }
}
