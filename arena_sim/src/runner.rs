//! Scenario runner - executes chaos scenarios against the engine.

use crate::error::SimError;
use crate::exporter::{SimEvent, SimExport, SimFrame};
use crate::outcomes::DeliveryStats;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld, StepSummary};

use arena_core::{ArenaConfig, EngineStats, ResolutionStatus};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Active agents at end
    pub final_active: usize,

    /// Finished agents at end
    pub final_finished: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Engine counters
    pub engine: EngineStats,

    /// Collaborator counters
    pub delivery: DeliveryStats,

    /// Buckets never resolved
    pub leaked_buckets: usize,

    /// Age in ticks of the oldest leaked bucket
    pub oldest_leak_age: Option<u64>,
}

/// Runs chaos scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Ticks per scenario
    ticks: u64,

    /// Arena settings scenarios start from
    base: ArenaConfig,

    /// Virtual time per tick
    tick_interval: Duration,

    /// Pairing policy overriding the scenario's own
    policy: Option<String>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ticks: 1_000,
            base: ArenaConfig::default(),
            tick_interval: Duration::from_millis(33),
            policy: None,
        }
    }

    /// Sets the number of ticks.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Sets the base arena configuration.
    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.base = arena;
        self
    }

    /// Sets the virtual tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Forces a pairing policy for every scenario.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    fn sim_config(&self, scenario: ScenarioId) -> SimConfig {
        let policy = self
            .policy
            .clone()
            .unwrap_or_else(|| scenario.policy().to_string());

        SimConfig::default()
            .with_seed(self.seed)
            .with_arena(scenario.arena(&self.base))
            .with_faults(scenario.faults())
            .with_policy(policy)
            .with_tick_interval(self.tick_interval)
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario, recording a frame every `interval` ticks.
    pub fn run_with_export(&self, scenario: ScenarioId, interval: u64) -> (ScenarioResult, SimExport) {
        let config = self.sim_config(scenario);
        let mut export = SimExport::new(scenario.name(), self.seed, config.arena);
        let result = self.execute(scenario, Some((&mut export, interval.max(1))));
        export.finalize(result.passed, result.metrics.engine.clone());
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<(&mut SimExport, u64)>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let mut world = match SimWorld::new(self.sim_config(scenario)) {
            Ok(world) => world,
            Err(e) => return self.failed_setup(scenario, e),
        };

        let mut failure = None;
        for _ in 0..self.ticks {
            match world.step() {
                Ok(summary) => {
                    if let Some((export, interval)) = export.as_mut() {
                        if world.tick().0 % *interval == 0 {
                            export.add_frame(frame(&world, &summary));
                        }
                    }
                }
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        if failure.is_none() {
            if let Err(e) = world.drain() {
                failure = Some(e.to_string());
            }
        }

        let leaked = world.engine().pending_buckets();
        if failure.is_none() && leaked > 0 {
            if scenario.expects_no_leak() {
                failure = Some(format!("{} buckets never resolved on a lossless link", leaked));
            } else {
                warn!("{} buckets leaked (responses lost)", leaked);
            }
        }

        let snapshot = world.snapshot();
        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure.is_none(),
            total_ticks: world.tick().0,
            final_time_secs: world.time(),
            final_active: snapshot.active.len(),
            final_finished: snapshot.finished.len(),
            failure_reason: failure,
            metrics: ScenarioMetrics {
                engine: world.engine_stats().clone(),
                delivery: world.delivery_stats(),
                leaked_buckets: leaked,
                oldest_leak_age: world.oldest_pending_age(),
            },
        };

        debug!(
            "  {} finished, {} active, {} fights resolved",
            result.final_finished, result.final_active, result.metrics.engine.pairs_resolved
        );

        result
    }

    fn failed_setup(&self, scenario: ScenarioId, error: SimError) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            final_active: 0,
            final_finished: 0,
            failure_reason: Some(format!("setup failed: {}", error)),
            metrics: ScenarioMetrics::default(),
        }
    }
}

fn frame(world: &SimWorld, summary: &StepSummary) -> SimFrame {
    let mut events = Vec::new();
    if summary.new_pairs > 0 {
        events.push(SimEvent::info(format!("{} fights started", summary.new_pairs)));
    }
    if summary.retired > 0 {
        events.push(SimEvent::info(format!("{} agents retired", summary.retired)));
    }
    for report in &summary.resolutions {
        match report.status {
            ResolutionStatus::Resolved => events.push(SimEvent::info(format!(
                "{} resolved {} fights",
                report.correlation_id, report.applied
            ))),
            ResolutionStatus::Ignored => events.push(SimEvent::warn(format!(
                "{} ignored: no pending bucket",
                report.correlation_id
            ))),
        }
    }

    SimFrame {
        time_sec: world.time(),
        snapshot: world.snapshot(),
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(seed: u64) -> ScenarioRunner {
        ScenarioRunner::new(seed).with_ticks(400).with_arena(ArenaConfig {
            count: 40,
            arena_width: 500,
            arena_height: 400,
            max_rank: 3,
            fight_duration: 10,
            ..Default::default()
        })
    }

    #[test]
    fn test_every_scenario_passes() {
        let runner = runner(42);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(
                result.passed,
                "{} failed: {:?}",
                scenario,
                result.failure_reason
            );
            assert_eq!(result.final_active + result.final_finished, scenario.arena(&runner.base).count);
        }
    }

    #[test]
    fn test_baseline_resolves_every_fight() {
        let result = runner(5).run(ScenarioId::Baseline);
        let engine = &result.metrics.engine;

        assert!(engine.pairs_opened > 0);
        assert_eq!(engine.pairs_resolved, engine.pairs_opened);
        assert_eq!(result.metrics.leaked_buckets, 0);
        assert_eq!(engine.ignored_responses, 0);
    }

    #[test]
    fn test_duplicate_responses_are_ignored() {
        let result = runner(11).run(ScenarioId::Duplicate);
        assert_eq!(
            result.metrics.engine.ignored_responses,
            result.metrics.delivery.duplicated
        );
    }

    #[test]
    fn test_lossy_reports_leaks() {
        let result = runner(8).run(ScenarioId::Lossy);
        assert!(result.passed);
        assert_eq!(result.metrics.leaked_buckets as u64, result.metrics.delivery.dropped);
    }

    #[test]
    fn test_export_collects_frames() {
        let (result, export) = runner(1).with_ticks(100).run_with_export(ScenarioId::Baseline, 10);

        assert!(result.passed);
        assert_eq!(export.frames.len(), 10);
        assert_eq!(export.scenario, "baseline");
        assert!(export.stats.is_some());

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"active\""));
    }

    #[test]
    fn test_policy_override() {
        let result = runner(3).with_policy("exclusive").run(ScenarioId::Baseline);
        assert!(result.passed);

        let result = runner(3).with_policy("nonsense").run(ScenarioId::Baseline);
        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("nonsense"));
    }

    #[test]
    fn test_same_seed_same_export() {
        let (_, a) = runner(21).with_ticks(120).run_with_export(ScenarioId::Truncated, 5);
        let (_, b) = runner(21).with_ticks(120).run_with_export(ScenarioId::Truncated, 5);

        assert_eq!(a.run_id, b.run_id);
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());

        let (_, c) = runner(22).with_ticks(120).run_with_export(ScenarioId::Truncated, 5);
        assert_ne!(a.run_id, c.run_id);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = runner(77).run(ScenarioId::Delayed);
        let b = runner(77).run(ScenarioId::Delayed);
        assert_eq!(a.metrics.engine, b.metrics.engine);
        assert_eq!(a.final_finished, b.final_finished);
    }
}
