//! Tick orchestrator: sequences the phases and owns the pending buckets.
//!
//! # Contract
//!
//! ```text
//! on_tick(tick)           -> TickOutput { request: Option<OutcomeRequest>, .. }
//! on_resolution(response) -> ResolutionReport
//! ```
//!
//! The engine never draws randomness and never waits. Whoever drives it
//! (simulation harness or Tokio loop) forwards requests to an
//! `OutcomeSource` and feeds responses back through `on_resolution`,
//! always between ticks.
//!
//! # Tick order
//!
//! 1. Motion & boundary reflection
//! 2. Pairing detection (and fight timers)
//! 3. Partition: `Finished` agents move from active to finished
//! 4. Request phase: open a bucket for this tick's new pairs

use crate::config::{ArenaConfig, ConfigError};
use crate::motion;
use crate::pairing::{self, CombatPair, FirstMatch, PairingPolicy};
use crate::population::Population;
use crate::resolution::{self, PendingBucket, PendingBuckets, ResolutionReport};
use crate::snapshot::{AgentView, WorldSnapshot};
use arena_env::{AgentId, CorrelationId, OutcomeRequest, OutcomeResponse, TickId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Running counters over the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub ticks: u64,

    /// Combat pairs recorded
    pub pairs_opened: u64,

    /// Outcome requests issued
    pub requests_issued: u64,

    /// Pairs that received an outcome
    pub pairs_resolved: u64,

    /// Pairs lost to short responses
    pub pairs_dropped: u64,

    /// Outcomes beyond the bucket size
    pub excess_outcomes: u64,

    /// Responses with no matching bucket
    pub ignored_responses: u64,

    /// Updates skipped because the agent had left the active set
    pub missing_sides: u64,

    /// Agents moved to the finished collection
    pub retirements: u64,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutput {
    pub tick: TickId,

    /// Correlation id minted for this tick
    pub correlation_id: CorrelationId,

    /// Request to forward to the outcome source, if any pairs formed
    pub request: Option<OutcomeRequest>,

    /// Pairs recorded this tick, in discovery order
    pub new_pairs: Vec<CombatPair>,

    /// Agents moved to the finished collection this tick
    pub retired: Vec<AgentId>,
}

/// The arena engine.
pub struct Engine {
    config: ArenaConfig,

    population: Population,

    buckets: PendingBuckets,

    policy: Box<dyn PairingPolicy>,

    /// Next correlation id to mint; one per tick
    next_correlation: CorrelationId,

    last_tick: Option<TickId>,

    stats: EngineStats,
}

impl Engine {
    /// Creates an engine over an initial population.
    pub fn new(config: ArenaConfig, population: Population) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            population,
            buckets: PendingBuckets::new(),
            policy: Box::new(FirstMatch),
            next_correlation: CorrelationId(0),
            last_tick: None,
            stats: EngineStats::default(),
        })
    }

    /// Replaces the pairing policy.
    pub fn with_policy(mut self, policy: Box<dyn PairingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn last_tick(&self) -> Option<TickId> {
        self.last_tick
    }

    /// Number of buckets still waiting for a response.
    ///
    /// A response that never arrives leaves its bucket here forever; callers
    /// should watch this value.
    pub fn pending_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// The longest-waiting bucket, if any.
    pub fn oldest_pending(&self) -> Option<&PendingBucket> {
        self.buckets.oldest()
    }

    /// True when no agent can fight again.
    pub fn is_settled(&self) -> bool {
        self.population.active().len() < 2 && self.buckets.is_empty()
    }

    /// Runs one full tick.
    pub fn on_tick(&mut self, tick: TickId) -> TickOutput {
        if let Some(last) = self.last_tick {
            if tick <= last {
                warn!("Tick {} does not advance past {}", tick, last);
            }
        }
        self.last_tick = Some(tick);
        self.stats.ticks += 1;

        let correlation_id = self.next_correlation;
        self.next_correlation = correlation_id.next();

        let motion = motion::advance(self.population.active_mut(), &self.config);

        let pairing = pairing::detect_pairs(
            self.population.active_mut(),
            self.config.fight_duration,
            self.policy.as_ref(),
        );

        let retired = self.population.partition_finished();
        self.stats.retirements += retired.len() as u64;
        for id in &retired {
            info!("Agent {} retired at rank {}", id, self.config.max_rank);
        }

        let new_pairs = pairing.pairs;
        let request = self
            .buckets
            .open(correlation_id, tick, new_pairs.clone());

        self.stats.pairs_opened += new_pairs.len() as u64;
        if let Some(request) = &request {
            self.stats.requests_issued += 1;
            info!(
                "Tick {}: {} new fights, requesting {} outcomes as {}",
                tick,
                new_pairs.len(),
                request.count,
                request.correlation_id
            );
        }

        debug!(
            "Tick {}: moved={} reflected={} engaged={} released={} pending={}",
            tick,
            motion.moved,
            motion.reflected,
            pairing.engaged,
            pairing.released,
            self.buckets.len()
        );

        TickOutput {
            tick,
            correlation_id,
            request,
            new_pairs,
            retired,
        }
    }

    /// Applies a response from the outcome source.
    ///
    /// Unknown or already-resolved correlation ids are ignored.
    pub fn on_resolution(&mut self, response: OutcomeResponse) -> ResolutionReport {
        let Some(bucket) = self.buckets.take(response.correlation_id) else {
            self.stats.ignored_responses += 1;
            warn!("Ignoring response for {}: no pending bucket", response.correlation_id);
            return ResolutionReport::ignored(response.correlation_id);
        };

        let report = resolution::apply_outcomes(
            &mut self.population,
            &bucket,
            &response.outcomes,
            self.config.max_rank,
        );

        if report.dropped_pairs > 0 || report.excess_outcomes > 0 {
            warn!(
                "Response {} carried {} outcomes for {} pairs",
                response.correlation_id,
                response.len(),
                bucket.pairs.len()
            );
        }

        self.stats.pairs_resolved += report.applied as u64;
        self.stats.pairs_dropped += report.dropped_pairs as u64;
        self.stats.excess_outcomes += report.excess_outcomes as u64;
        self.stats.missing_sides += report.missing_sides as u64;

        info!(
            "Resolved {} (opened at {}): {} fights applied",
            bucket.correlation_id, bucket.opened_at, report.applied
        );

        report
    }

    /// Drops all pending buckets, as on teardown. Returns how many were lost.
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.buckets.clear();
        if discarded > 0 {
            warn!("Discarding {} unresolved buckets", discarded);
        }
        discarded
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.last_tick,
            arena_width: self.config.arena_width,
            arena_height: self.config.arena_height,
            active: self.population.active().iter().map(AgentView::from).collect(),
            finished: self.population.finished().iter().map(AgentView::from).collect(),
            pending_buckets: self.buckets.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, LifecycleState};
    use crate::init::spawn_population;
    use crate::pairing::ExclusiveMatch;
    use arena_env::{FightOutcome, OutcomePolicy, Side, Vec2i};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::VecDeque;

    fn config() -> ArenaConfig {
        ArenaConfig {
            count: 2,
            arena_width: 750,
            arena_height: 500,
            radius: 20,
            max_rank: 3,
            fight_duration: 4,
            ..Default::default()
        }
    }

    fn engine_with(agents: Vec<Agent>) -> Engine {
        Engine::new(config(), Population::new(agents)).unwrap()
    }

    fn still(id: u32, x: i32, y: i32) -> Agent {
        Agent::new(AgentId(id), Vec2i::new(x, y), Vec2i::zeros(), 20)
    }

    fn agent_state(engine: &Engine, id: u32) -> LifecycleState {
        engine.population().get(AgentId(id)).unwrap().state
    }

    #[test]
    fn test_end_to_end_fight() {
        let mut engine = engine_with(vec![still(0, 100, 100), still(1, 130, 100)]);

        let output = engine.on_tick(TickId(1));
        let request = output.request.unwrap();
        assert_eq!(request.count, 1);
        assert_eq!(output.new_pairs, vec![CombatPair::new(AgentId(0), AgentId(1))]);
        assert_eq!(agent_state(&engine, 0), LifecycleState::Fighting { elapsed: 0 });
        assert_eq!(agent_state(&engine, 1), LifecycleState::Fighting { elapsed: 0 });
        assert_eq!(engine.pending_buckets(), 1);

        let report = engine.on_resolution(OutcomeResponse::new(
            request.correlation_id,
            vec![FightOutcome::new(Side::First, 2, -1)],
        ));
        assert!(report.is_resolved());
        assert_eq!(engine.pending_buckets(), 0);

        let a = engine.population().get(AgentId(0)).unwrap();
        let b = engine.population().get(AgentId(1)).unwrap();
        assert_eq!((a.rank, a.velocity), (1, Vec2i::new(2, -1)));
        assert_eq!((b.rank, b.velocity), (0, Vec2i::zeros()));

        // Timer runs to fight_duration, then releases on the following tick
        for k in 1..=4 {
            let output = engine.on_tick(TickId(1 + k as u64));
            assert!(output.request.is_none());
            assert_eq!(agent_state(&engine, 0), LifecycleState::Fighting { elapsed: k });
        }
        engine.on_tick(TickId(6));
        assert_eq!(agent_state(&engine, 0), LifecycleState::Floating);
        assert_eq!(agent_state(&engine, 1), LifecycleState::Floating);
    }

    #[test]
    fn test_duplicate_and_unknown_responses_are_noops() {
        let mut engine = engine_with(vec![still(0, 100, 100), still(1, 130, 100)]);
        let request = engine.on_tick(TickId(1)).request.unwrap();
        let response = OutcomeResponse::new(
            request.correlation_id,
            vec![FightOutcome::new(Side::Second, 1, 1)],
        );

        assert!(engine.on_resolution(response.clone()).is_resolved());
        let after_first = engine.population().clone();

        assert!(!engine.on_resolution(response).is_resolved());
        assert!(!engine
            .on_resolution(OutcomeResponse::new(CorrelationId(99), vec![]))
            .is_resolved());

        assert_eq!(engine.population(), &after_first);
        assert_eq!(engine.stats().ignored_responses, 2);
    }

    #[test]
    fn test_correlation_ids_are_unique_per_tick() {
        let mut engine = engine_with(vec![still(0, 100, 100)]);
        let a = engine.on_tick(TickId(7)).correlation_id;
        let b = engine.on_tick(TickId(7)).correlation_id;
        let c = engine.on_tick(TickId(3)).correlation_id;
        assert!(a < b && b < c);
    }

    #[test]
    fn test_out_of_order_resolution() {
        // Two separated pairs, formed on different ticks
        let mut engine = engine_with(vec![
            still(0, 100, 100),
            still(1, 130, 100),
            Agent::new(AgentId(2), Vec2i::new(400, 300), Vec2i::zeros(), 20).with_rank(1),
            Agent::new(AgentId(3), Vec2i::new(600, 300), Vec2i::new(-100, 0), 20).with_rank(1),
        ]);

        let first = engine.on_tick(TickId(1)).request.unwrap();
        let second = engine.on_tick(TickId(2)).request.unwrap();
        assert_eq!(engine.pending_buckets(), 2);

        engine.on_resolution(OutcomeResponse::new(
            second.correlation_id,
            vec![FightOutcome::new(Side::Second, 0, 0)],
        ));
        engine.on_resolution(OutcomeResponse::new(
            first.correlation_id,
            vec![FightOutcome::new(Side::First, 0, 0)],
        ));

        assert_eq!(engine.pending_buckets(), 0);
        assert_eq!(engine.population().get(AgentId(0)).unwrap().rank, 1);
        assert_eq!(engine.population().get(AgentId(3)).unwrap().rank, 2);
    }

    #[test]
    fn test_winner_at_max_rank_retires_next_tick() {
        let mut engine = engine_with(vec![
            still(0, 100, 100).with_rank(2),
            still(1, 130, 100).with_rank(2),
        ]);
        engine.config.fight_duration = 0;

        let request = engine.on_tick(TickId(1)).request.unwrap();
        let report = engine.on_resolution(OutcomeResponse::new(
            request.correlation_id,
            vec![FightOutcome::new(Side::First, 3, 0)],
        ));
        assert_eq!(report.promoted, vec![AgentId(0)]);

        // Still fighting: timer releases it, it is not retired yet
        let output = engine.on_tick(TickId(2));
        assert!(output.retired.is_empty());
        assert_eq!(agent_state(&engine, 0), LifecycleState::Floating);

        let output = engine.on_tick(TickId(3));
        assert_eq!(output.retired, vec![AgentId(0)]);
        assert_eq!(engine.population().finished().len(), 1);
        assert!(engine.population.get_active_mut(AgentId(0)).is_none());

        let frozen = engine.population().finished()[0].clone();
        for t in 4..20 {
            engine.on_tick(TickId(t));
        }
        assert_eq!(engine.population().finished()[0], frozen);
    }

    #[test]
    fn test_resolution_after_retirement_skips_finished_agent() {
        let mut engine = engine_with(vec![
            still(0, 100, 100).with_rank(2),
            still(1, 130, 100).with_rank(2),
        ]);
        engine.config.fight_duration = 0;

        let request = engine.on_tick(TickId(1)).request.unwrap();
        // Promote agent 0 by hand so it retires before the response lands
        engine.population.get_active_mut(AgentId(0)).unwrap().rank = 3;
        engine.on_tick(TickId(2));
        engine.on_tick(TickId(3));
        assert_eq!(engine.population().finished().len(), 1);

        let report = engine.on_resolution(OutcomeResponse::new(
            request.correlation_id,
            vec![FightOutcome::new(Side::First, 9, 9)],
        ));
        assert_eq!(report.missing_sides, 1);
        assert_eq!(engine.population().finished()[0].velocity, Vec2i::zeros());
        assert_eq!(engine.population().get(AgentId(1)).unwrap().rank, 1);
    }

    #[test]
    fn test_exclusive_policy_engine() {
        let mut engine = engine_with(vec![
            still(0, 100, 100),
            still(1, 120, 100),
            still(2, 110, 110),
        ])
        .with_policy(Box::new(ExclusiveMatch));

        let output = engine.on_tick(TickId(1));
        assert_eq!(engine.policy_name(), "exclusive");
        assert_eq!(output.request.unwrap().count, 1);
    }

    #[test]
    fn test_discard_pending() {
        let mut engine = engine_with(vec![still(0, 100, 100), still(1, 130, 100)]);
        engine.on_tick(TickId(1));
        assert_eq!(engine.discard_pending(), 1);
        assert_eq!(engine.pending_buckets(), 0);
    }

    #[test]
    fn test_snapshot_reflects_population() {
        let mut engine = engine_with(vec![still(0, 100, 100), still(1, 130, 100)]);
        engine.on_tick(TickId(1));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.tick, Some(TickId(1)));
        assert_eq!(snapshot.active.len(), 2);
        assert_eq!(snapshot.fighting_count(), 2);
        assert_eq!(snapshot.pending_buckets, 1);
    }

    /// Drives an engine with responses delayed by `delay` ticks.
    fn run(seed: u64, config: ArenaConfig, ticks: u64, delay: usize) -> Vec<Population> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let population = spawn_population(&config, &mut rng).unwrap();
        let policy = OutcomePolicy::new(config.max_velocity_x, config.max_velocity_y);
        let mut engine = Engine::new(config, population).unwrap();
        let mut queue: VecDeque<(u64, OutcomeResponse)> = VecDeque::new();
        let mut history = Vec::new();

        for t in 0..ticks {
            let output = engine.on_tick(TickId(t));
            if let Some(request) = output.request {
                queue.push_back((t + delay as u64, policy.answer(&mut rng, request)));
            }
            while queue.front().map_or(false, |(due, _)| *due <= t) {
                if let Some((_, response)) = queue.pop_front() {
                    engine.on_resolution(response);
                }
            }
            history.push(engine.population().clone());
        }
        history
    }

    /// Runs the engine and, for every tick, pairs each agent as it stood just
    /// before the pairing phase with its state just after the tick.
    fn pairing_observations(
        seed: u64,
        config: ArenaConfig,
        ticks: u64,
    ) -> Vec<(Vec<Agent>, Vec<LifecycleState>)> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let population = spawn_population(&config, &mut rng).unwrap();
        let policy = OutcomePolicy::new(config.max_velocity_x, config.max_velocity_y);
        let mut engine = Engine::new(config.clone(), population).unwrap();
        let mut observations = Vec::new();

        for t in 0..ticks {
            let mut before = engine.population().active().to_vec();
            motion::advance(&mut before, &config);

            let output = engine.on_tick(TickId(t));
            let after = before
                .iter()
                .map(|agent| engine.population().get(agent.id).unwrap().state)
                .collect();
            observations.push((before, after));

            if let Some(request) = output.request {
                engine.on_resolution(policy.answer(&mut rng, request));
            }
        }
        observations
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_population_invariants_hold(
            seed in any::<u64>(),
            count in 2usize..40,
            delay in 0usize..6,
            max_rank in 1u32..5,
        ) {
            let config = ArenaConfig {
                count,
                arena_width: 300,
                arena_height: 300,
                max_rank,
                fight_duration: 3,
                ..Default::default()
            };
            for population in run(seed, config, 150, delay) {
                prop_assert!(population.check_invariants(max_rank).is_ok());
                prop_assert_eq!(population.total(), count);
            }
        }

        #[test]
        fn prop_finished_agents_never_change(seed in any::<u64>(), count in 2usize..30) {
            let config = ArenaConfig {
                count,
                arena_width: 250,
                arena_height: 250,
                max_rank: 2,
                fight_duration: 1,
                ..Default::default()
            };
            let history = run(seed, config, 200, 1);
            for window in history.windows(2) {
                let (before, after) = (&window[0], &window[1]);
                prop_assert!(after.finished().len() >= before.finished().len());
                for (old, new) in before.finished().iter().zip(after.finished()) {
                    prop_assert_eq!(old, new);
                }
            }
        }

        #[test]
        fn prop_floating_agent_engages_iff_same_rank_neighbour(
            seed in any::<u64>(),
            count in 2usize..40,
        ) {
            let config = ArenaConfig {
                count,
                arena_width: 260,
                arena_height: 220,
                max_rank: 3,
                fight_duration: 2,
                ..Default::default()
            };
            let reach = 2 * i64::from(config.radius);

            for (before, after) in pairing_observations(seed, config, 150) {
                for (agent, state) in before.iter().zip(&after) {
                    if !agent.is_floating() {
                        continue;
                    }
                    let has_neighbour = before.iter().any(|other| {
                        other.id != agent.id
                            && other.rank == agent.rank
                            && agent.distance_sq(other) <= reach * reach
                    });
                    prop_assert_eq!(
                        *state == LifecycleState::Fighting { elapsed: 0 },
                        has_neighbour
                    );
                }
            }
        }

        #[test]
        fn prop_fight_timer_strictly_increments(seed in any::<u64>(), count in 2usize..30) {
            let config = ArenaConfig {
                count,
                arena_width: 250,
                arena_height: 250,
                fight_duration: 4,
                ..Default::default()
            };
            let history = run(seed, config, 120, 2);
            for window in history.windows(2) {
                for before in window[0].active() {
                    let Some(after) = window[1].get(before.id) else { continue };
                    if let LifecycleState::Fighting { elapsed } = before.state {
                        let expected = if elapsed < 4 {
                            LifecycleState::Fighting { elapsed: elapsed + 1 }
                        } else {
                            LifecycleState::Floating
                        };
                        prop_assert_eq!(after.state, expected);
                    }
                }
            }
        }
    }
}
