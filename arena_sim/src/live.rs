//! Realtime driver.
//!
//! Runs the engine against wall-clock ticks and an asynchronous outcome
//! collaborator. Ticks and responses are separate units of work: the loop
//! waits on whichever comes first and hands it to the engine, so the engine
//! itself never blocks.

use crate::error::SimError;

use arena_core::pairing::policy_by_name;
use arena_core::{spawn_population, ArenaConfig, Engine, EngineStats, WorldSnapshot};
use arena_env::{ArenaContext, OutcomePolicy, OutcomeSource, TickId, TokioContext, TokioOutcomeSource};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings for a realtime run.
#[derive(Debug, Clone, Copy)]
pub struct LiveConfig {
    /// Ticks to emit before shutting down
    pub ticks: u64,

    /// Wall-clock time between ticks
    pub tick_interval: Duration,

    /// How long to wait for in-flight responses after the last tick
    pub grace: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ticks: 300,
            tick_interval: Duration::from_millis(33),
            grace: Duration::from_millis(500),
        }
    }
}

/// What a realtime run produced.
#[derive(Debug, Clone)]
pub struct LiveSummary {
    pub ticks: u64,

    /// Responses handed to the engine, including ignored ones
    pub responses: u64,

    /// Buckets still pending at shutdown, discarded
    pub discarded: usize,

    pub stats: EngineStats,

    pub snapshot: WorldSnapshot,
}

/// Drives `engine` with ticks from `ctx` and responses from `source`.
pub async fn run_realtime<C, S>(
    ctx: &C,
    source: &S,
    engine: &mut Engine,
    config: LiveConfig,
) -> LiveSummary
where
    C: ArenaContext,
    S: OutcomeSource,
{
    let mut tick = 0u64;
    let mut responses = 0u64;
    let mut deadline = ctx.now() + config.tick_interval;

    while tick < config.ticks {
        let wait = deadline.saturating_sub(ctx.now());
        tokio::select! {
            _ = ctx.sleep(wait) => {
                tick += 1;
                deadline += config.tick_interval;

                let output = engine.on_tick(TickId(tick));
                if let Some(request) = output.request {
                    if let Err(e) = source.request(request) {
                        warn!("Outcome request {} failed: {}", request.correlation_id, e);
                    }
                }
                if tick % 30 == 0 {
                    debug!(
                        "t={} | active={} | fighting={} | pending={}",
                        tick,
                        engine.population().active().len(),
                        engine.snapshot().fighting_count(),
                        engine.pending_buckets()
                    );
                }
            }
            Some(response) = source.recv() => {
                responses += 1;
                engine.on_resolution(response);
            }
        }
    }

    // Let late responses land before tearing down
    let grace_end = ctx.now() + config.grace;
    while engine.pending_buckets() > 0 {
        let wait = grace_end.saturating_sub(ctx.now());
        if wait.is_zero() {
            break;
        }
        tokio::select! {
            _ = ctx.sleep(wait) => break,
            Some(response) = source.recv() => {
                responses += 1;
                engine.on_resolution(response);
            }
        }
    }

    let discarded = engine.discard_pending();

    LiveSummary {
        ticks: tick,
        responses,
        discarded,
        stats: engine.stats().clone(),
        snapshot: engine.snapshot(),
    }
}

/// Runs the engine on Tokio with a latency-only outcome collaborator.
pub async fn run_tokio(
    arena: ArenaConfig,
    policy: &str,
    latency: Duration,
    config: LiveConfig,
) -> Result<LiveSummary, SimError> {
    let ctx = TokioContext::new();

    let population = spawn_population(&arena, &mut ctx.derive_rng(0))?;
    let pairing = policy_by_name(policy).ok_or_else(|| SimError::UnknownPolicy(policy.to_string()))?;
    let mut engine = Engine::new(arena.clone(), population)?.with_policy(pairing);

    let source = TokioOutcomeSource::new(
        OutcomePolicy::new(arena.max_velocity_x, arena.max_velocity_y),
        ctx.derive_rng(1),
        latency,
    );

    info!(
        "Realtime run: {} agents, {} ticks every {:?}, latency {:?}",
        arena.count, config.ticks, config.tick_interval, latency
    );
    Ok(run_realtime(&ctx, &source, &mut engine, config).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_arena() -> ArenaConfig {
        ArenaConfig {
            count: 30,
            arena_width: 300,
            arena_height: 200,
            max_rank: 3,
            fight_duration: 4,
            ..Default::default()
        }
    }

    fn fast(ticks: u64) -> LiveConfig {
        LiveConfig {
            ticks,
            tick_interval: Duration::from_millis(1),
            grace: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_realtime_run_resolves_fights() {
        let summary = run_tokio(small_arena(), "first_match", Duration::from_millis(2), fast(60))
            .await
            .unwrap();

        assert_eq!(summary.ticks, 60);
        assert_eq!(summary.stats.ticks, 60);
        assert_eq!(summary.discarded, 0);
        assert_eq!(summary.stats.pairs_resolved, summary.stats.pairs_opened);
        assert_eq!(summary.snapshot.active.len() + summary.snapshot.finished.len(), 30);
    }

    #[tokio::test]
    async fn test_realtime_rejects_unknown_policy() {
        let result = run_tokio(small_arena(), "coin_flip", Duration::ZERO, fast(1)).await;
        assert!(matches!(result, Err(SimError::UnknownPolicy(_))));
    }
}
