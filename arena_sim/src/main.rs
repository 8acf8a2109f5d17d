//! Arena DST Simulator CLI
//!
//! Run deterministic chaos scenarios against the rank-combat engine, or
//! drive it in real time on Tokio.

use arena_core::ArenaConfig;
use arena_sim::{run_tokio, LiveConfig, ScenarioId, ScenarioResult, ScenarioRunner};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Arena Deterministic Simulation Testing CLI
#[derive(Parser, Debug)]
#[command(name = "arena-sim")]
#[command(about = "Run deterministic simulation tests for the rank-combat arena", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Ticks per scenario run
    #[arg(short, long, default_value = "1000")]
    ticks: u64,

    /// Scenario to run (baseline, delayed, lossy, duplicate, truncated, crowded, exclusive, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Arena configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the number of agents
    #[arg(long)]
    count: Option<usize>,

    /// Override the rank at which agents retire
    #[arg(long)]
    max_rank: Option<u32>,

    /// Override the fight duration in ticks
    #[arg(long)]
    fight_duration: Option<u32>,

    /// Pairing policy (first_match, exclusive); defaults to each scenario's own
    #[arg(long)]
    policy: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frames of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Ticks between exported frames
    #[arg(long, default_value = "10")]
    export_every: u64,

    /// Drive the engine on wall-clock time instead of the simulator
    #[arg(long)]
    realtime: bool,

    /// Milliseconds between ticks in --realtime mode
    #[arg(long, default_value = "33")]
    tick_ms: u64,

    /// Outcome latency in milliseconds in --realtime mode
    #[arg(long, default_value = "50")]
    latency_ms: u64,
}

impl Args {
    /// Builds the arena configuration from file and overrides.
    fn arena(&self) -> Result<ArenaConfig, arena_core::ConfigError> {
        let mut arena = match &self.config {
            Some(path) => ArenaConfig::from_json_file(path)?,
            None => ArenaConfig::default(),
        };
        if let Some(count) = self.count {
            arena.count = count;
        }
        if let Some(max_rank) = self.max_rank {
            arena.max_rank = max_rank;
        }
        if let Some(fight_duration) = self.fight_duration {
            arena.fight_duration = fight_duration;
        }
        arena.validate()?;
        Ok(arena)
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let arena = args.arena().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if args.realtime {
        run_live(&args, arena);
        return;
    }

    if !args.json {
        info!("Arena DST Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: baseline, delayed, lossy, duplicate, truncated, crowded, exclusive, all");
            std::process::exit(1);
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    // Handle --export mode for renderers
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let runner = configure(ScenarioRunner::new(base_seed), &args)
            .with_arena(arena);
        let (result, export) = runner.run_with_export(scenarios[0], args.export_every);

        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path),
            Err(e) => error!("Failed to write export: {}", e),
        }
        report(&result);

        if !result.passed {
            std::process::exit(1);
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    // Run simulations
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = configure(ScenarioRunner::new(seed), &args)
            .with_arena(arena.clone());

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                report(&result);
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "active": r.final_active,
                    "finished": r.final_finished,
                    "leaked_buckets": r.metrics.leaked_buckets,
                    "engine": r.metrics.engine,
                    "delivery": r.metrics.delivery,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!("  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn configure(runner: ScenarioRunner, args: &Args) -> ScenarioRunner {
    let runner = runner.with_ticks(args.ticks);
    match &args.policy {
        Some(policy) => runner.with_policy(policy.clone()),
        None => runner,
    }
}

fn report(result: &ScenarioResult) {
    if result.passed {
        info!("✓ {} (seed={}) PASSED", result.scenario.name(), result.seed);
    } else {
        error!("✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
    debug!(
        "  finished={} active={} fights={} leaked={} oldest_leak={:?}",
        result.final_finished,
        result.final_active,
        result.metrics.engine.pairs_resolved,
        result.metrics.leaked_buckets,
        result.metrics.oldest_leak_age
    );
}

fn run_live(args: &Args, arena: ArenaConfig) {
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Error: failed to start runtime: {}", e);
        std::process::exit(1);
    });

    let config = LiveConfig {
        ticks: args.ticks,
        tick_interval: Duration::from_millis(args.tick_ms),
        ..Default::default()
    };
    let latency = Duration::from_millis(args.latency_ms);

    let policy = args.policy.as_deref().unwrap_or("first_match");
    match runtime.block_on(run_tokio(arena, policy, latency, config)) {
        Ok(summary) => {
            info!(
                "Realtime run done: {} ticks, {} fights resolved, {} finished, {} discarded",
                summary.ticks,
                summary.stats.pairs_resolved,
                summary.snapshot.finished.len(),
                summary.discarded
            );
            if args.json {
                match serde_json::to_string_pretty(&summary.stats) {
                    Ok(text) => println!("{}", text),
                    Err(e) => error!("Failed to encode stats: {}", e),
                }
            }
        }
        Err(e) => {
            error!("Realtime run failed: {}", e);
            std::process::exit(1);
        }
    }
}
