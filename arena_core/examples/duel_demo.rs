//! Duel Demo - "Watch The Ranks Climb"
//! ===================================
//!
//! Drives the engine by hand: one tick at a time, with every outcome
//! request answered on the following tick. Prints a line whenever something
//! interesting happens and a leaderboard at the end.
//!
//! Run:
//! ```bash
//! cargo run --example duel_demo
//! ```

use arena_core::{spawn_population, ArenaConfig, Engine};
use arena_env::{OutcomePolicy, TickId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Duel Demo - rank combat in a 300x200 arena");
    println!("==========================================\n");

    let config = ArenaConfig {
        count: 12,
        arena_width: 300,
        arena_height: 200,
        max_rank: 3,
        fight_duration: 5,
        ..Default::default()
    };

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let population = spawn_population(&config, &mut rng)?;
    let mut engine = Engine::new(config.clone(), population)?;
    let policy = OutcomePolicy::new(config.max_velocity_x, config.max_velocity_y);

    let mut waiting = None;
    for tick in 1..=600 {
        // Answer last tick's request before the next tick runs
        if let Some(request) = waiting.take() {
            let report = engine.on_resolution(policy.answer(&mut rng, request));
            for id in &report.promoted {
                println!("t={:>3}  {} reached rank {}", tick, id, config.max_rank);
            }
        }

        let output = engine.on_tick(TickId(tick));
        for pair in &output.new_pairs {
            println!("t={:>3}  {} vs {}", tick, pair.first, pair.second);
        }
        for id in &output.retired {
            println!("t={:>3}  {} leaves the arena", tick, id);
        }
        waiting = output.request;

        if engine.is_settled() {
            println!("\nArena settled after {} ticks", tick);
            break;
        }
    }

    let snapshot = engine.snapshot();
    println!("\nLeaderboard");
    println!("-----------");
    let mut board: Vec<_> = snapshot.active.iter().chain(&snapshot.finished).collect();
    board.sort_by(|a, b| b.rank.cmp(&a.rank).then(a.id.cmp(&b.id)));
    for view in board {
        println!("  {:>4}  rank {}  {:?}", view.id, view.rank, view.state);
    }

    let stats = engine.stats();
    println!(
        "\n{} fights resolved, {} retirements, {} buckets pending",
        stats.pairs_resolved,
        stats.retirements,
        engine.pending_buckets()
    );
    Ok(())
}
