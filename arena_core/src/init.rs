//! Initialization collaborator: builds the starting population.

use crate::agent::Agent;
use crate::config::{ArenaConfig, ConfigError};
use crate::population::Population;
use arena_env::{AgentId, Vec2i};
use rand::Rng;
use tracing::debug;

/// Spawns `config.count` rank-0 floating agents.
///
/// Positions keep the whole circle strictly inside the arena
/// (`radius+1 ..= dimension-radius-1`); velocities are uniform within the
/// configured component bounds. Ids are handed out sequentially after all
/// agents are generated, so population order equals id order.
pub fn spawn_population<R: Rng + ?Sized>(
    config: &ArenaConfig,
    rng: &mut R,
) -> Result<Population, ConfigError> {
    config.validate()?;

    let r = config.radius;
    let generated: Vec<(Vec2i, Vec2i)> = (0..config.count)
        .map(|_| {
            let position = Vec2i::new(
                rng.gen_range(r + 1..=config.arena_width - r - 1),
                rng.gen_range(r + 1..=config.arena_height - r - 1),
            );
            let velocity = Vec2i::new(
                rng.gen_range(-config.max_velocity_x..=config.max_velocity_x),
                rng.gen_range(-config.max_velocity_y..=config.max_velocity_y),
            );
            (position, velocity)
        })
        .collect();

    let agents: Vec<Agent> = generated
        .into_iter()
        .enumerate()
        .map(|(i, (position, velocity))| Agent::new(AgentId(i as u32), position, velocity, r))
        .collect();

    debug!("Spawned {} agents in {}x{} arena", agents.len(), config.arena_width, config.arena_height);

    Ok(Population::new(agents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::LifecycleState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_spawn_respects_bounds() {
        let config = ArenaConfig {
            count: 200,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pop = spawn_population(&config, &mut rng).unwrap();

        assert_eq!(pop.active().len(), 200);
        for agent in pop.active() {
            assert!(agent.position.x > agent.radius);
            assert!(agent.position.x < config.arena_width - agent.radius);
            assert!(agent.position.y > agent.radius);
            assert!(agent.position.y < config.arena_height - agent.radius);
            assert!(agent.velocity.x.abs() <= config.max_velocity_x);
            assert!(agent.velocity.y.abs() <= config.max_velocity_y);
            assert_eq!(agent.rank, 0);
            assert_eq!(agent.state, LifecycleState::Floating);
        }
    }

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let config = ArenaConfig {
            count: 10,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let pop = spawn_population(&config, &mut rng).unwrap();

        let ids: Vec<u32> = pop.active().iter().map(|a| a.id.0).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let config = ArenaConfig::default();
        let a = spawn_population(&config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let b = spawn_population(&config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_spawn_minimal_arena() {
        let config = ArenaConfig {
            count: 3,
            arena_width: 42,
            arena_height: 42,
            radius: 20,
            ..Default::default()
        };
        let pop = spawn_population(&config, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert!(pop.active().iter().all(|a| a.position == Vec2i::new(21, 21)));
    }

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let config = ArenaConfig {
            radius: 0,
            ..Default::default()
        };
        assert!(spawn_population(&config, &mut ChaCha8Rng::seed_from_u64(0)).is_err());
    }
}
