//! Motion & boundary reflection phase.

use crate::agent::Agent;
use crate::config::ArenaConfig;
use arena_env::AgentId;
use tracing::debug;

/// Axis whose velocity component was negated by a wall hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// What the motion phase did this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionReport {
    /// Floating agents that advanced
    pub moved: usize,

    /// Agents that reached max rank and became `Finished` (still in active)
    pub retired: Vec<AgentId>,

    /// Agents whose velocity was reflected
    pub reflected: usize,
}

/// Advances every active agent by one tick.
///
/// A floating agent at max rank retires instead of moving; any other
/// floating agent moves by its velocity. Fighting and finished agents stay
/// put. Reflection then runs for every agent regardless of state.
pub fn advance(agents: &mut [Agent], config: &ArenaConfig) -> MotionReport {
    let mut report = MotionReport::default();

    for agent in agents.iter_mut() {
        if agent.is_floating() {
            if agent.rank >= config.max_rank {
                agent.retire();
                report.retired.push(agent.id);
            } else {
                agent.position += agent.velocity;
                report.moved += 1;
            }
        }

        if reflect(agent, config.arena_width, config.arena_height).is_some() {
            report.reflected += 1;
        }
    }

    if !report.retired.is_empty() {
        debug!("Motion: {} agents reached max rank", report.retired.len());
    }

    report
}

/// Negates one velocity component when the circle touches a wall.
///
/// Only one axis is corrected per tick, x first. The position is not
/// clamped, so an agent may sit past the wall for one more tick.
pub fn reflect(agent: &mut Agent, arena_width: i32, arena_height: i32) -> Option<Axis> {
    let r = agent.radius;
    let p = agent.position;

    if p.x - r <= 0 || p.x + r >= arena_width {
        agent.velocity.x = -agent.velocity.x;
        Some(Axis::X)
    } else if p.y - r <= 0 || p.y + r >= arena_height {
        agent.velocity.y = -agent.velocity.y;
        Some(Axis::Y)
    } else {
        None
    }
}
