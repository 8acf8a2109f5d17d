//! Randomness collaborator contract for fight resolution.

use async_trait::async_trait;
use rand::Rng;

use crate::error::EnvError;
use crate::types::{FightOutcome, OutcomeRequest, OutcomeResponse, Side, Vec2i};

/// Abstraction for the collaborator that decides fight outcomes.
///
/// # Implementations
///
/// - **Production**: `TokioOutcomeSource`, responses delivered by spawned tasks
/// - **Simulation**: tick-scheduled delivery with fault injection
///
/// # Request Flow
///
/// ```text
/// Engine                    Collaborator                 Engine
///   |                           |                          |
///   |-- request(c7, 3) -------->|                          |
///   |   (returns at once)       |-- [latency] ------------>|
///   |                           |                          |-- recv() -> (c7, [o0, o1, o2])
/// ```
///
/// Responses may arrive late, out of order, twice, or never; the engine
/// tolerates all of these.
#[async_trait]
pub trait OutcomeSource: Send + Sync + 'static {
    /// Enqueues a request for outcomes. Never blocks on the draw.
    ///
    /// # Returns
    /// * `Ok(())` - Request accepted for later delivery
    /// * `Err(EnvError::RequestRejected)` - The collaborator cannot serve it
    fn request(&self, request: OutcomeRequest) -> Result<(), EnvError>;

    /// Waits for the next response.
    ///
    /// Returns `None` once the collaborator is shut down.
    async fn recv(&self) -> Option<OutcomeResponse>;

    /// Returns a response that is already available, if any.
    fn try_recv(&self) -> Option<OutcomeResponse>;

    /// Number of requests accepted but not yet delivered.
    fn in_flight(&self) -> usize;
}

/// Reference outcome policy: fair coin for the winner, uniform velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomePolicy {
    /// Bound on the |vx| of the post-fight velocity
    pub max_velocity_x: i32,

    /// Bound on the |vy| of the post-fight velocity
    pub max_velocity_y: i32,
}

impl OutcomePolicy {
    /// Creates a policy with component-wise velocity bounds.
    pub fn new(max_velocity_x: i32, max_velocity_y: i32) -> Self {
        Self {
            max_velocity_x: max_velocity_x.abs(),
            max_velocity_y: max_velocity_y.abs(),
        }
    }

    /// Draws a single outcome.
    pub fn draw_one<R: Rng + ?Sized>(&self, rng: &mut R) -> FightOutcome {
        let side = if rng.gen_bool(0.5) { Side::First } else { Side::Second };
        let vx = rng.gen_range(-self.max_velocity_x..=self.max_velocity_x);
        let vy = rng.gen_range(-self.max_velocity_y..=self.max_velocity_y);
        FightOutcome {
            side,
            vector: Vec2i::new(vx, vy),
        }
    }

    /// Draws `count` outcomes.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<FightOutcome> {
        (0..count).map(|_| self.draw_one(rng)).collect()
    }

    /// Answers a request in full.
    pub fn answer<R: Rng + ?Sized>(&self, rng: &mut R, request: OutcomeRequest) -> OutcomeResponse {
        OutcomeResponse::new(request.correlation_id, self.draw(rng, request.count))
    }
}

impl Default for OutcomePolicy {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CorrelationId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_policy_respects_bounds() {
        let policy = OutcomePolicy::new(3, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for outcome in policy.draw(&mut rng, 500) {
            assert!(outcome.vector.x.abs() <= 3);
            assert!(outcome.vector.y.abs() <= 2);
        }
    }

    #[test]
    fn test_policy_draws_both_sides() {
        let policy = OutcomePolicy::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let outcomes = policy.draw(&mut rng, 200);

        assert!(outcomes.iter().any(|o| o.side == Side::First));
        assert!(outcomes.iter().any(|o| o.side == Side::Second));
    }

    #[test]
    fn test_answer_matches_request() {
        let policy = OutcomePolicy::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let request = OutcomeRequest {
            correlation_id: CorrelationId(9),
            count: 4,
        };

        let response = policy.answer(&mut rng, request);
        assert_eq!(response.correlation_id, CorrelationId(9));
        assert_eq!(response.len(), 4);
    }

    #[test]
    fn test_policy_is_deterministic_per_seed() {
        let policy = OutcomePolicy::default();
        let a = policy.draw(&mut ChaCha8Rng::seed_from_u64(5), 10);
        let b = policy.draw(&mut ChaCha8Rng::seed_from_u64(5), 10);
        assert_eq!(a, b);
    }
}
