//! Core environment context trait for the arena engine's surroundings.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" around the engine: the clock that
/// paces ticks and the entropy used to seed the population and the outcome
/// collaborator.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, OS entropy
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// The engine advances one fixed step per tick regardless of how much time
/// passes between ticks, so the clock only matters for pacing. All
/// randomness goes through [`ArenaContext::derive_rng`].
#[async_trait]
pub trait ArenaContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Derives an RNG stream for one subsystem.
    ///
    /// The implementation combines the global seed with `stream` so that
    /// the population and the outcome collaborator draw from independent
    /// but reproducible sequences.
    ///
    /// # Arguments
    /// * `stream` - A value to combine with the global seed
    fn derive_rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
