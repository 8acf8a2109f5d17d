//! Production implementations of the environment seams using Tokio.

use crate::error::EnvError;
use crate::outcome::{OutcomePolicy, OutcomeSource};
use crate::types::{OutcomeRequest, OutcomeResponse};
use crate::ArenaContext;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Production context backed by Tokio and OS entropy.
///
/// Time comes from the system clock, randomness from fresh entropy.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArenaContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn derive_rng(&self, _stream: u64) -> ChaCha8Rng {
        // In production, every stream is independently random
        ChaCha8Rng::from_entropy()
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

/// Outcome collaborator that answers each request from a spawned task.
///
/// The draw happens at request time; delivery happens `latency` later on
/// the Tokio runtime, so responses reach the engine as separate units of
/// work from the tick that asked for them.
pub struct TokioOutcomeSource {
    policy: OutcomePolicy,

    rng: Mutex<ChaCha8Rng>,

    latency: Duration,

    /// Sender cloned into each delivery task
    tx: mpsc::UnboundedSender<OutcomeResponse>,

    /// Receiver for delivered responses (behind tokio mutex for async)
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<OutcomeResponse>>,

    in_flight: Arc<AtomicUsize>,
}

impl TokioOutcomeSource {
    /// Creates a new outcome source.
    ///
    /// # Arguments
    /// * `policy` - Outcome distribution
    /// * `rng` - Entropy for draws (usually from `ArenaContext::derive_rng`)
    /// * `latency` - Delay between request and delivery
    pub fn new(policy: OutcomePolicy, rng: ChaCha8Rng, latency: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            policy,
            rng: Mutex::new(rng),
            latency,
            tx,
            rx: tokio::sync::Mutex::new(rx),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the configured delivery latency.
    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl OutcomeSource for TokioOutcomeSource {
    fn request(&self, request: OutcomeRequest) -> Result<(), EnvError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| EnvError::rejected(format!("no tokio runtime: {e}")))?;

        let response = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| EnvError::ContextError("outcome rng poisoned".to_string()))?;
            self.policy.answer(&mut *rng, request)
        };

        let tx = self.tx.clone();
        let latency = self.latency;
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        handle.spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            // Receiver gone means the engine was torn down; pending work is discarded.
            let _ = tx.send(response);
        });

        Ok(())
    }

    async fn recv(&self) -> Option<OutcomeResponse> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    fn try_recv(&self) -> Option<OutcomeResponse> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
