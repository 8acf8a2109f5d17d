//! Simulated outcome collaborator with fault injection.
//!
//! Delivery is scheduled in ticks rather than wall-clock time: a response
//! becomes available once the harness advances the source's clock past its
//! due tick. Faults are drawn from their own RNG stream so that changing the
//! fault profile never changes which outcomes are drawn.

use crate::error::SimError;
use arena_env::{EnvError, OutcomePolicy, OutcomeRequest, OutcomeResponse, OutcomeSource, TickId};
use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// Fault injection settings for the simulated collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultProfile {
    /// Minimum delivery latency in ticks
    pub min_latency: u64,

    /// Maximum delivery latency in ticks
    pub max_latency: u64,

    /// Probability a response is never delivered
    pub drop_rate: f64,

    /// Probability a response is delivered a second time
    pub duplicate_rate: f64,

    /// Probability a response carries fewer outcomes than requested
    pub truncate_rate: f64,

    /// Probability a response carries one extra outcome
    pub pad_rate: f64,
}

impl FaultProfile {
    /// Every response arrives on the next tick, intact.
    pub fn none() -> Self {
        Self {
            min_latency: 1,
            max_latency: 1,
            drop_rate: 0.0,
            duplicate_rate: 0.0,
            truncate_rate: 0.0,
            pad_rate: 0.0,
        }
    }

    /// Sets the latency range in ticks.
    pub fn with_latency(mut self, min: u64, max: u64) -> Self {
        self.min_latency = min;
        self.max_latency = max;
        self
    }

    pub fn with_drop_rate(mut self, rate: f64) -> Self {
        self.drop_rate = rate;
        self
    }

    pub fn with_duplicate_rate(mut self, rate: f64) -> Self {
        self.duplicate_rate = rate;
        self
    }

    pub fn with_truncate_rate(mut self, rate: f64) -> Self {
        self.truncate_rate = rate;
        self
    }

    pub fn with_pad_rate(mut self, rate: f64) -> Self {
        self.pad_rate = rate;
        self
    }

    /// True when every request is eventually answered.
    pub fn is_lossless(&self) -> bool {
        self.drop_rate == 0.0
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.min_latency > self.max_latency {
            return Err(SimError::InvalidFaults(format!(
                "latency range {}..={} is empty",
                self.min_latency, self.max_latency
            )));
        }
        for (name, rate) in [
            ("drop_rate", self.drop_rate),
            ("duplicate_rate", self.duplicate_rate),
            ("truncate_rate", self.truncate_rate),
            ("pad_rate", self.pad_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimError::InvalidFaults(format!("{name} {rate} not in [0, 1]")));
            }
        }
        Ok(())
    }
}

impl Default for FaultProfile {
    fn default() -> Self {
        Self::none()
    }
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub requests: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub duplicated: u64,
    pub truncated: u64,
    pub padded: u64,
}

struct Samplers {
    latency: Uniform<u64>,
    drop: Bernoulli,
    duplicate: Bernoulli,
    truncate: Bernoulli,
    pad: Bernoulli,
}

struct Inner {
    /// Current tick as seen by the collaborator
    clock: u64,

    /// Responses keyed by (due tick, sequence)
    scheduled: BTreeMap<(u64, u64), OutcomeResponse>,

    next_seq: u64,

    outcome_rng: ChaCha8Rng,

    fault_rng: ChaCha8Rng,

    stats: DeliveryStats,
}

impl Inner {
    fn schedule(&mut self, due: u64, response: OutcomeResponse) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.scheduled.insert((due, seq), response);
    }
}

/// Tick-scheduled outcome source with configurable faults.
pub struct SimOutcomeSource {
    policy: OutcomePolicy,

    faults: FaultProfile,

    samplers: Samplers,

    inner: Mutex<Inner>,
}

impl SimOutcomeSource {
    /// Creates a source drawing outcomes from `outcome_rng` and faults from `fault_rng`.
    pub fn new(
        policy: OutcomePolicy,
        faults: FaultProfile,
        outcome_rng: ChaCha8Rng,
        fault_rng: ChaCha8Rng,
    ) -> Result<Self, SimError> {
        faults.validate()?;
        let bernoulli =
            |p: f64| Bernoulli::new(p).map_err(|e| SimError::InvalidFaults(e.to_string()));

        let samplers = Samplers {
            latency: Uniform::new_inclusive(faults.min_latency, faults.max_latency),
            drop: bernoulli(faults.drop_rate)?,
            duplicate: bernoulli(faults.duplicate_rate)?,
            truncate: bernoulli(faults.truncate_rate)?,
            pad: bernoulli(faults.pad_rate)?,
        };

        Ok(Self {
            policy,
            faults,
            samplers,
            inner: Mutex::new(Inner {
                clock: 0,
                scheduled: BTreeMap::new(),
                next_seq: 0,
                outcome_rng,
                fault_rng,
                stats: DeliveryStats::default(),
            }),
        })
    }

    pub fn faults(&self) -> &FaultProfile {
        &self.faults
    }

    /// Moves the collaborator's clock to `tick`.
    pub fn advance_to(&self, tick: TickId) {
        let mut inner = self.lock();
        inner.clock = inner.clock.max(tick.0);
    }

    /// Returns a snapshot of the delivery counters.
    pub fn stats(&self) -> DeliveryStats {
        self.lock().stats
    }

    /// Tick at which the next scheduled response becomes due.
    pub fn next_due(&self) -> Option<TickId> {
        self.lock().scheduled.keys().next().map(|(due, _)| TickId(*due))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OutcomeSource for SimOutcomeSource {
    fn request(&self, request: OutcomeRequest) -> Result<(), EnvError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.stats.requests += 1;

        let mut response = self.policy.answer(&mut inner.outcome_rng, request);

        if self.samplers.drop.sample(&mut inner.fault_rng) {
            inner.stats.dropped += 1;
            debug!("Dropping response {}", request.correlation_id);
            return Ok(());
        }

        if !response.is_empty() && self.samplers.truncate.sample(&mut inner.fault_rng) {
            let keep = Uniform::new(0, response.len()).sample(&mut inner.fault_rng);
            response.outcomes.truncate(keep);
            inner.stats.truncated += 1;
        } else if self.samplers.pad.sample(&mut inner.fault_rng) {
            let extra = self.policy.draw_one(&mut inner.outcome_rng);
            response.outcomes.push(extra);
            inner.stats.padded += 1;
        }

        let due = inner.clock + self.samplers.latency.sample(&mut inner.fault_rng);
        if self.samplers.duplicate.sample(&mut inner.fault_rng) {
            let echo = due + self.samplers.latency.sample(&mut inner.fault_rng);
            inner.schedule(echo, response.clone());
            inner.stats.duplicated += 1;
        }
        inner.schedule(due, response);

        Ok(())
    }

    async fn recv(&self) -> Option<OutcomeResponse> {
        // Virtual time jumps straight to the next delivery
        let mut inner = self.lock();
        let (&(due, seq), _) = inner.scheduled.iter().next()?;
        inner.clock = inner.clock.max(due);
        inner.stats.delivered += 1;
        inner.scheduled.remove(&(due, seq))
    }

    fn try_recv(&self) -> Option<OutcomeResponse> {
        let mut inner = self.lock();
        let (&(due, seq), _) = inner.scheduled.iter().next()?;
        if due > inner.clock {
            return None;
        }
        inner.stats.delivered += 1;
        inner.scheduled.remove(&(due, seq))
    }

    fn in_flight(&self) -> usize {
        self.lock().scheduled.len()
    }
}
