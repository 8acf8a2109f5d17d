//! Fight resolution protocol: pending buckets and outcome application.
//!
//! # Two phases
//!
//! ```text
//!  tick T (request)                         later (response)
//!  ─────────────────                        ─────────────────
//!  pairs found ──► bucket[c] = pairs        (c, outcomes) arrives
//!               └► request(c, pairs.len())  bucket[c] taken ──► apply pair[i] ↔ outcome[i]
//!                                           no bucket[c]    ──► ignored
//! ```
//!
//! Updates are applied by id against the population as it is when the
//! response arrives. Missing agents are skipped; an agent updated twice in
//! one batch keeps the last update.

use crate::agent::Agent;
use crate::pairing::CombatPair;
use crate::population::Population;
use arena_env::{AgentId, CorrelationId, FightOutcome, OutcomeRequest, Side, TickId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Pairs recorded on one tick, waiting for their outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBucket {
    pub correlation_id: CorrelationId,

    /// Tick that produced the pairs
    pub opened_at: TickId,

    /// Pairs in discovery order
    pub pairs: Vec<CombatPair>,
}

/// Map from correlation id to the pairs awaiting that response.
///
/// At most one bucket per id; a bucket leaves the map exactly once, when
/// its response is taken.
#[derive(Debug, Clone, Default)]
pub struct PendingBuckets {
    buckets: BTreeMap<CorrelationId, PendingBucket>,
}

impl PendingBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a bucket and returns the request to issue for it.
    ///
    /// Returns `None` when there is nothing to resolve, or when a bucket for
    /// `correlation_id` already exists (the existing bucket is kept).
    pub fn open(
        &mut self,
        correlation_id: CorrelationId,
        opened_at: TickId,
        pairs: Vec<CombatPair>,
    ) -> Option<OutcomeRequest> {
        if pairs.is_empty() {
            return None;
        }
        if self.buckets.contains_key(&correlation_id) {
            warn!("Bucket {} already pending, refusing to overwrite", correlation_id);
            return None;
        }

        let request = OutcomeRequest {
            correlation_id,
            count: pairs.len(),
        };
        self.buckets.insert(
            correlation_id,
            PendingBucket {
                correlation_id,
                opened_at,
                pairs,
            },
        );
        Some(request)
    }

    /// Removes and returns the bucket for `correlation_id`.
    pub fn take(&mut self, correlation_id: CorrelationId) -> Option<PendingBucket> {
        self.buckets.remove(&correlation_id)
    }

    pub fn get(&self, correlation_id: CorrelationId) -> Option<&PendingBucket> {
        self.buckets.get(&correlation_id)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The longest-waiting bucket (smallest correlation id).
    pub fn oldest(&self) -> Option<&PendingBucket> {
        self.buckets.values().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingBucket> {
        self.buckets.values()
    }

    /// Drops every pending bucket, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.buckets.len();
        self.buckets.clear();
        discarded
    }
}

/// Whether a response matched a pending bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Bucket found and applied
    Resolved,

    /// Unknown or already-resolved id; nothing changed
    Ignored,
}

/// Accounting for one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub correlation_id: CorrelationId,
    pub status: ResolutionStatus,

    /// Pairs that received an outcome
    pub applied: usize,

    /// Pairs left without an outcome (short response); their combat is lost
    pub dropped_pairs: usize,

    /// Outcomes beyond the number of pairs
    pub excess_outcomes: usize,

    /// Winner/loser sides skipped because the agent is no longer active
    pub missing_sides: usize,

    /// Agents whose win brought them to max rank
    pub promoted: Vec<AgentId>,
}

impl ResolutionReport {
    /// Report for a response with no matching bucket.
    pub fn ignored(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            status: ResolutionStatus::Ignored,
            applied: 0,
            dropped_pairs: 0,
            excess_outcomes: 0,
            missing_sides: 0,
            promoted: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}

/// Returns `(winner, loser)` for a pair under an outcome side.
pub fn winner_and_loser(pair: &CombatPair, side: Side) -> (AgentId, AgentId) {
    match side {
        Side::First => (pair.first, pair.second),
        Side::Second => (pair.second, pair.first),
    }
}

/// Applies `outcomes` to the pairs of a taken bucket.
///
/// Pairs and outcomes are matched positionally; surplus on either side is
/// counted and otherwise ignored. Every new record is computed from the
/// agent as it stands before the batch. When an agent appears in several
/// pairs, the record from the later pair replaces the earlier one.
pub fn apply_outcomes(
    population: &mut Population,
    bucket: &PendingBucket,
    outcomes: &[FightOutcome],
    max_rank: u32,
) -> ResolutionReport {
    let mut report = ResolutionReport {
        correlation_id: bucket.correlation_id,
        status: ResolutionStatus::Resolved,
        applied: 0,
        dropped_pairs: bucket.pairs.len().saturating_sub(outcomes.len()),
        excess_outcomes: outcomes.len().saturating_sub(bucket.pairs.len()),
        missing_sides: 0,
        promoted: Vec::new(),
    };

    // id -> (record, came from a win)
    let mut records: BTreeMap<AgentId, (Agent, bool)> = BTreeMap::new();

    for (pair, outcome) in bucket.pairs.iter().zip(outcomes) {
        let (winner_id, loser_id) = winner_and_loser(pair, outcome.side);

        match population.get_active(winner_id) {
            Some(winner) => {
                let mut record = winner.clone();
                record.apply_win(outcome.vector, max_rank);
                records.insert(winner_id, (record, true));
            }
            None => report.missing_sides += 1,
        }

        match population.get_active(loser_id) {
            Some(loser) => {
                let mut record = loser.clone();
                record.apply_loss();
                records.insert(loser_id, (record, false));
            }
            None => report.missing_sides += 1,
        }

        report.applied += 1;
        debug!("Fight {}: {} beat {}", bucket.correlation_id, winner_id, loser_id);
    }

    for (id, (record, won)) in records {
        if won && record.rank == max_rank {
            report.promoted.push(id);
        }
        if let Some(agent) = population.get_active_mut(id) {
            *agent = record;
        }
    }

    report
}
