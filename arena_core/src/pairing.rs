//! Pairing detector: finds same-rank agents in combat range and starts fights.
//!
//! Opponent choice goes through a [`PairingPolicy`]. The reference policy,
//! [`FirstMatch`], picks the first adjacent agent in population order and
//! is neither symmetric nor exclusive: the opponent need not enter
//! `Fighting` itself and may appear in several pairs in the same tick.
//! [`ExclusiveMatch`] restricts every agent to at most one pair per tick.

use crate::agent::Agent;
use arena_env::AgentId;
use serde::{Deserialize, Serialize};

/// Ordered pair of agents awaiting a fight outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatPair {
    /// The agent that found its opponent
    pub first: AgentId,

    /// The opponent it found
    pub second: AgentId,
}

impl CombatPair {
    pub fn new(first: AgentId, second: AgentId) -> Self {
        Self { first, second }
    }
}

/// Strategy for choosing a seeker's opponent.
///
/// `partners[i]` is the index of the agent `i` was already paired with this
/// tick, if any. Implementations return an index into `agents`.
pub trait PairingPolicy: Send + Sync {
    /// Short name for logs and CLI selection.
    fn name(&self) -> &'static str;

    /// Picks the opponent for `agents[seeker]`, or `None` to stay floating.
    fn select_opponent(
        &self,
        agents: &[Agent],
        seeker: usize,
        partners: &[Option<usize>],
    ) -> Option<usize>;
}

/// True when `agents[j]` is a legal opponent for `agents[i]`:
/// a different agent of the same rank in combat range.
pub fn adjacent(agents: &[Agent], i: usize, j: usize) -> bool {
    let (a, b) = (&agents[i], &agents[j]);
    a.id != b.id && a.rank == b.rank && a.in_combat_range(b)
}

/// First adjacent agent in population order, regardless of its state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl PairingPolicy for FirstMatch {
    fn name(&self) -> &'static str {
        "first_match"
    }

    fn select_opponent(
        &self,
        agents: &[Agent],
        seeker: usize,
        _partners: &[Option<usize>],
    ) -> Option<usize> {
        (0..agents.len()).find(|&j| adjacent(agents, seeker, j))
    }
}

/// One opponent per agent per tick.
///
/// An agent already claimed as someone's opponent fights that partner; an
/// unclaimed seeker only considers floating, unclaimed opponents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveMatch;

impl PairingPolicy for ExclusiveMatch {
    fn name(&self) -> &'static str {
        "exclusive"
    }

    fn select_opponent(
        &self,
        agents: &[Agent],
        seeker: usize,
        partners: &[Option<usize>],
    ) -> Option<usize> {
        if let Some(partner) = partners[seeker] {
            return Some(partner);
        }
        (0..agents.len()).find(|&j| {
            partners[j].is_none() && agents[j].is_floating() && adjacent(agents, seeker, j)
        })
    }
}

/// Looks a policy up by its CLI name.
pub fn policy_by_name(name: &str) -> Option<Box<dyn PairingPolicy>> {
    match name {
        "first_match" | "first" => Some(Box::new(FirstMatch)),
        "exclusive" => Some(Box::new(ExclusiveMatch)),
        _ => None,
    }
}

/// What the pairing phase did this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingReport {
    /// New pairs in discovery order
    pub pairs: Vec<CombatPair>,

    /// Agents that entered `Fighting(0)`
    pub engaged: usize,

    /// Agents whose fight timer ran out
    pub released: usize,
}

/// Runs the pairing phase over the active agents.
///
/// Each agent is visited once, in order. Fighting agents only advance their
/// timer. A floating agent with an opponent enters `Fighting(0)`; the pair
/// is recorded unless the agent was already counted as an earlier pair's
/// opponent. Adjacency reads only rank and position, which this phase never
/// changes, so every check sees the same snapshot.
pub fn detect_pairs(
    agents: &mut [Agent],
    fight_duration: u32,
    policy: &dyn PairingPolicy,
) -> PairingReport {
    let mut report = PairingReport::default();
    let mut partners: Vec<Option<usize>> = vec![None; agents.len()];

    for i in 0..agents.len() {
        if agents[i].is_fighting() {
            if agents[i].advance_fight_timer(fight_duration) {
                report.released += 1;
            }
            continue;
        }
        if !agents[i].is_floating() {
            continue;
        }

        let Some(j) = policy.select_opponent(agents, i, &partners) else {
            continue;
        };

        agents[i].start_fight();
        report.engaged += 1;

        if partners[i].is_none() {
            report.pairs.push(CombatPair::new(agents[i].id, agents[j].id));
            partners[i] = Some(j);
            if partners[j].is_none() {
                partners[j] = Some(i);
            }
        }
    }

    report
}
