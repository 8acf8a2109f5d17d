//! Chaos scenarios for the arena harness.

use crate::outcomes::FaultProfile;
use arena_core::ArenaConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Responses arrive on the next tick, intact
    Baseline,

    /// 1-12 tick latency, responses overtake each other
    Delayed,

    /// 30% of responses never arrive
    Lossy,

    /// Half of the responses are delivered twice
    Duplicate,

    /// Outcome lists randomly shortened or padded
    Truncated,

    /// 80 agents packed into a small arena
    Crowded,

    /// Exclusive pairing policy under moderate latency
    Exclusive,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::Delayed,
            ScenarioId::Lossy,
            ScenarioId::Duplicate,
            ScenarioId::Truncated,
            ScenarioId::Crowded,
            ScenarioId::Exclusive,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::Delayed => "delayed",
            ScenarioId::Lossy => "lossy",
            ScenarioId::Duplicate => "duplicate",
            ScenarioId::Truncated => "truncated",
            ScenarioId::Crowded => "crowded",
            ScenarioId::Exclusive => "exclusive",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "Next-tick responses, reference pairing",
            ScenarioId::Delayed => "1-12 tick latency with out-of-order delivery",
            ScenarioId::Lossy => "30% response loss, buckets leak and are reported",
            ScenarioId::Duplicate => "50% of responses delivered twice",
            ScenarioId::Truncated => "30% short outcome lists, 20% padded",
            ScenarioId::Crowded => "80 agents in a 400x300 arena",
            ScenarioId::Exclusive => "One opponent per agent per tick",
        }
    }

    /// Fault profile for the outcome collaborator.
    pub fn faults(&self) -> FaultProfile {
        match self {
            ScenarioId::Baseline => FaultProfile::none(),
            ScenarioId::Delayed => FaultProfile::none().with_latency(1, 12),
            ScenarioId::Lossy => FaultProfile::none().with_latency(1, 3).with_drop_rate(0.3),
            ScenarioId::Duplicate => FaultProfile::none().with_latency(1, 4).with_duplicate_rate(0.5),
            ScenarioId::Truncated => FaultProfile::none()
                .with_latency(1, 2)
                .with_truncate_rate(0.3)
                .with_pad_rate(0.2),
            ScenarioId::Crowded => FaultProfile::none().with_latency(1, 4),
            ScenarioId::Exclusive => FaultProfile::none().with_latency(1, 4),
        }
    }

    /// Arena settings, derived from a base configuration.
    pub fn arena(&self, base: &ArenaConfig) -> ArenaConfig {
        match self {
            ScenarioId::Crowded => ArenaConfig {
                count: 80,
                arena_width: 400,
                arena_height: 300,
                ..base.clone()
            },
            _ => base.clone(),
        }
    }

    /// Pairing policy name.
    pub fn policy(&self) -> &'static str {
        match self {
            ScenarioId::Exclusive => "exclusive",
            _ => "first_match",
        }
    }

    /// True if every bucket must be resolved once the run is drained.
    pub fn expects_no_leak(&self) -> bool {
        self.faults().is_lossless()
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(ScenarioId::Baseline),
            "delayed" | "delay" => Ok(ScenarioId::Delayed),
            "lossy" | "loss" => Ok(ScenarioId::Lossy),
            "duplicate" | "dup" => Ok(ScenarioId::Duplicate),
            "truncated" | "truncate" => Ok(ScenarioId::Truncated),
            "crowded" => Ok(ScenarioId::Crowded),
            "exclusive" => Ok(ScenarioId::Exclusive),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>().unwrap(), scenario);
        }
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_only_lossy_may_leak() {
        let leaky: Vec<_> = ScenarioId::all()
            .into_iter()
            .filter(|s| !s.expects_no_leak())
            .collect();
        assert_eq!(leaky, vec![ScenarioId::Lossy]);
    }
}
