//! Arena configuration and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating an [`ArenaConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("radius must be positive, got {0}")]
    InvalidRadius(i32),

    #[error("arena {width}x{height} cannot hold an agent of radius {radius}")]
    ArenaTooSmall { width: i32, height: i32, radius: i32 },

    #[error("max_rank must be at least 1")]
    ZeroMaxRank,

    #[error("velocity bounds must be non-negative, got ({0}, {1})")]
    NegativeVelocityBound(i32, i32),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for one simulation run.
///
/// Shared by the initialization collaborator, the engine phases and the
/// reference outcome policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Number of agents created at initialization
    pub count: usize,

    /// Arena width in position units
    pub arena_width: i32,

    /// Arena height in position units
    pub arena_height: i32,

    /// Radius shared by every agent
    pub radius: i32,

    /// Bound on |vx| for initial velocities and outcome vectors
    pub max_velocity_x: i32,

    /// Bound on |vy| for initial velocities and outcome vectors
    pub max_velocity_y: i32,

    /// Rank at which an agent retires
    pub max_rank: u32,

    /// Ticks an agent stays in `Fighting` after pairing
    pub fight_duration: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            count: 30,
            arena_width: 750,
            arena_height: 500,
            radius: 20,
            max_velocity_x: 5,
            max_velocity_y: 5,
            max_rank: 5,
            fight_duration: 30,
        }
    }
}

impl ArenaConfig {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parses a configuration from JSON text and validates it.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that an agent circle fits in the arena and bounds are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.radius <= 0 {
            return Err(ConfigError::InvalidRadius(self.radius));
        }

        // Spawn range is radius+1 ..= dimension-radius-1
        let min_dimension = 2 * i64::from(self.radius) + 2;
        if i64::from(self.arena_width) < min_dimension || i64::from(self.arena_height) < min_dimension {
            return Err(ConfigError::ArenaTooSmall {
                width: self.arena_width,
                height: self.arena_height,
                radius: self.radius,
            });
        }

        if self.max_rank == 0 {
            return Err(ConfigError::ZeroMaxRank);
        }

        if self.max_velocity_x < 0 || self.max_velocity_y < 0 {
            return Err(ConfigError::NegativeVelocityBound(
                self.max_velocity_x,
                self.max_velocity_y,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_radius_is_rejected_not_overflowed() {
        assert!(matches!(
            ArenaConfig::from_json_str(r#"{ "radius": 2000000000 }"#),
            Err(ConfigError::ArenaTooSmall { radius: 2000000000, .. })
        ));

        let config = ArenaConfig {
            radius: i32::MAX,
            arena_width: i32::MAX,
            arena_height: i32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ArenaTooSmall { .. })
        ));
    }

    #[test]
    fn test_rejects_tiny_arena() {
        let config = ArenaConfig {
            arena_width: 41,
            radius: 20,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ArenaTooSmall { .. })
        ));

        // Exactly one spawn column
        let config = ArenaConfig {
            arena_width: 42,
            arena_height: 42,
            radius: 20,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_radius_and_rank() {
        let config = ArenaConfig {
            radius: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRadius(0))));

        let config = ArenaConfig {
            max_rank: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMaxRank)));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ArenaConfig::from_json_str(r#"{ "count": 4, "max_rank": 2 }"#).unwrap();
        assert_eq!(config.count, 4);
        assert_eq!(config.max_rank, 2);
        assert_eq!(config.radius, ArenaConfig::default().radius);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            ArenaConfig::from_json_str(r#"{ "radius": -3 }"#),
            Err(ConfigError::InvalidRadius(-3))
        ));
        assert!(matches!(
            ArenaConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
