//! Model configuration
//!
//! Parameters are plain numbers fed to normal distributions. Configs can be
//! built from the presets below or loaded from TOML, e.g.
//!
//! ```toml
//! arrival_rate_mean = 4.0
//! arrival_rate_std_dev = 2.0
//! workload_mean = 8.0
//! workload_std_dev = 6.0
//! server_rate_mean = 14.0
//! server_rate_std_dev = 4.0
//! num_servers = 4
//! hours_to_run = 8
//! queue_capacity = 20   # omit for an unbounded queue
//! seed = 42
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MINUTES_PER_HOUR: usize = 60;

/// Upper bound on the arrival mean and standard deviation. Each minute's
/// arrivals are allocated up front, so an unbounded rate is an allocation bomb.
pub const MAX_ARRIVAL_RATE: f64 = 10_000.0;

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    // Customers arriving per minute
    pub arrival_rate_mean: f64,
    pub arrival_rate_std_dev: f64,

    // Units of work each customer brings
    pub workload_mean: f64,
    pub workload_std_dev: f64,

    // Units of work each server delivers per minute
    pub server_rate_mean: f64,
    pub server_rate_std_dev: f64,

    pub num_servers: usize,
    pub hours_to_run: usize,

    /// `None` means unbounded: no arrival is ever turned away
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl ModelConfig {
    /// Store checkout defaults: 4 cashiers, 8 hours, no queue limit
    pub fn baseline() -> Self {
        ModelConfig {
            arrival_rate_mean: 4.0,
            arrival_rate_std_dev: 2.0,
            workload_mean: 8.0,
            workload_std_dev: 6.0,
            server_rate_mean: 14.0,
            server_rate_std_dev: 4.0,
            num_servers: 4,
            hours_to_run: 8,
            queue_capacity: None,
            seed: default_seed(),
        }
    }

    /// Understaffed variant where the queue fills and arrivals are lost
    pub fn congested() -> Self {
        ModelConfig {
            num_servers: 2,
            queue_capacity: Some(20),
            ..Self::baseline()
        }
    }

    /// Saturates for an unvalidated config; `validate` rejects overflow
    pub fn simulation_minutes(&self) -> usize {
        self.hours_to_run.saturating_mul(MINUTES_PER_HOUR)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Means must be finite and standard deviations finite and non-negative.
    /// Arrival parameters are capped at `MAX_ARRIVAL_RATE`, and the run must
    /// last at least one hour without overflowing its minute count. Zero
    /// servers and zero capacity are legal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let distributions = [
            (
                ("arrival_rate_mean", self.arrival_rate_mean),
                ("arrival_rate_std_dev", self.arrival_rate_std_dev),
            ),
            (
                ("workload_mean", self.workload_mean),
                ("workload_std_dev", self.workload_std_dev),
            ),
            (
                ("server_rate_mean", self.server_rate_mean),
                ("server_rate_std_dev", self.server_rate_std_dev),
            ),
        ];
        for ((mean_field, mean), (sd_field, sd)) in distributions {
            if !mean.is_finite() {
                return Err(ConfigError::Invalid {
                    field: mean_field,
                    reason: format!("mean must be finite, got {}", mean),
                });
            }
            if !sd.is_finite() || sd < 0.0 {
                return Err(ConfigError::Invalid {
                    field: sd_field,
                    reason: format!("standard deviation must be finite and >= 0, got {}", sd),
                });
            }
        }

        let arrival_bounds = [
            ("arrival_rate_mean", self.arrival_rate_mean.abs()),
            ("arrival_rate_std_dev", self.arrival_rate_std_dev),
        ];
        for (field, value) in arrival_bounds {
            if value > MAX_ARRIVAL_RATE {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be at most {} per minute, got {}", MAX_ARRIVAL_RATE, value),
                });
            }
        }

        if self.hours_to_run == 0 {
            return Err(ConfigError::Invalid {
                field: "hours_to_run",
                reason: "simulation must run for at least one hour".to_string(),
            });
        }
        if self.hours_to_run.checked_mul(MINUTES_PER_HOUR).is_none() {
            return Err(ConfigError::Invalid {
                field: "hours_to_run",
                reason: format!("{} hours overflows the minute count", self.hours_to_run),
            });
        }

        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::baseline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_runs_eight_hours() {
        let config = ModelConfig::baseline();
        assert_eq!(config.simulation_minutes(), 480);
        assert_eq!(config.queue_capacity, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn congested_only_changes_staffing_and_capacity() {
        let config = ModelConfig::congested();
        assert_eq!(config.num_servers, 2);
        assert_eq!(config.queue_capacity, Some(20));
        assert_eq!(config.workload_mean, ModelConfig::baseline().workload_mean);
    }

    #[test]
    fn parses_toml_with_defaults() {
        let toml = r#"
            arrival_rate_mean = 3.0
            arrival_rate_std_dev = 1.0
            workload_mean = 10.0
            workload_std_dev = 2.0
            server_rate_mean = 12.0
            server_rate_std_dev = 3.0
            num_servers = 2
            hours_to_run = 1
        "#;

        let config = ModelConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.num_servers, 2);
        assert_eq!(config.simulation_minutes(), 60);
        assert_eq!(config.queue_capacity, None);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn parses_bounded_capacity() {
        let toml = toml::to_string(&ModelConfig::congested()).unwrap();
        let config = ModelConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config, ModelConfig::congested());
    }

    #[test]
    fn rejects_negative_std_dev() {
        let mut config = ModelConfig::baseline();
        config.workload_std_dev = -1.0;

        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "workload_std_dev"),
            other => panic!("Expected invalid workload_std_dev, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_finite_mean() {
        let mut config = ModelConfig::baseline();
        config.server_rate_mean = f64::NAN;

        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "server_rate_mean"),
            other => panic!("Expected invalid server_rate_mean, got {:?}", other),
        }
    }

    #[test]
    fn rejects_zero_length_run() {
        let mut config = ModelConfig::baseline();
        config.hours_to_run = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_run_length_that_overflows_minutes() {
        let mut config = ModelConfig::baseline();
        config.hours_to_run = usize::MAX;

        assert_eq!(config.simulation_minutes(), usize::MAX);
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "hours_to_run"),
            other => panic!("Expected invalid hours_to_run, got {:?}", other),
        }
    }

    #[test]
    fn rejects_absurd_arrival_rate() {
        let mut config = ModelConfig::baseline();
        config.arrival_rate_mean = 1e12;

        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "arrival_rate_mean"),
            other => panic!("Expected invalid arrival_rate_mean, got {:?}", other),
        }

        config.arrival_rate_mean = MAX_ARRIVAL_RATE;
        assert!(config.validate().is_ok());

        config.arrival_rate_std_dev = MAX_ARRIVAL_RATE * 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_hours_in_toml_is_rejected_not_panicked() {
        let toml = format!(
            r#"
            arrival_rate_mean = 3.0
            arrival_rate_std_dev = 1.0
            workload_mean = 10.0
            workload_std_dev = 2.0
            server_rate_mean = 12.0
            server_rate_std_dev = 3.0
            num_servers = 2
            hours_to_run = {}
        "#,
            i64::MAX
        );
        assert!(matches!(
            ModelConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid {
                field: "hours_to_run",
                ..
            })
        ));
    }

    #[test]
    fn zero_servers_and_zero_capacity_are_legal() {
        let mut config = ModelConfig::baseline();
        config.num_servers = 0;
        config.queue_capacity = Some(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml = r#"
            arrival_rate_mean = 3.0
            arrival_rate_std_dev = 1.0
            workload_mean = 10.0
            workload_std_dev = 2.0
            server_rate_mean = 12.0
            server_rate_std_dev = 3.0
            num_servers = 2
            hours_to_run = 1
            cashiers = 7
        "#;
        assert!(matches!(
            ModelConfig::from_toml_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }
}
