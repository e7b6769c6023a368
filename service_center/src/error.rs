use std::path::PathBuf;

use thiserror::Error;

/// Problems loading or validating a `ModelConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures while building or running a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid normal distribution (mean {mean}, sd {sd}): {source}")]
    Distribution {
        mean: f64,
        sd: f64,
        #[source]
        source: rand_distr::NormalError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Simulation halted at {reason}")]
    Halted { reason: String },

    #[error("Tick loop produced no report")]
    MissingReport,
}

/// Summary statistics requested before any sample was recorded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("No samples recorded for {statistic}")]
    NoSamples { statistic: &'static str },
}

/// Failures writing batch results to disk
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
