use crate::enums::AllocationPolicy;
use crate::splitter::{PartitionPolicy, SplitStrategy};

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

/// Environment variable overriding [`PipelineConfig::workers`].
pub const WORKERS_ENV: &str = "VOLUME_PIPELINE_WORKERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Execution settings shared by every stage of a pipeline.
///
/// ```toml
/// workers = 8
/// partitions = { per_worker = 2 }
/// split_strategy = "slowest_axis"
/// allocation = "largest_possible_region"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker pool size. `None` uses every available core.
    pub workers: Option<usize>,
    pub partitions: PartitionPolicy,
    pub split_strategy: SplitStrategy,
    pub allocation: AllocationPolicy,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path.as_ref())?)
    }

    /// Applies [`WORKERS_ENV`] if it is set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        match std::env::var(WORKERS_ENV) {
            Ok(value) => self.with_workers_override(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_workers_override(mut self, value: &str) -> Result<Self, ConfigError> {
        let workers = value
            .trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::Invalid(format!("{WORKERS_ENV}={value}: {e}")))?;
        self.workers = Some(workers);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        match self.partitions {
            PartitionPolicy::PerWorker(0) | PartitionPolicy::Fixed(0) => {
                Err(ConfigError::Invalid("partition count must be at least 1".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.pieces(self.resolved_workers())
    }
}
