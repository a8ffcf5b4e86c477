//! Configuration System
//!
//! Layered configuration: built-in defaults, then an optional `retell.toml`,
//! then `RETELL_*` environment overrides (e.g. `RETELL_GENERATION__PACE_DELAY_MS`).
//! Sections mirror the crate's components: provider, generation, storage,
//! logging.

use crate::error::PipelineError;
use crate::generator::RetryPolicy;
use crate::ingest::DEFAULT_BODY_CAP;
use crate::logging::LoggingConfig;
use crate::pipeline::PipelineConfig;
use crate::provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "retell.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetellConfig {
    /// Generative provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Pipeline and retry settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Storage paths
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum completion attempts per tier request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Base backoff delay after a rate limit (milliseconds)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Fixed pacing delay between tier requests (milliseconds)
    #[serde(default = "default_pace_delay_ms")]
    pub pace_delay_ms: u64,

    /// Ingest-side body cap (characters)
    #[serde(default = "default_body_cap")]
    pub body_cap: usize,
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    10_000
}

fn default_pace_delay_ms() -> u64 {
    500
}

fn default_body_cap() -> usize {
    DEFAULT_BODY_CAP
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            pace_delay_ms: default_pace_delay_ms(),
            body_cap: default_body_cap(),
        }
    }
}

impl GenerationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            pace_delay: Duration::from_millis(self.pace_delay_ms),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store directory. Defaults to the platform data dir
    /// (e.g. `~/.local/share/retell/store`), falling back to `.retell/store`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "retell")
            .map(|dirs| dirs.data_dir().join("store"))
            .unwrap_or_else(|| PathBuf::from(".retell/store"))
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the default file lookup.
    pub fn load() -> Result<RetellConfig, PipelineError> {
        Self::load_with_file(None)
    }

    /// Load configuration from an explicit file path.
    ///
    /// With `None`, `retell.toml` in the working directory is used when
    /// present; a named path must exist.
    pub fn load_with_file(path: Option<&Path>) -> Result<RetellConfig, PipelineError> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(explicit) => builder.add_source(
                config::File::from(explicit.to_path_buf()).required(true),
            ),
            None => builder.add_source(
                config::File::with_name(CONFIG_FILE)
                    .format(config::FileFormat::Toml)
                    .required(false),
            ),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix("RETELL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
