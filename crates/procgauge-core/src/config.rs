//! Agent configuration loaded from a JSON file.
//!
//! Every field is optional:
//!
//! ```json
//! {
//!   "sampling_interval": 10,
//!   "metrics": ["cpu_usage", "memory_usage"],
//!   "proc_path": "/proc",
//!   "disk_device": "sda",
//!   "benchmark": {
//!     "executable": "./memory_benchmark",
//!     "fifo_path": "/tmp/my_fifo",
//!     "timeout_secs": 30
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::benchmark::{DEFAULT_FIFO_PATH, DEFAULT_TIMEOUT};
use crate::collector::procfs::DEFAULT_DISK_DEVICE;

/// Seconds between sampling cycles when not configured.
pub const DEFAULT_SAMPLING_INTERVAL: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between cycles. Zero is treated as one.
    pub sampling_interval: u64,
    /// Metric names to sample; unknown names are skipped with a warning.
    pub metrics: Vec<String>,
    pub proc_path: PathBuf,
    pub disk_device: String,
    pub benchmark: BenchmarkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            metrics: Vec::new(),
            proc_path: PathBuf::from("/proc"),
            disk_device: DEFAULT_DISK_DEVICE.to_string(),
            benchmark: BenchmarkConfig::default(),
        }
    }
}

/// Where to find the allocator benchmark and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub executable: PathBuf,
    pub fifo_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./memory_benchmark"),
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl BenchmarkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    /// Reads and parses `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Config::load`], but logs the failure and returns defaults.
    ///
    /// The defaults enable no metrics, so a broken config yields an agent that
    /// runs and samples nothing.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut config: Config = serde_json::from_str(content)?;
        if config.sampling_interval == 0 {
            config.sampling_interval = 1;
        }
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval.max(1))
    }
}
