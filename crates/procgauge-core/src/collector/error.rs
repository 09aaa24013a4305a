use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single sampler invocation.
///
/// None of these are fatal: the sampling loop logs them and leaves the
/// affected gauge at its previous value.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("cannot read {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("field '{field}' not found in {}", path.display())]
    FieldNotFound { path: PathBuf, field: String },

    #[error("device '{device}' not found in diskstats")]
    DeviceNotFound { device: String },

    #[error("no previous CPU sample, utilisation needs two readings")]
    InsufficientHistory,

    #[error("CPU tick counters did not advance between samples")]
    DegenerateInterval,

    #[error("memory counters missing or zero")]
    NoData,

    #[error("failed to spawn {}: {source}", executable.display())]
    ProcessSpawnFailed {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pipe {} unavailable: {reason}", path.display())]
    PipeUnavailable { path: PathBuf, reason: String },

    #[error("malformed benchmark record: {0}")]
    MalformedRecord(String),

    #[error("no benchmark result within {0:?}")]
    Timeout(Duration),

    #[error("sampling cancelled")]
    Cancelled,
}

impl SampleError {
    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SampleError::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn field_not_found(path: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        SampleError::FieldNotFound {
            path: path.into(),
            field: field.into(),
        }
    }
}
