//! Samplers for host-wide gauges from `/proc/`.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::collector::SampleError;
use crate::collector::procfs::parser::{
    CpuSample, DISK_FIELD_OFFSETS, parse_cpu_sample, parse_net_dev_last,
};
use crate::collector::procfs::reader::{read_labeled, read_positional, read_source};
use crate::collector::traits::FileSystem;
use crate::store::model::{DiskSnapshot, MemorySnapshot, NetworkSnapshot};

/// Disk device sampled when none is configured.
pub const DEFAULT_DISK_DEVICE: &str = "sda";

fn proc_file(proc_path: &Path, name: &str) -> PathBuf {
    proc_path.join(name)
}

/// CPU utilisation from successive `/proc/stat` readings.
///
/// Owns the previous sample, so the first call after construction can only
/// establish a baseline. Intended for a single caller (the sampling loop).
pub struct CpuSampler<F: FileSystem> {
    fs: F,
    stat_path: PathBuf,
    prev: Option<CpuSample>,
}

impl<F: FileSystem> CpuSampler<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            stat_path: proc_file(proc_path.as_ref(), "stat"),
            prev: None,
        }
    }

    /// Returns true once a baseline sample has been stored.
    pub fn is_ready(&self) -> bool {
        self.prev.is_some()
    }

    /// Reads the current counters and returns busy percentage since the last call.
    ///
    /// The stored baseline is replaced by every successful read, including
    /// the `InsufficientHistory` and `DegenerateInterval` paths.
    pub fn sample(&mut self) -> Result<f64, SampleError> {
        let content = read_source(&self.fs, &self.stat_path)?;
        let curr = parse_cpu_sample(&content)
            .ok_or_else(|| SampleError::field_not_found(&self.stat_path, "cpu"))?;

        let Some(prev) = self.prev.replace(curr) else {
            return Err(SampleError::InsufficientHistory);
        };

        let pct = curr
            .utilization_since(&prev)
            .ok_or(SampleError::DegenerateInterval)?;
        trace!(total = curr.total(), pct, "cpu sample");
        Ok(pct)
    }
}

/// Memory gauges from `/proc/meminfo`.
pub struct MemorySampler<F: FileSystem> {
    fs: F,
    meminfo_path: PathBuf,
}

impl<F: FileSystem> MemorySampler<F> {
    pub fn new(fs: F, proc_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            meminfo_path: proc_file(proc_path.as_ref(), "meminfo"),
        }
    }

    /// Reads `MemTotal` and `MemAvailable` (two separate scans) and derives
    /// the memory gauges.
    pub fn sample(&self) -> Result<MemorySnapshot, SampleError> {
        let total = self.read_kb("MemTotal")?;
        let available = self.read_kb("MemAvailable")?;
        MemorySnapshot::from_kb(total, available).ok_or(SampleError::NoData)
    }

    fn read_kb(&self, label: &str) -> Result<u64, SampleError> {
        match read_labeled(&self.fs, &self.meminfo_path, label) {
            Err(SampleError::FieldNotFound { .. }) => Err(SampleError::NoData),
            other => other,
        }
    }
}

/// Disk gauges for a single device from `/proc/diskstats`.
pub struct DiskSampler<F: FileSystem> {
    fs: F,
    diskstats_path: PathBuf,
    device: String,
}

impl<F: FileSystem> DiskSampler<F> {
    pub fn new(fs: F, proc_path: impl AsRef<Path>, device: impl Into<String>) -> Self {
        Self {
            fs,
            diskstats_path: proc_file(proc_path.as_ref(), "diskstats"),
            device: device.into(),
        }
    }

    /// Reads the device's line once at [`DISK_FIELD_OFFSETS`].
    pub fn sample(&self) -> Result<DiskSnapshot, SampleError> {
        let offsets = DISK_FIELD_OFFSETS;
        match read_positional(&self.fs, &self.diskstats_path, &self.device, &offsets.indices()) {
            Ok(values) => Ok(offsets.snapshot(&self.device, &values)),
            Err(SampleError::FieldNotFound { .. }) => Err(SampleError::DeviceNotFound {
                device: self.device.clone(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Network counters from `/proc/net/dev`.
///
/// Only the last interface in the file is reported; see
/// [`parse_net_dev_last`].
pub struct NetworkSampler<F: FileSystem> {
    fs: F,
    net_dev_path: PathBuf,
}

impl<F: FileSystem> NetworkSampler<F> {
    pub fn new(fs: F, proc_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            net_dev_path: proc_file(proc_path.as_ref(), "net/dev"),
        }
    }

    pub fn sample(&self) -> Result<NetworkSnapshot, SampleError> {
        let content = read_source(&self.fs, &self.net_dev_path)?;
        parse_net_dev_last(&content)
            .ok_or_else(|| SampleError::field_not_found(&self.net_dev_path, "interface"))
    }
}

/// Runnable process count (`procs_running` in `/proc/stat`).
pub struct ProcessSampler<F: FileSystem> {
    fs: F,
    stat_path: PathBuf,
}

impl<F: FileSystem> ProcessSampler<F> {
    pub fn new(fs: F, proc_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            stat_path: proc_file(proc_path.as_ref(), "stat"),
        }
    }

    pub fn sample(&self) -> Result<u64, SampleError> {
        read_labeled(&self.fs, &self.stat_path, "procs_running")
    }
}

/// Cumulative context switches (`ctxt` in `/proc/stat`), reported raw.
pub struct ContextSwitchSampler<F: FileSystem> {
    fs: F,
    stat_path: PathBuf,
}

impl<F: FileSystem> ContextSwitchSampler<F> {
    pub fn new(fs: F, proc_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            stat_path: proc_file(proc_path.as_ref(), "stat"),
        }
    }

    pub fn sample(&self) -> Result<u64, SampleError> {
        read_labeled(&self.fs, &self.stat_path, "ctxt")
    }
}
