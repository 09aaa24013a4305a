//! Gauge value types held by the snapshot store.

/// Memory gauges derived from `MemTotal` and `MemAvailable`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemorySnapshot {
    pub total_mb: f64,
    pub available_mb: f64,
    pub used_mb: f64,
    pub usage_pct: f64,
    /// Heuristic, see [`MemorySnapshot::from_kb`].
    pub fragmentation_pct: f64,
}

impl MemorySnapshot {
    /// Derives all memory gauges from the two kernel counters (in kB).
    ///
    /// Fragmentation is estimated as `min(used, available) / total * 100`:
    /// zero when memory is entirely free or entirely used, at most 50 when
    /// allocated and available memory are evenly split. The kernel exposes no
    /// direct fragmentation counter in these sources.
    ///
    /// Returns `None` if `total_kb` is zero.
    pub fn from_kb(total_kb: u64, available_kb: u64) -> Option<Self> {
        if total_kb == 0 {
            return None;
        }
        let total = total_kb as f64;
        let available = available_kb as f64;
        let used = total - available;
        let total_mb = total / 1024.0;
        let available_mb = available / 1024.0;

        Some(Self {
            total_mb,
            available_mb,
            used_mb: total_mb - available_mb,
            usage_pct: used / total * 100.0,
            fragmentation_pct: used.min(available).max(0.0) / total * 100.0,
        })
    }
}

/// Disk gauges for one block device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskSnapshot {
    pub device: String,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
    pub io_in_progress: u64,
    pub io_time_ms: u64,
}

/// Network counters of the last interface listed in `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSnapshot {
    pub interface: String,
    pub receive_bytes: u64,
    pub transmit_bytes: u64,
    pub receive_errors: u64,
    pub transmit_errors: u64,
    pub receive_dropped: u64,
    pub transmit_dropped: u64,
}

/// One allocator benchmark result as reported over the pipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocatorPolicyMetrics {
    pub policy_name: String,
    pub iterations: i64,
    pub time_taken: f64,
    pub total_allocated: u64,
    pub freed_blocks: i64,
    pub free_blocks: i64,
    pub free_size: u64,
    pub avg_fragmentation: f64,
    pub external_fragmentation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_snapshot_from_kb() {
        let mem = MemorySnapshot::from_kb(16384000, 12000000).unwrap();

        assert_eq!(mem.total_mb, 16000.0);
        assert_eq!(mem.used_mb, (16384000.0 - 12000000.0) / 1024.0);
        assert_eq!(mem.usage_pct, (16384000.0 - 12000000.0) / 16384000.0 * 100.0);
        assert_eq!(mem.fragmentation_pct, 4384000.0 / 16384000.0 * 100.0);
    }

    #[test]
    fn test_memory_snapshot_zero_total() {
        assert!(MemorySnapshot::from_kb(0, 100).is_none());
    }

    #[test]
    fn test_memory_fragmentation_bounds() {
        let all_free = MemorySnapshot::from_kb(1000, 1000).unwrap();
        assert_eq!(all_free.fragmentation_pct, 0.0);
        assert_eq!(all_free.usage_pct, 0.0);

        let all_used = MemorySnapshot::from_kb(1000, 0).unwrap();
        assert_eq!(all_used.fragmentation_pct, 0.0);
        assert_eq!(all_used.usage_pct, 100.0);

        let half = MemorySnapshot::from_kb(1000, 500).unwrap();
        assert_eq!(half.fragmentation_pct, 50.0);
    }
}
