//! Parsers for `/proc` text sources.
//!
//! Pure functions over file contents, so every layout quirk is testable with
//! string fixtures. They return `None` when the expected data is absent; the
//! samplers turn that into the appropriate [`SampleError`](crate::SampleError).

use crate::store::model::{DiskSnapshot, NetworkSnapshot};

/// Aggregate CPU tick counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSample {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuSample {
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    pub fn non_idle(&self) -> u64 {
        self.user + self.nice + self.system + self.irq + self.softirq + self.steal
    }

    pub fn total(&self) -> u64 {
        self.idle_total() + self.non_idle()
    }

    /// Busy percentage over the interval from `prev` to `self`.
    ///
    /// Returns `None` when the total did not advance, or when any aggregate
    /// went backwards (counter reset after reboot or wrap).
    pub fn utilization_since(&self, prev: &CpuSample) -> Option<f64> {
        let total_delta = self.total().checked_sub(prev.total())?;
        let idle_delta = self.idle_total().checked_sub(prev.idle_total())?;
        let busy_delta = total_delta.checked_sub(idle_delta)?;
        if total_delta == 0 {
            return None;
        }
        let pct = busy_delta as f64 / total_delta as f64 * 100.0;
        Some(pct.clamp(0.0, 100.0))
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Per-CPU lines (`cpu0`, `cpu1`, ...) are ignored. All eight counters must
/// be present; `guest`/`guest_nice` are already folded into user/nice by the
/// kernel and are not read.
pub fn parse_cpu_sample(content: &str) -> Option<CpuSample> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|s| s.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    if values.len() < 8 {
        return None;
    }

    Some(CpuSample {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
        steal: values[7],
    })
}

/// Finds the first line whose first token is `label` (with or without a
/// trailing `:`) and parses the token after it.
///
/// Covers `MemTotal:       16384000 kB`, `ctxt 500000` and `procs_running 2`.
pub fn parse_labeled_value(content: &str, label: &str) -> Option<u64> {
    let label = label.trim_end_matches(':');
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let key = parts.next()?;
        if key.trim_end_matches(':') != label {
            return None;
        }
        parts.next()?.parse().ok()
    })
}

/// Locates the first line that contains `token` as a whole word and parses
/// the whitespace tokens at `indices` of that line.
///
/// Returns `None` when no line matches. A missing or non-numeric token at one
/// of the indices gives `None` in that position only.
pub fn parse_positional_values(
    content: &str,
    token: &str,
    indices: &[usize],
) -> Option<Vec<Option<u64>>> {
    let line = find_line_with_token(content, token)?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    Some(
        indices
            .iter()
            .map(|&idx| parts.get(idx).and_then(|s| s.parse().ok()))
            .collect(),
    )
}

fn find_line_with_token<'a>(content: &'a str, token: &str) -> Option<&'a str> {
    content
        .lines()
        .find(|line| line.split_whitespace().any(|t| t == token))
}

// ============ Disk Stats Parser ============

/// 0-based token positions read from a `/proc/diskstats` line.
///
/// This is a fixed, kernel-format-dependent contract; `sample_disk_offsets`
/// in the tests pins it to a synthetic line.
pub const DISK_FIELD_OFFSETS: DiskFieldOffsets = DiskFieldOffsets {
    read_time_ms: 4,
    write_time_ms: 8,
    io_in_progress: 9,
    io_time_ms: 10,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskFieldOffsets {
    pub read_time_ms: usize,
    pub write_time_ms: usize,
    pub io_in_progress: usize,
    pub io_time_ms: usize,
}

impl DiskFieldOffsets {
    /// Token positions in field order, as passed to a positional read.
    pub fn indices(&self) -> [usize; 4] {
        [
            self.read_time_ms,
            self.write_time_ms,
            self.io_in_progress,
            self.io_time_ms,
        ]
    }

    /// Builds the snapshot from values read at [`indices`](Self::indices).
    /// Fields that were missing or unparsable read as 0.
    pub fn snapshot(&self, device: &str, values: &[Option<u64>]) -> DiskSnapshot {
        let get_val = |idx: usize| values.get(idx).copied().flatten().unwrap_or(0);
        DiskSnapshot {
            device: device.to_string(),
            read_time_ms: get_val(0),
            write_time_ms: get_val(1),
            io_in_progress: get_val(2),
            io_time_ms: get_val(3),
        }
    }
}

// ============ Network Device Stats Parser ============

/// Parses `/proc/net/dev` keeping only the last interface line.
///
/// The first two lines are headers and are skipped unconditionally. Every
/// later `name: counters` line overwrites the previous result, so with
/// `lo` followed by `eth0` the `eth0` counters are returned.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev_last(content: &str) -> Option<NetworkSnapshot> {
    let mut last = None;

    for line in content.lines().skip(2) {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = counters.split_whitespace().collect();
        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        last = Some(NetworkSnapshot {
            interface: name.trim().to_string(),
            receive_bytes: get_val(0),
            receive_errors: get_val(2),
            receive_dropped: get_val(3),
            transmit_bytes: get_val(8),
            transmit_errors: get_val(10),
            transmit_dropped: get_val(11),
        });
    }

    last
}
