//! Pre-built mock filesystem scenarios for testing.

use super::filesystem::MockFs;

const TYPICAL_MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
";

const TYPICAL_DISKSTATS: &str = "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
";

const TYPICAL_NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
";

/// Number of per-CPU lines in the mock `/proc/stat`.
const TYPICAL_CPUS: u64 = 4;

impl MockFs {
    /// A quiet four-CPU host with one disk and two interfaces.
    pub fn typical_system() -> Self {
        let fs = Self::new();
        fs.add_file("/proc/meminfo", TYPICAL_MEMINFO);
        fs.set_cpu_counters([10000, 500, 3000, 80000, 1000, 200, 100, 0]);
        fs.add_file("/proc/diskstats", TYPICAL_DISKSTATS);
        fs.add_file("/proc/net/dev", TYPICAL_NET_DEV);
        fs
    }

    /// Same host with almost no available memory.
    pub fn memory_pressure() -> Self {
        let fs = Self::typical_system();
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:          256000 kB
MemAvailable:     409600 kB
SwapTotal:       4096000 kB
SwapFree:        1024000 kB
",
        );
        fs
    }

    /// Rewrites `/proc/stat` with the given aggregate CPU counters
    /// (user, nice, system, idle, iowait, irq, softirq, steal).
    pub fn set_cpu_counters(&self, ticks: [u64; 8]) {
        self.set_stat(ticks, 500000, 2);
    }

    /// Rewrites `/proc/stat` with CPU counters, context switches and runnable count.
    ///
    /// The aggregate `cpu` line carries `ticks` as given; they are split over
    /// four per-CPU lines, with any remainder on `cpu0`.
    pub fn set_stat(&self, ticks: [u64; 8], ctxt: u64, procs_running: u64) {
        let [user, nice, system, idle, iowait, irq, softirq, steal] = ticks;
        let mut per_cpu = String::new();
        for cpu in 0..TYPICAL_CPUS {
            let share = |t: u64| {
                let rest = if cpu == 0 { t % TYPICAL_CPUS } else { 0 };
                t / TYPICAL_CPUS + rest
            };
            let fields: Vec<String> = ticks.iter().map(|&t| share(t).to_string()).collect();
            per_cpu.push_str(&format!("cpu{cpu} {} 0 0\n", fields.join(" ")));
        }
        self.add_file(
            "/proc/stat",
            format!(
                "cpu  {user} {nice} {system} {idle} {iowait} {irq} {softirq} {steal} 0 0\n\
                 {per_cpu}\
                 intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000\n\
                 ctxt {ctxt}\n\
                 btime 1700000000\n\
                 processes 10000\n\
                 procs_running {procs_running}\n\
                 procs_blocked 0\n"
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::procfs::parser::parse_cpu_sample;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_typical_stat_has_four_cpus() {
        let fs = MockFs::typical_system();
        let stat = fs.read_to_string(Path::new("/proc/stat")).unwrap();

        let per_cpu: Vec<&str> = stat
            .lines()
            .filter(|l| l.starts_with("cpu") && !l.starts_with("cpu "))
            .collect();
        assert_eq!(per_cpu.len() as u64, TYPICAL_CPUS);
        assert!(per_cpu[3].starts_with("cpu3 2500 125 750 20000 250 50 25 0"));

        // The aggregate line still comes first and is what gets parsed.
        assert!(stat.starts_with("cpu  10000 "));
        assert_eq!(parse_cpu_sample(&stat).unwrap().user, 10000);
    }

    #[test]
    fn test_per_cpu_remainder_goes_to_cpu0() {
        let fs = MockFs::new();
        fs.set_cpu_counters([10003, 1, 0, 0, 0, 0, 0, 0]);
        let stat = fs.read_to_string(Path::new("/proc/stat")).unwrap();
        assert!(stat.contains("cpu0 2503 1 0 0 0 0 0 0 0 0\n"));
        assert!(stat.contains("cpu1 2500 0 0 0 0 0 0 0 0 0\n"));
    }
}
