//! Fixed-interval sampling loop.
//!
//! The loop owns every sampler (including the CPU baseline) and pushes each
//! successful result into the shared [`MetricsStore`]. A failing metric is
//! logged and keeps its previous value; the other metrics of the cycle are
//! still sampled.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::benchmark::{AllocationPolicy, BenchmarkBridge};
use crate::collector::{
    ContextSwitchSampler, CpuSampler, DiskSampler, FileSystem, MemorySampler, NetworkSampler,
    ProcessSampler, SampleError,
};
use crate::config::{BenchmarkConfig, Config, DEFAULT_SAMPLING_INTERVAL};
use crate::store::{MetricValue, MetricsStore};

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// A metric group that can be enabled in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    NetworkUsage,
    RunningProcesses,
    ContextSwitches,
    /// Runs the allocator benchmark once per policy.
    MemoryPolicies,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown metric name: {0:?}")]
pub struct UnknownMetric(pub String);

impl MetricName {
    pub const ALL: [MetricName; 7] = [
        MetricName::CpuUsage,
        MetricName::MemoryUsage,
        MetricName::DiskUsage,
        MetricName::NetworkUsage,
        MetricName::RunningProcesses,
        MetricName::ContextSwitches,
        MetricName::MemoryPolicies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::CpuUsage => "cpu_usage",
            MetricName::MemoryUsage => "memory_usage",
            MetricName::DiskUsage => "disk_usage",
            MetricName::NetworkUsage => "network_usage",
            MetricName::RunningProcesses => "running_processes",
            MetricName::ContextSwitches => "context_switches",
            MetricName::MemoryPolicies => "memory_policies",
        }
    }
}

impl FromStr for MetricName {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one [`SamplerLoop::run_cycle`].
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Store slots written this cycle.
    pub updated: usize,
    /// Samples that returned an error.
    pub failed: usize,
    pub elapsed: Duration,
}

pub struct SamplerLoop<F: FileSystem + Clone> {
    cpu: CpuSampler<F>,
    memory: MemorySampler<F>,
    disk: DiskSampler<F>,
    network: NetworkSampler<F>,
    processes: ProcessSampler<F>,
    context_switches: ContextSwitchSampler<F>,
    benchmark: BenchmarkBridge,
    store: Arc<MetricsStore>,
    enabled: Vec<MetricName>,
    interval: Duration,
}

impl<F: FileSystem + Clone> SamplerLoop<F> {
    /// Creates a loop with no metrics enabled.
    pub fn new(
        fs: F,
        proc_path: impl AsRef<Path>,
        disk_device: impl Into<String>,
        store: Arc<MetricsStore>,
    ) -> Self {
        let proc_path = proc_path.as_ref();
        let bench = BenchmarkConfig::default();
        Self {
            cpu: CpuSampler::new(fs.clone(), proc_path),
            memory: MemorySampler::new(fs.clone(), proc_path),
            disk: DiskSampler::new(fs.clone(), proc_path, disk_device),
            network: NetworkSampler::new(fs.clone(), proc_path),
            processes: ProcessSampler::new(fs.clone(), proc_path),
            context_switches: ContextSwitchSampler::new(fs, proc_path),
            benchmark: BenchmarkBridge::new(bench.executable, bench.fifo_path),
            store,
            enabled: Vec::new(),
            interval: Duration::from_secs(DEFAULT_SAMPLING_INTERVAL),
        }
    }

    /// Builds a loop from `config`, skipping (and logging) unknown metric names.
    pub fn from_config(fs: F, config: &Config, store: Arc<MetricsStore>) -> Self {
        let mut metrics = Vec::new();
        for name in &config.metrics {
            match name.parse::<MetricName>() {
                Ok(metric) => metrics.push(metric),
                Err(e) => warn!("{}, skipping", e),
            }
        }

        let bridge =
            BenchmarkBridge::new(&config.benchmark.executable, &config.benchmark.fifo_path)
                .with_timeout(config.benchmark.timeout());

        Self::new(fs, &config.proc_path, config.disk_device.clone(), store)
            .with_metrics(metrics)
            .with_interval(config.interval())
            .with_benchmark(bridge)
    }

    /// Sets the enabled metrics. Duplicates are dropped, order is kept.
    pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = MetricName>) -> Self {
        self.enabled.clear();
        for metric in metrics {
            if !self.enabled.contains(&metric) {
                self.enabled.push(metric);
            }
        }
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn with_benchmark(mut self, bridge: BenchmarkBridge) -> Self {
        self.benchmark = bridge;
        self
    }

    /// Lets a cancellation request abort a pending benchmark read.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.benchmark = self.benchmark.with_cancel(cancel);
        self
    }

    pub fn enabled(&self) -> &[MetricName] {
        &self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    /// Samples every enabled metric once, in configuration order.
    pub fn run_cycle(&mut self) -> CycleReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut report = CycleReport {
            started_at,
            updated: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        };

        for i in 0..self.enabled.len() {
            let metric = self.enabled[i];
            let t = Instant::now();
            match metric {
                MetricName::CpuUsage => {
                    let result = self.cpu.sample().map(MetricValue::CpuUsage);
                    self.record(&mut report, metric, result);
                }
                MetricName::MemoryUsage => {
                    let result = self.memory.sample().map(MetricValue::Memory);
                    self.record(&mut report, metric, result);
                }
                MetricName::DiskUsage => {
                    let result = self.disk.sample().map(MetricValue::Disk);
                    self.record(&mut report, metric, result);
                }
                MetricName::NetworkUsage => {
                    let result = self.network.sample().map(MetricValue::Network);
                    self.record(&mut report, metric, result);
                }
                MetricName::RunningProcesses => {
                    let result = self.processes.sample().map(MetricValue::RunningProcesses);
                    self.record(&mut report, metric, result);
                }
                MetricName::ContextSwitches => {
                    let result = self
                        .context_switches
                        .sample()
                        .map(MetricValue::ContextSwitches);
                    self.record(&mut report, metric, result);
                }
                MetricName::MemoryPolicies => self.run_benchmarks(&mut report),
            }
            trace!(metric = %metric, elapsed = ?t.elapsed(), "sampled");
        }

        report.elapsed = start.elapsed();
        debug!(
            "Cycle: {} updated, {} failed in {:?}",
            report.updated, report.failed, report.elapsed
        );
        report
    }

    fn run_benchmarks(&self, report: &mut CycleReport) {
        for policy in AllocationPolicy::ALL {
            let result = self.benchmark.run(policy);
            let cancelled = matches!(result, Err(SampleError::Cancelled));
            self.record(report, MetricName::MemoryPolicies, result.map(MetricValue::Allocator));
            if cancelled {
                break;
            }
        }
    }

    fn record(
        &self,
        report: &mut CycleReport,
        metric: MetricName,
        result: Result<MetricValue, SampleError>,
    ) {
        match result {
            Ok(value) => {
                if self.store.update(value) {
                    report.updated += 1;
                }
            }
            Err(SampleError::InsufficientHistory) => {
                report.failed += 1;
                debug!("{}: waiting for a second sample", metric);
            }
            Err(e) => {
                report.failed += 1;
                warn!("{}: {}", metric, e);
            }
        }
    }

    /// Runs cycles until `cancel` becomes true.
    pub fn run(&mut self, cancel: &AtomicBool) {
        self.run_with(cancel, |_| {});
    }

    /// Like [`SamplerLoop::run`], calling `on_cycle` after every cycle.
    pub fn run_with(&mut self, cancel: &AtomicBool, mut on_cycle: impl FnMut(&CycleReport)) {
        info!(
            "Sampling {} metric(s) every {:?}",
            self.enabled.len(),
            self.interval
        );

        while !cancel.load(Ordering::SeqCst) {
            let report = self.run_cycle();
            on_cycle(&report);

            let mut remaining = self.interval.saturating_sub(report.elapsed);
            while remaining > Duration::ZERO && !cancel.load(Ordering::SeqCst) {
                let sleep_time = remaining.min(SLEEP_SLICE);
                std::thread::sleep(sleep_time);
                remaining = remaining.saturating_sub(sleep_time);
            }
        }

        info!("Sampling loop stopped");
    }
}
