//! Latest value of every gauge, shared between the sampling loop and readers.
//!
//! A single mutex guards the snapshot and the gauge pushes that mirror it,
//! so a reader never sees a half-written metric. Values of different metrics
//! may come from different sampling cycles.

pub mod model;
mod registry;

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::benchmark::AllocationPolicy;
use model::{AllocatorPolicyMetrics, DiskSnapshot, MemorySnapshot, NetworkSnapshot};
pub use registry::{GaugeRegistry, POLICY_LABEL, RegistryError};

/// Identifies one slot of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    CpuUsage,
    Memory,
    Disk,
    Network,
    RunningProcesses,
    ContextSwitches,
    Allocator(AllocationPolicy),
}

/// A complete value for one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    CpuUsage(f64),
    Memory(MemorySnapshot),
    Disk(DiskSnapshot),
    Network(NetworkSnapshot),
    RunningProcesses(u64),
    ContextSwitches(u64),
    /// Dispatched by `policy_name`; records for unknown policies are dropped.
    Allocator(AllocatorPolicyMetrics),
}

/// Latest values; `None` until the first successful sample of that metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub cpu_usage_pct: Option<f64>,
    pub memory: Option<MemorySnapshot>,
    pub disk: Option<DiskSnapshot>,
    pub network: Option<NetworkSnapshot>,
    pub running_processes: Option<u64>,
    pub context_switches: Option<u64>,
    pub first_fit: Option<AllocatorPolicyMetrics>,
    pub best_fit: Option<AllocatorPolicyMetrics>,
    pub worst_fit: Option<AllocatorPolicyMetrics>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    fn allocator_slot(&mut self, policy: AllocationPolicy) -> &mut Option<AllocatorPolicyMetrics> {
        match policy {
            AllocationPolicy::FirstFit => &mut self.first_fit,
            AllocationPolicy::BestFit => &mut self.best_fit,
            AllocationPolicy::WorstFit => &mut self.worst_fit,
        }
    }

    pub fn allocator(&self, policy: AllocationPolicy) -> Option<&AllocatorPolicyMetrics> {
        match policy {
            AllocationPolicy::FirstFit => self.first_fit.as_ref(),
            AllocationPolicy::BestFit => self.best_fit.as_ref(),
            AllocationPolicy::WorstFit => self.worst_fit.as_ref(),
        }
    }
}

/// The locked snapshot plus the gauges it feeds.
pub struct MetricsStore {
    inner: Mutex<MetricsSnapshot>,
    gauges: GaugeRegistry,
}

impl MetricsStore {
    pub fn new(gauges: GaugeRegistry) -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
            gauges,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces one slot and its gauges.
    ///
    /// Returns `false` if the value was dropped (allocator record with an
    /// unknown policy name).
    pub fn update(&self, value: MetricValue) -> bool {
        let mut snap = self.lock();
        match value {
            MetricValue::CpuUsage(pct) => {
                self.gauges.set_cpu_usage(pct);
                snap.cpu_usage_pct = Some(pct);
            }
            MetricValue::Memory(mem) => {
                self.gauges.set_memory(&mem);
                snap.memory = Some(mem);
            }
            MetricValue::Disk(disk) => {
                self.gauges.set_disk(&disk);
                snap.disk = Some(disk);
            }
            MetricValue::Network(net) => {
                self.gauges.set_network(&net);
                snap.network = Some(net);
            }
            MetricValue::RunningProcesses(count) => {
                self.gauges.set_running_processes(count);
                snap.running_processes = Some(count);
            }
            MetricValue::ContextSwitches(count) => {
                self.gauges.set_context_switches(count);
                snap.context_switches = Some(count);
            }
            MetricValue::Allocator(m) => {
                let Some(policy) = AllocationPolicy::from_record_name(&m.policy_name) else {
                    debug!(policy = %m.policy_name, "ignoring record for unknown policy");
                    return false;
                };
                self.gauges.set_allocator(policy, &m);
                *snap.allocator_slot(policy) = Some(m);
            }
        }
        snap.updated_at = Some(Utc::now());
        true
    }

    /// Current value of one slot.
    pub fn read(&self, kind: MetricKind) -> Option<MetricValue> {
        let snap = self.lock();
        match kind {
            MetricKind::CpuUsage => snap.cpu_usage_pct.map(MetricValue::CpuUsage),
            MetricKind::Memory => snap.memory.map(MetricValue::Memory),
            MetricKind::Disk => snap.disk.clone().map(MetricValue::Disk),
            MetricKind::Network => snap.network.clone().map(MetricValue::Network),
            MetricKind::RunningProcesses => snap.running_processes.map(MetricValue::RunningProcesses),
            MetricKind::ContextSwitches => snap.context_switches.map(MetricValue::ContextSwitches),
            MetricKind::Allocator(policy) => snap.allocator(policy).cloned().map(MetricValue::Allocator),
        }
    }

    /// Copy of every slot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().clone()
    }

    /// Prometheus text exposition, encoded while holding the store lock.
    pub fn render_text(&self) -> Result<String, RegistryError> {
        let _snap = self.lock();
        self.gauges.render_text()
    }
}
