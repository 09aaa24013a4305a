//! Prometheus gauges for every sampled metric.
//!
//! The registry is an ordinary value built once at startup and handed to the
//! [`MetricsStore`](super::MetricsStore); nothing here is global.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::benchmark::AllocationPolicy;
use crate::store::model::{AllocatorPolicyMetrics, DiskSnapshot, MemorySnapshot, NetworkSnapshot};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("metrics registry: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Label distinguishing the allocator benchmark gauges.
pub const POLICY_LABEL: &str = "policy";

/// Named gauges registered in a private [`prometheus::Registry`].
pub struct GaugeRegistry {
    registry: Registry,

    cpu_usage: Gauge,

    memory_usage: Gauge,
    total_memory: Gauge,
    used_memory: Gauge,
    available_memory: Gauge,
    memory_fragmentation: Gauge,

    disk_read_time: Gauge,
    disk_write_time: Gauge,
    disk_io_in_progress: Gauge,
    disk_io_time: Gauge,

    net_received_bytes: Gauge,
    net_transmitted_bytes: Gauge,
    net_received_errors: Gauge,
    net_transmitted_errors: Gauge,
    net_received_dropped: Gauge,
    net_transmitted_dropped: Gauge,

    running_processes: Gauge,
    context_switches: Gauge,

    alloc_iterations: GaugeVec,
    alloc_time_taken: GaugeVec,
    alloc_total_allocated: GaugeVec,
    alloc_freed_blocks: GaugeVec,
    alloc_free_blocks: GaugeVec,
    alloc_free_size: GaugeVec,
    alloc_avg_fragmentation: GaugeVec,
    alloc_external_fragmentation: GaugeVec,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, RegistryError> {
    let g = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn policy_gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec, RegistryError> {
    let g = GaugeVec::new(Opts::new(name, help), &[POLICY_LABEL])?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

impl GaugeRegistry {
    /// Creates and registers all gauges, initialised to zero.
    ///
    /// Failure here means the process cannot expose anything and is fatal to
    /// the caller.
    pub fn new() -> Result<Self, RegistryError> {
        let r = Registry::new();
        Ok(Self {
            cpu_usage: gauge(&r, "cpu_usage_percentage", "CPU utilisation in percent")?,

            memory_usage: gauge(&r, "memory_usage_percentage", "Memory in use in percent")?,
            total_memory: gauge(&r, "total_memory_mb", "Total memory in MB")?,
            used_memory: gauge(&r, "used_memory_mb", "Used memory in MB")?,
            available_memory: gauge(&r, "available_memory_mb", "Available memory in MB")?,
            memory_fragmentation: gauge(
                &r,
                "memory_fragmentation",
                "Estimated memory fragmentation in percent",
            )?,

            disk_read_time: gauge(&r, "disk_read_time_ms", "Disk read time in ms")?,
            disk_write_time: gauge(&r, "disk_write_time_ms", "Disk write time in ms")?,
            disk_io_in_progress: gauge(&r, "disk_io_in_progress", "Disk I/Os in progress")?,
            disk_io_time: gauge(&r, "disk_io_time_ms", "Time spent doing disk I/O in ms")?,

            net_received_bytes: gauge(&r, "network_received_bytes", "Bytes received")?,
            net_transmitted_bytes: gauge(&r, "network_transmitted_bytes", "Bytes transmitted")?,
            net_received_errors: gauge(&r, "network_received_errors", "Receive errors")?,
            net_transmitted_errors: gauge(&r, "network_transmitted_errors", "Transmit errors")?,
            net_received_dropped: gauge(&r, "network_received_dropped", "Received packets dropped")?,
            net_transmitted_dropped: gauge(
                &r,
                "network_transmitted_dropped",
                "Transmitted packets dropped",
            )?,

            running_processes: gauge(&r, "running_processes", "Processes in runnable state")?,
            context_switches: gauge(&r, "context_switches", "Context switches since boot")?,

            alloc_iterations: policy_gauge(&r, "allocator_iterations", "Benchmark iterations")?,
            alloc_time_taken: policy_gauge(
                &r,
                "allocator_time_taken_seconds",
                "Benchmark run time",
            )?,
            alloc_total_allocated: policy_gauge(
                &r,
                "allocator_total_allocated_bytes",
                "Bytes allocated during the benchmark",
            )?,
            alloc_freed_blocks: policy_gauge(&r, "allocator_freed_blocks", "Blocks freed")?,
            alloc_free_blocks: policy_gauge(&r, "allocator_free_blocks", "Free blocks left")?,
            alloc_free_size: policy_gauge(&r, "allocator_free_size_bytes", "Free bytes left")?,
            alloc_avg_fragmentation: policy_gauge(
                &r,
                "allocator_avg_fragmentation",
                "Average fragmentation",
            )?,
            alloc_external_fragmentation: policy_gauge(
                &r,
                "allocator_external_fragmentation",
                "External fragmentation",
            )?,

            registry: r,
        })
    }

    pub fn set_cpu_usage(&self, pct: f64) {
        self.cpu_usage.set(pct);
    }

    pub fn set_memory(&self, mem: &MemorySnapshot) {
        self.memory_usage.set(mem.usage_pct);
        self.total_memory.set(mem.total_mb);
        self.used_memory.set(mem.used_mb);
        self.available_memory.set(mem.available_mb);
        self.memory_fragmentation.set(mem.fragmentation_pct);
    }

    pub fn set_disk(&self, disk: &DiskSnapshot) {
        self.disk_read_time.set(disk.read_time_ms as f64);
        self.disk_write_time.set(disk.write_time_ms as f64);
        self.disk_io_in_progress.set(disk.io_in_progress as f64);
        self.disk_io_time.set(disk.io_time_ms as f64);
    }

    pub fn set_network(&self, net: &NetworkSnapshot) {
        self.net_received_bytes.set(net.receive_bytes as f64);
        self.net_transmitted_bytes.set(net.transmit_bytes as f64);
        self.net_received_errors.set(net.receive_errors as f64);
        self.net_transmitted_errors.set(net.transmit_errors as f64);
        self.net_received_dropped.set(net.receive_dropped as f64);
        self.net_transmitted_dropped.set(net.transmit_dropped as f64);
    }

    pub fn set_running_processes(&self, count: u64) {
        self.running_processes.set(count as f64);
    }

    pub fn set_context_switches(&self, count: u64) {
        self.context_switches.set(count as f64);
    }

    pub fn set_allocator(&self, policy: AllocationPolicy, m: &AllocatorPolicyMetrics) {
        let labels = [policy.label()];
        self.alloc_iterations
            .with_label_values(&labels)
            .set(m.iterations as f64);
        self.alloc_time_taken
            .with_label_values(&labels)
            .set(m.time_taken);
        self.alloc_total_allocated
            .with_label_values(&labels)
            .set(m.total_allocated as f64);
        self.alloc_freed_blocks
            .with_label_values(&labels)
            .set(m.freed_blocks as f64);
        self.alloc_free_blocks
            .with_label_values(&labels)
            .set(m.free_blocks as f64);
        self.alloc_free_size
            .with_label_values(&labels)
            .set(m.free_size as f64);
        self.alloc_avg_fragmentation
            .with_label_values(&labels)
            .set(m.avg_fragmentation);
        self.alloc_external_fragmentation
            .with_label_values(&labels)
            .set(m.external_fragmentation);
    }

    /// Encodes all gauges in the Prometheus text exposition format.
    pub fn render_text(&self) -> Result<String, RegistryError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
