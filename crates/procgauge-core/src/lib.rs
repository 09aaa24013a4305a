//! procgauge-core: sampling-and-snapshot engine for the procgauge agent.
//!
//! Provides:
//! - `collector`: `/proc` readers and samplers (CPU, memory, disk, network, processes)
//! - `benchmark`: bridge to the external allocator benchmark over a named pipe
//! - `store`: gauge registry and the locked snapshot of latest values
//! - `sampler`: the fixed-interval sampling loop
//! - `config`: JSON configuration (interval, enabled metrics, paths)

pub mod benchmark;
pub mod collector;
pub mod config;
pub mod sampler;
pub mod store;

pub use collector::SampleError;
pub use config::{Config, ConfigError};
pub use sampler::{CycleReport, MetricName, SamplerLoop};
pub use store::{GaugeRegistry, MetricsStore};
