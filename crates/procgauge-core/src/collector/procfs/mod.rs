//! Readers for the Linux `/proc` text sources.
//!
//! `parser` holds the pure text parsing, `reader` the single-field reads,
//! and `system` the samplers built on both.

pub mod parser;
pub mod reader;
pub mod system;

pub use parser::{CpuSample, DISK_FIELD_OFFSETS};
pub use system::{
    ContextSwitchSampler, CpuSampler, DEFAULT_DISK_DEVICE, DiskSampler, MemorySampler,
    NetworkSampler, ProcessSampler,
};
