//! Host metrics samplers for Linux.
//!
//! Everything here reads kernel text interfaces under `/proc` through the
//! [`FileSystem`] trait, so the same code runs against the real filesystem
//! and against [`MockFs`] fixtures in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Samplers                             │
//! │  ┌────────────────┐  ┌──────────────────────────────────┐    │
//! │  │  CpuSampler    │  │  MemorySampler  DiskSampler      │    │
//! │  │  (prev sample) │  │  NetworkSampler ProcessSampler   │    │
//! │  └───────┬────────┘  │  ContextSwitchSampler            │    │
//! │          │           └────────────────┬─────────────────┘    │
//! │          └────────────────┬───────────┘                      │
//! │                    ┌──────▼──────┐                           │
//! │                    │   parser    │ (pure, &str → struct)     │
//! │                    └──────┬──────┘                           │
//! │                    ┌──────▼──────┐                           │
//! │                    │  FileSystem │ (trait)                   │
//! │                    └──────┬──────┘                           │
//! └───────────────────────────┼──────────────────────────────────┘
//!                  ┌──────────┴──────────┐
//!           ┌──────▼──────┐       ┌──────▼──────┐
//!           │   RealFs    │       │   MockFs    │
//!           └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use procgauge_core::collector::{CpuSampler, MemorySampler, MockFs, SampleError};
//!
//! let fs = MockFs::typical_system();
//! let memory = MemorySampler::new(fs.clone(), "/proc").sample().unwrap();
//! assert!(memory.usage_pct > 0.0);
//!
//! let mut cpu = CpuSampler::new(fs, "/proc");
//! assert!(matches!(cpu.sample(), Err(SampleError::InsufficientHistory)));
//! ```

mod error;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use error::SampleError;
pub use mock::MockFs;
pub use procfs::{
    ContextSwitchSampler, CpuSampler, DiskSampler, MemorySampler, NetworkSampler, ProcessSampler,
};
pub use traits::{FileSystem, RealFs};
