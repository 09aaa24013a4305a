//! Bridge to the external allocator benchmark.
//!
//! The benchmark is launched once per [`AllocationPolicy`] and reports a
//! single whitespace-separated record over a named pipe.

mod bridge;
mod record;

pub use bridge::{BenchmarkBridge, DEFAULT_FIFO_PATH, DEFAULT_TIMEOUT};
pub use record::{AllocationPolicy, RECORD_FIELDS, parse_record};
