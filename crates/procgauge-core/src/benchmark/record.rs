//! Allocation policies and the one-line result record the benchmark writes.

use std::fmt;
use std::str::FromStr;

use crate::collector::SampleError;
use crate::store::model::AllocatorPolicyMetrics;

/// Number of whitespace-separated fields in a result record.
pub const RECORD_FIELDS: usize = 9;

/// Allocation policy exercised by the external benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationPolicy {
    FirstFit,
    BestFit,
    WorstFit,
}

impl AllocationPolicy {
    pub const ALL: [AllocationPolicy; 3] = [
        AllocationPolicy::FirstFit,
        AllocationPolicy::BestFit,
        AllocationPolicy::WorstFit,
    ];

    /// Command-line selector passed to the benchmark executable.
    pub fn arg(self) -> &'static str {
        match self {
            AllocationPolicy::FirstFit => "FIRST",
            AllocationPolicy::BestFit => "BEST",
            AllocationPolicy::WorstFit => "WORST",
        }
    }

    /// Policy name as it appears in the first field of a result record.
    pub fn record_name(self) -> &'static str {
        match self {
            AllocationPolicy::FirstFit => "First_Fit",
            AllocationPolicy::BestFit => "Best_Fit",
            AllocationPolicy::WorstFit => "Worst_Fit",
        }
    }

    /// Value of the `policy` label on the allocator gauges.
    pub fn label(self) -> &'static str {
        match self {
            AllocationPolicy::FirstFit => "first_fit",
            AllocationPolicy::BestFit => "best_fit",
            AllocationPolicy::WorstFit => "worst_fit",
        }
    }

    /// Maps a record's policy name back to a policy; unknown names give `None`.
    pub fn from_record_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.record_name() == name)
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_name())
    }
}

fn field<T: FromStr>(fields: &[&str], idx: usize, name: &str) -> Result<T, SampleError> {
    fields[idx]
        .parse()
        .map_err(|_| SampleError::MalformedRecord(format!("invalid {name}: {:?}", fields[idx])))
}

/// Parses one benchmark record:
///
/// `<policy> <iterations> <time_taken> <total_allocated> <freed_blocks> <free_blocks> <free_size> <avg_fragmentation> <external_fragmentation>`
pub fn parse_record(payload: &str) -> Result<AllocatorPolicyMetrics, SampleError> {
    let fields: Vec<&str> = payload.split_whitespace().collect();
    if fields.len() != RECORD_FIELDS {
        return Err(SampleError::MalformedRecord(format!(
            "expected {RECORD_FIELDS} fields, got {}",
            fields.len()
        )));
    }

    Ok(AllocatorPolicyMetrics {
        policy_name: fields[0].to_string(),
        iterations: field(&fields, 1, "iterations")?,
        time_taken: field(&fields, 2, "time_taken")?,
        total_allocated: field(&fields, 3, "total_allocated")?,
        freed_blocks: field(&fields, 4, "freed_blocks")?,
        free_blocks: field(&fields, 5, "free_blocks")?,
        free_size: field(&fields, 6, "free_size")?,
        avg_fragmentation: field(&fields, 7, "avg_fragmentation")?,
        external_fragmentation: field(&fields, 8, "external_fragmentation")?,
    })
}
