//! Labeled and positional field reads from kernel text sources.
//!
//! Each call reads the whole file through the [`FileSystem`] and scans it
//! once; nothing is cached between calls.

use std::path::Path;

use crate::collector::SampleError;
use crate::collector::procfs::parser::{parse_labeled_value, parse_positional_values};
use crate::collector::traits::FileSystem;

/// Reads a kernel text source in full.
pub fn read_source<F: FileSystem>(fs: &F, path: &Path) -> Result<String, SampleError> {
    fs.read_to_string(path)
        .map_err(|e| SampleError::source_unavailable(path, e))
}

/// Reads the value following `label` on the first line that starts with it.
pub fn read_labeled<F: FileSystem>(fs: &F, path: &Path, label: &str) -> Result<u64, SampleError> {
    let content = read_source(fs, path)?;
    parse_labeled_value(&content, label).ok_or_else(|| SampleError::field_not_found(path, label))
}

/// Reads the tokens at `indices` of the first line containing `token` as a
/// word, in one scan of the source.
///
/// Fails with `FieldNotFound` when no line carries `token`. A missing or
/// non-numeric token at one of the indices is `None` in the result.
pub fn read_positional<F: FileSystem>(
    fs: &F,
    path: &Path,
    token: &str,
    indices: &[usize],
) -> Result<Vec<Option<u64>>, SampleError> {
    let content = read_source(fs, path)?;
    parse_positional_values(&content, token, indices)
        .ok_or_else(|| SampleError::field_not_found(path, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_read_labeled() {
        let fs = MockFs::typical_system();
        let ctxt = read_labeled(&fs, Path::new("/proc/stat"), "ctxt").unwrap();
        assert_eq!(ctxt, 500000);
    }

    #[test]
    fn test_read_labeled_missing_source() {
        let fs = MockFs::new();
        let err = read_labeled(&fs, Path::new("/proc/stat"), "ctxt").unwrap_err();
        assert!(matches!(err, SampleError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_read_labeled_missing_field() {
        let fs = MockFs::new();
        fs.add_file("/proc/stat", "cpu  1 2 3 4 5 6 7 8\n");
        let err = read_labeled(&fs, Path::new("/proc/stat"), "ctxt").unwrap_err();
        match err {
            SampleError::FieldNotFound { field, path } => {
                assert_eq!(field, "ctxt");
                assert_eq!(path, Path::new("/proc/stat"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_positional() {
        let fs = MockFs::typical_system();
        let path = Path::new("/proc/diskstats");
        assert_eq!(
            read_positional(&fs, path, "nvme0n1", &[11, 40]).unwrap(),
            vec![Some(5), None]
        );
        match read_positional(&fs, path, "sdz", &[4]) {
            Err(SampleError::FieldNotFound { field, .. }) => assert_eq!(field, "sdz"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
