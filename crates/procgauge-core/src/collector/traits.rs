//! Filesystem access behind a trait so samplers can run against fixtures.

use std::io;
use std::path::Path;

/// Read-only view of the files the samplers consume.
///
/// Every kernel text source is read in full on each call; implementations
/// must not cache contents between calls.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_real_fs_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ctxt 42\n").unwrap();

        let fs = RealFs::new();
        let content = fs.read_to_string(file.path()).unwrap();
        assert_eq!(content, "ctxt 42\n");
    }

    #[test]
    fn test_real_fs_missing_file() {
        let fs = RealFs::new();
        let path = Path::new("/nonexistent/procgauge/12345");
        let err = fs.read_to_string(path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
