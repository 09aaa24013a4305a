//! Runs the allocator benchmark and collects its result from a named pipe.
//!
//! One invocation per policy: spawn the executable with the policy selector,
//! read the FIFO to end-of-stream, parse a single record. The read is bounded
//! by a timeout and a cancellation flag; the child is killed and reaped on
//! every exit path.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use tracing::{debug, warn};

use crate::benchmark::record::{AllocationPolicy, parse_record};
use crate::collector::SampleError;
use crate::store::model::AllocatorPolicyMetrics;

/// FIFO the benchmark writes its result to.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/my_fifo";

/// Upper bound on waiting for a result.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Unblock attempts before a stuck pipe reader is abandoned.
const RELEASE_ATTEMPTS: usize = 20;

/// Handle for invoking the external allocator benchmark.
///
/// Invocations share one FIFO and must not overlap; the sampling loop calls
/// [`BenchmarkBridge::run`] serially.
#[derive(Debug, Clone)]
pub struct BenchmarkBridge {
    executable: PathBuf,
    fifo_path: PathBuf,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
}

impl BenchmarkBridge {
    pub fn new(executable: impl Into<PathBuf>, fifo_path: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            fifo_path: fifo_path.into(),
            timeout: DEFAULT_TIMEOUT,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Aborts a pending read as soon as `cancel` becomes true.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the benchmark for one policy and returns its parsed record.
    pub fn run(&self, policy: AllocationPolicy) -> Result<AllocatorPolicyMetrics, SampleError> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(SampleError::Cancelled);
        }
        self.ensure_fifo()?;

        // The reader is started first so the child's open() of the write end
        // finds a reader.
        let (tx, rx) = mpsc::channel();
        let fifo = self.fifo_path.clone();
        thread::Builder::new()
            .name("benchmark-pipe".to_string())
            .spawn(move || {
                let _ = tx.send(read_fifo(&fifo));
            })
            .map_err(|e| self.pipe_unavailable(format!("reader thread: {e}")))?;

        let mut child = match Command::new(&self.executable)
            .arg(policy.arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                self.release_reader(&rx);
                return Err(SampleError::ProcessSpawnFailed {
                    executable: self.executable.clone(),
                    source,
                });
            }
        };
        debug!(policy = %policy, pid = child.id(), "benchmark started");

        let outcome = self.wait_for_payload(&rx, &mut child);
        if outcome.is_err() {
            let _ = child.kill();
            self.release_reader(&rx);
        }
        reap(child);

        let payload = outcome?;
        parse_record(&payload)
    }

    fn wait_for_payload(
        &self,
        rx: &Receiver<Result<String, SampleError>>,
        child: &mut Child,
    ) -> Result<String, SampleError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.pipe_unavailable("reader thread exited"));
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if self.cancel.load(Ordering::SeqCst) {
                return Err(SampleError::Cancelled);
            }
            if remaining.is_zero() {
                return Err(SampleError::Timeout(self.timeout));
            }

            // A child that exits without ever opening the pipe would leave the
            // reader blocked in open(); close the loop so it sees EOF.
            if matches!(child.try_wait(), Ok(Some(_))) {
                self.unblock_reader();
            }
        }
    }

    fn ensure_fifo(&self) -> Result<(), SampleError> {
        match std::fs::symlink_metadata(&self.fifo_path) {
            Ok(meta) if meta.file_type().is_fifo() => Ok(()),
            Ok(_) => Err(self.pipe_unavailable("exists and is not a FIFO")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                nix::unistd::mkfifo(&self.fifo_path, Mode::S_IRUSR | Mode::S_IWUSR)
                    .map_err(|e| self.pipe_unavailable(format!("mkfifo: {e}")))?;
                debug!(path = %self.fifo_path.display(), "created fifo");
                Ok(())
            }
            Err(e) => Err(self.pipe_unavailable(e.to_string())),
        }
    }

    /// Unblocks the reader thread and waits for it to finish, so no stale
    /// reader stays attached to the FIFO for the next invocation.
    fn release_reader(&self, rx: &Receiver<Result<String, SampleError>>) {
        for _ in 0..RELEASE_ATTEMPTS {
            self.unblock_reader();
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(_) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        warn!(path = %self.fifo_path.display(), "benchmark pipe reader did not exit");
    }

    /// Opens and closes the write end so a reader blocked in open() or read()
    /// returns. Non-blocking: fails harmlessly when there is no reader.
    fn unblock_reader(&self) {
        let _ = OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(&self.fifo_path);
    }

    fn pipe_unavailable(&self, reason: impl Into<String>) -> SampleError {
        SampleError::PipeUnavailable {
            path: self.fifo_path.clone(),
            reason: reason.into(),
        }
    }
}

fn read_fifo(path: &Path) -> Result<String, SampleError> {
    let unavailable = |e: std::io::Error| SampleError::PipeUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut file = File::open(path).map_err(unavailable)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(unavailable)?;
    String::from_utf8(buf).map_err(|e| SampleError::MalformedRecord(e.to_string()))
}

/// Collects the child's exit status, handing a still-running child to a
/// background thread instead of blocking the sampling loop.
fn reap(mut child: Child) {
    match child.try_wait() {
        Ok(Some(status)) => debug!(%status, "benchmark exited"),
        Ok(None) => {
            let spawned = thread::Builder::new()
                .name("benchmark-reaper".to_string())
                .spawn(move || {
                    let _ = child.wait();
                });
            if let Err(e) = spawned {
                warn!("cannot reap benchmark process: {}", e);
            }
        }
        Err(e) => warn!("cannot reap benchmark process: {}", e),
    }
}
