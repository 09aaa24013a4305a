//! Runs the benchmark bridge against small shell scripts standing in for the
//! allocator benchmark.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use procgauge_core::benchmark::{AllocationPolicy, BenchmarkBridge};
use procgauge_core::collector::MockFs;
use procgauge_core::store::{MetricKind, MetricValue};
use procgauge_core::{GaugeRegistry, MetricName, MetricsStore, SampleError, SamplerLoop};
use tempfile::TempDir;

// Writing a script while another test thread forks can leave the script
// busy (ETXTBSY) at exec time, so these tests run one at a time.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

struct Bench {
    dir: TempDir,
}

impl Bench {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn fifo(&self) -> PathBuf {
        self.dir.path().join("bench.fifo")
    }

    fn script(&self, body: &str) -> PathBuf {
        let path = self.dir.path().join("bench.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A benchmark that reports a fixed record for whichever policy it is given.
    fn reporting_script(&self) -> PathBuf {
        let body = format!(
            r#"case "$1" in
  FIRST) name=First_Fit; n=10 ;;
  BEST) name=Best_Fit; n=20 ;;
  WORST) name=Worst_Fit; n=30 ;;
  *) exit 2 ;;
esac
printf '%s %s 0.5 1024 2 3 512 1.5 2.5\n' "$name" "$n" > "{}""#,
            self.fifo().display()
        );
        self.script(&body)
    }

    fn bridge(&self, executable: &Path) -> BenchmarkBridge {
        BenchmarkBridge::new(executable, self.fifo()).with_timeout(Duration::from_secs(5))
    }
}

#[test]
fn reports_one_record_per_policy() {
    let _guard = serial();
    let bench = Bench::new();
    let bridge = bench.bridge(&bench.reporting_script());

    for (policy, iterations) in [
        (AllocationPolicy::FirstFit, 10),
        (AllocationPolicy::BestFit, 20),
        (AllocationPolicy::WorstFit, 30),
    ] {
        let m = bridge.run(policy).unwrap();
        assert_eq!(m.policy_name, policy.record_name());
        assert_eq!(m.iterations, iterations);
        assert_eq!(m.total_allocated, 1024);
        assert_eq!(m.external_fragmentation, 2.5);
    }
}

#[test]
fn creates_fifo_when_missing() {
    let _guard = serial();
    let bench = Bench::new();
    assert!(!bench.fifo().exists());

    let bridge = bench.bridge(&bench.reporting_script());
    bridge.run(AllocationPolicy::FirstFit).unwrap();

    use std::os::unix::fs::FileTypeExt;
    let meta = fs::symlink_metadata(bench.fifo()).unwrap();
    assert!(meta.file_type().is_fifo());
    assert_eq!(meta.permissions().mode() & 0o777, 0o600);
}

#[test]
fn missing_executable_fails_to_spawn() {
    let _guard = serial();
    let bench = Bench::new();
    let bridge = bench.bridge(&bench.dir.path().join("no-such-benchmark"));

    assert!(matches!(
        bridge.run(AllocationPolicy::BestFit),
        Err(SampleError::ProcessSpawnFailed { .. })
    ));

    // A failed run must not leave a reader behind that steals the next result.
    let bridge = bench.bridge(&bench.reporting_script());
    let m = bridge.run(AllocationPolicy::BestFit).unwrap();
    assert_eq!(m.policy_name, "Best_Fit");
}

#[test]
fn silent_benchmark_times_out() {
    let _guard = serial();
    let bench = Bench::new();
    let bridge = BenchmarkBridge::new(bench.script("exec sleep 10"), bench.fifo())
        .with_timeout(Duration::from_millis(500));

    let start = Instant::now();
    let err = bridge.run(AllocationPolicy::FirstFit).unwrap_err();
    assert!(matches!(err, SampleError::Timeout(_)), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(5));

    // The abandoned read must not consume the next benchmark's record.
    let bridge = bench.bridge(&bench.reporting_script());
    let m = bridge.run(AllocationPolicy::WorstFit).unwrap();
    assert_eq!(m.policy_name, "Worst_Fit");
    assert_eq!(m.iterations, 30);
}

#[test]
fn exit_without_writing_is_malformed() {
    let _guard = serial();
    let bench = Bench::new();
    let bridge = bench.bridge(&bench.script("exit 0"));

    assert!(matches!(
        bridge.run(AllocationPolicy::WorstFit),
        Err(SampleError::MalformedRecord(_))
    ));
}

#[test]
fn garbage_record_is_malformed() {
    let _guard = serial();
    let bench = Bench::new();
    let body = format!("echo 'First_Fit not numbers' > \"{}\"", bench.fifo().display());
    let bridge = bench.bridge(&bench.script(&body));

    assert!(matches!(
        bridge.run(AllocationPolicy::FirstFit),
        Err(SampleError::MalformedRecord(_))
    ));
}

#[test]
fn non_utf8_record_is_malformed() {
    let _guard = serial();
    let bench = Bench::new();
    let body = format!(
        "printf 'First_Fit \\377 0.5 1024 2 3 512 1.5 2.5' > \"{}\"",
        bench.fifo().display()
    );
    let bridge = bench.bridge(&bench.script(&body));

    let err = bridge.run(AllocationPolicy::FirstFit).unwrap_err();
    assert!(matches!(err, SampleError::MalformedRecord(_)), "got {err:?}");
}

#[test]
fn regular_file_at_fifo_path_is_rejected() {
    let _guard = serial();
    let bench = Bench::new();
    fs::write(bench.fifo(), "not a pipe").unwrap();
    let bridge = bench.bridge(&bench.reporting_script());

    assert!(matches!(
        bridge.run(AllocationPolicy::FirstFit),
        Err(SampleError::PipeUnavailable { .. })
    ));
}

#[test]
fn cancellation_aborts_pending_read() {
    let _guard = serial();
    let bench = Bench::new();
    let cancel = Arc::new(AtomicBool::new(false));
    let bridge = bench
        .bridge(&bench.script("exec sleep 10"))
        .with_cancel(cancel.clone());

    let flag = cancel.clone();
    let setter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        flag.store(true, Ordering::SeqCst);
    });

    let start = Instant::now();
    let err = bridge.run(AllocationPolicy::FirstFit).unwrap_err();
    setter.join().unwrap();
    assert!(matches!(err, SampleError::Cancelled), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(5));

    // Already cancelled: nothing is spawned.
    assert!(matches!(
        bridge.run(AllocationPolicy::BestFit),
        Err(SampleError::Cancelled)
    ));

    // A fresh bridge on the same pipe still gets its own record.
    let bridge = bench.bridge(&bench.reporting_script());
    let m = bridge.run(AllocationPolicy::BestFit).unwrap();
    assert_eq!(m.policy_name, "Best_Fit");
    assert_eq!(m.iterations, 20);
}

#[test]
fn sampling_cycle_fills_allocator_gauges() {
    let _guard = serial();
    let bench = Bench::new();
    let store = Arc::new(MetricsStore::new(GaugeRegistry::new().unwrap()));
    let mut sampler = SamplerLoop::new(MockFs::typical_system(), "/proc", "sda", store.clone())
        .with_metrics([MetricName::MemoryPolicies])
        .with_benchmark(bench.bridge(&bench.reporting_script()));

    let report = sampler.run_cycle();
    assert_eq!(report.updated, 3);
    assert_eq!(report.failed, 0);

    match store.read(MetricKind::Allocator(AllocationPolicy::WorstFit)) {
        Some(MetricValue::Allocator(m)) => assert_eq!(m.iterations, 30),
        other => panic!("unexpected allocator slot: {other:?}"),
    }

    let text = store.render_text().unwrap();
    assert!(text.contains("allocator_iterations{policy=\"first_fit\"} 10"));
    assert!(text.contains("allocator_iterations{policy=\"best_fit\"} 20"));
    assert!(text.contains("allocator_iterations{policy=\"worst_fit\"} 30"));
}
