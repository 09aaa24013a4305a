//! procgauged - host and allocator metrics agent.
//!
//! Samples /proc (and optionally the allocator benchmark) on a fixed interval
//! and keeps the latest value of every gauge in memory. With `--textfile` the
//! Prometheus text exposition is written to a file after each cycle.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use procgauge_core::collector::RealFs;
use procgauge_core::{Config, GaugeRegistry, MetricsStore, SamplerLoop};

/// Host and allocator metrics agent.
#[derive(Parser, Debug)]
#[command(name = "procgauged", about = "Host and allocator metrics agent", version)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Sampling interval in seconds (overrides the config file).
    #[arg(short, long)]
    interval: Option<u64>,

    /// Path to /proc filesystem (overrides the config file).
    #[arg(long)]
    proc_path: Option<PathBuf>,

    /// Write the Prometheus text exposition to this file after every cycle.
    #[arg(long, value_name = "PATH")]
    textfile: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Loads the config file and applies command-line overrides.
    fn resolve_config(&self) -> Config {
        let mut config = Config::load_or_default(&self.config);
        if let Some(interval) = self.interval {
            config.sampling_interval = interval.max(1);
        }
        if let Some(ref proc_path) = self.proc_path {
            config.proc_path = proc_path.clone();
        }
        config
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["procgauged", "procgauge_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Replaces `path` with `contents` via a sibling temp file, so scrapers
/// never read a partial exposition.
fn write_textfile(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("procgauged {} starting", env!("CARGO_PKG_VERSION"));

    let config = args.resolve_config();
    info!(
        "Config: interval={}s, proc={}, disk={}, metrics=[{}]",
        config.sampling_interval,
        config.proc_path.display(),
        config.disk_device,
        config.metrics.join(", ")
    );

    let gauges = match GaugeRegistry::new() {
        Ok(gauges) => gauges,
        Err(e) => {
            error!("Failed to register gauges: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = Arc::new(MetricsStore::new(gauges));

    // Setup graceful shutdown
    let cancel = Arc::new(AtomicBool::new(false));
    let c = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        c.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut sampler =
        SamplerLoop::from_config(RealFs::new(), &config, store.clone()).with_cancel(cancel.clone());

    let textfile = args.textfile.clone();
    let loop_cancel = cancel.clone();
    let worker = thread::Builder::new()
        .name("sampler".to_string())
        .spawn(move || {
            let store = sampler.store().clone();
            sampler.run_with(&loop_cancel, |report| {
                let Some(ref path) = textfile else {
                    return;
                };
                match store.render_text() {
                    Ok(text) => match write_textfile(path, &text) {
                        Ok(()) => debug!(
                            "Wrote {} ({} updated, {} failed)",
                            path.display(),
                            report.updated,
                            report.failed
                        ),
                        Err(e) => warn!("Failed to write {}: {}", path.display(), e),
                    },
                    Err(e) => warn!("Failed to render metrics: {}", e),
                }
            });
        });
    let worker = match worker {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start sampler thread: {}", e);
            return ExitCode::FAILURE;
        }
    };

    while !cancel.load(Ordering::SeqCst) && !worker.is_finished() {
        thread::sleep(Duration::from_millis(100));
    }

    info!("Shutting down...");
    if worker.join().is_err() {
        error!("Sampler thread panicked");
        return ExitCode::FAILURE;
    }
    info!("Shutdown complete");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["procgauged"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.interval, None);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sampling_interval": 30, "proc_path": "/proc", "metrics": ["cpu_usage"]}}"#
        )
        .unwrap();
        let config_path = file.path().to_str().unwrap();

        let args = Args::try_parse_from([
            "procgauged",
            "--config",
            config_path,
            "--interval",
            "0",
            "--proc-path",
            "/host/proc",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);

        let config = args.resolve_config();
        assert_eq!(config.sampling_interval, 1);
        assert_eq!(config.proc_path, PathBuf::from("/host/proc"));
        assert_eq!(config.metrics, vec!["cpu_usage"]);
    }

    #[test]
    fn test_missing_config_falls_back() {
        let args =
            Args::try_parse_from(["procgauged", "--config", "/nonexistent/config.json"]).unwrap();
        assert_eq!(args.resolve_config(), Config::default());
    }

    #[test]
    fn test_write_textfile_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("procgauge.prom");

        write_textfile(&path, "running_processes 1\n").unwrap();
        write_textfile(&path, "running_processes 2\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "running_processes 2\n"
        );
        assert!(!dir.path().join("procgauge.prom.tmp").exists());
    }
}
