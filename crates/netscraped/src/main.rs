//! netscraped - Host network metrics scraper daemon.
//!
//! Scrapes network counters, TCP connection states, conntrack and UDP
//! protocol counters from the /proc filesystem at a fixed interval and
//! writes every snapshot as one JSON line.

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use netscrape_core::collector::FileSystem;
#[cfg(target_os = "linux")]
use netscrape_core::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use netscrape_core::collector::mock::MockFs;
use netscrape_core::collector::procfs::ProcfsStatSource;
use netscrape_core::config::{ConfigError, MatchConfig, MatchType, ScraperConfig};
use netscrape_core::context::ScrapeContext;
use netscrape_core::metadata::Metrics;
use netscrape_core::{NetworkScraper, StatSources};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum MatchTypeArg {
    #[default]
    Strict,
    Regexp,
}

impl From<MatchTypeArg> for MatchType {
    fn from(arg: MatchTypeArg) -> Self {
        match arg {
            MatchTypeArg::Strict => MatchType::Strict,
            MatchTypeArg::Regexp => MatchType::Regexp,
        }
    }
}

/// Host network metrics scraper daemon.
#[derive(Parser, Debug)]
#[command(name = "netscraped", about = "Host network metrics scraper daemon", version)]
struct Args {
    /// Scrape interval in seconds. Also the deadline of a single scrape.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// JSON config file. Command line options are applied on top of it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Append snapshots to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only report these interfaces (repeatable).
    #[arg(long, value_name = "PATTERN")]
    include: Vec<String>,

    /// Never report these interfaces (repeatable).
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// How --include and --exclude patterns are matched.
    #[arg(long, value_enum, default_value_t = MatchTypeArg::Strict)]
    match_type: MatchTypeArg,

    /// Enable a metric by name, e.g. system.network.conntrack.count (repeatable).
    #[arg(long, value_name = "METRIC")]
    enable: Vec<String>,

    /// Disable a metric by name (repeatable).
    #[arg(long, value_name = "METRIC")]
    disable: Vec<String>,

    /// Scrape once and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
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
    for target in ["netscraped", "netscrape_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Builds the scraper config from the optional file and the command line.
fn build_config(args: &Args) -> Result<ScraperConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ScraperConfig::from_json_file(path)?,
        None => ScraperConfig::default(),
    };

    if !args.include.is_empty() {
        config.include = MatchConfig::new(args.include.clone(), args.match_type.into());
    }
    if !args.exclude.is_empty() {
        config.exclude = MatchConfig::new(args.exclude.clone(), args.match_type.into());
    }
    for name in &args.enable {
        config.metrics.set_enabled(name, true)?;
    }
    for name in &args.disable {
        config.metrics.set_enabled(name, false)?;
    }

    Ok(config)
}

/// Describes the contents of a snapshot for logging.
fn describe_metrics(metrics: &Metrics) -> String {
    let interfaces: BTreeSet<&str> = metrics
        .metrics
        .iter()
        .flat_map(|m| m.data_points.iter())
        .filter_map(|p| p.attribute("device"))
        .collect();

    format!(
        "{} metrics, {} points, {} interfaces",
        metrics.metric_count(),
        metrics.data_point_count(),
        interfaces.len()
    )
}

/// Serializes a snapshot as one JSON line.
fn write_snapshot(out: &mut dyn Write, metrics: &Metrics) -> io::Result<()> {
    serde_json::to_writer(&mut *out, metrics)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn open_output(path: Option<&PathBuf>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn run<F: FileSystem + 'static>(args: &Args, fs: F) -> ExitCode {
    let mut config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let interval = Duration::from_secs(args.interval.max(1));

    // Setup graceful shutdown; the flag also cancels an in-flight scrape
    let shutdown = Arc::new(AtomicBool::new(false));
    let s = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        s.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }
    let base_ctx = ScrapeContext::new().with_cancel_flag(shutdown.clone());

    let source = Arc::new(ProcfsStatSource::new(fs, &args.proc_path));
    if config.host_name.is_none() {
        match source.host_name(&base_ctx.layered_env(&config.env)) {
            Ok(name) => config.host_name = Some(name),
            Err(e) => debug!("Host name unavailable: {}", e),
        }
    }

    let proc_path = source.proc_path().to_string();
    let mut scraper = match NetworkScraper::new(config, StatSources::from_procfs(source)) {
        Ok(scraper) => scraper,
        Err(e) => {
            error!("Failed to create scraper: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Config: interval={}s, proc={}, enabled=[{}]",
        args.interval,
        proc_path,
        scraper.config().metrics.enabled_metrics().join(", ")
    );

    if let Err(e) = scraper.start(&base_ctx) {
        error!("Failed to start scraper: {}", e);
        return ExitCode::FAILURE;
    }

    let mut out = match open_output(args.output.as_ref()) {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to open output: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting scrape loop");
    let mut snapshot_count: u64 = 0;

    while !shutdown.load(Ordering::SeqCst) {
        let ctx = base_ctx.clone().with_timeout(interval);
        match scraper.scrape(&ctx) {
            Ok(outcome) => {
                snapshot_count += 1;
                info!("Snapshot #{}: {}", snapshot_count, describe_metrics(&outcome.metrics));
                if let Some(err) = &outcome.error {
                    warn!("Partial scrape ({} metrics failed): {}", err.failed_metrics(), err);
                }
                if let Err(e) = write_snapshot(out.as_mut(), &outcome.metrics) {
                    error!("Failed to write snapshot: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to scrape: {}", e);
            }
        }

        if args.once {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && !shutdown.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down after {} snapshots", snapshot_count);
    scraper.shutdown();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("netscraped {} starting", env!("CARGO_PKG_VERSION"));

    #[cfg(target_os = "linux")]
    let fs = RealFs::new();
    #[cfg(not(target_os = "linux"))]
    let fs = MockFs::typical_host();

    run(&args, fs)
}
