//! wmi-collectord - custom WMI class collector daemon.
//!
//! Queries the classes named on the class path every interval and writes
//! the numeric properties of their instances as metrics, either to stdout
//! or atomically to a file picked up by a textfile exporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(not(windows))]
use wmi_collector::collector::MockAutomation;
#[cfg(windows)]
use wmi_collector::collector::WmiAutomation;
use wmi_collector::collector::{Automation, ClassQueryEngine, DEFAULT_LOCALE};
use wmi_collector::config::{CollectorConfig, DEFAULT_NAMESPACE};
use wmi_collector::exposition::{self, Format, Scrape};
use wmi_collector::metrics::{MetricKind, MetricRecord};

/// Custom WMI class collector daemon.
#[derive(Parser, Debug)]
#[command(name = "wmi-collectord", about = "Custom WMI class collector daemon", version)]
struct Args {
    /// Classes to query, as `namespace:Class` entries separated by `;`.
    #[arg(long, env = "WMI_CLASS_PATH", default_value = "")]
    class_path: String,

    /// Root namespace of the exported metric names.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Kind of every exported metric (counter or gauge).
    #[arg(long, default_value = "counter")]
    metric_kind: MetricKind,

    /// Locale requested when connecting to a namespace.
    #[arg(long, default_value = DEFAULT_LOCALE)]
    locale: String,

    /// Collection interval in seconds.
    #[arg(short, long, default_value = "15")]
    interval: u64,

    /// Output file, or `-` for stdout. Files are replaced atomically.
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Output format (text or json).
    #[arg(long, default_value = "text")]
    format: Format,

    /// Run a single cycle and exit. Exits non-zero if the cycle fails.
    #[arg(long)]
    once: bool,

    /// Print every property of every configured class and exit.
    #[arg(long)]
    describe: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> CollectorConfig {
        CollectorConfig::new(self.class_path.clone())
            .with_namespace(self.namespace.clone())
            .with_kind(self.metric_kind)
            .with_locale(self.locale.clone())
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
    for target in ["wmi_collectord", "wmi_collector"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one cycle and renders its outcome.
///
/// Records emitted before a failure are kept and rendered alongside a
/// failed status gauge.
fn run_cycle<A: Automation>(engine: &ClassQueryEngine<A>) -> (Scrape, bool) {
    let start = Instant::now();
    let (mut tx, rx) = mpsc::channel();

    let result = engine.collect(&mut tx);
    drop(tx);
    let records: Vec<MetricRecord> = rx.into_iter().collect();

    let success = match result {
        Ok(stats) => {
            info!("Cycle: {}", stats);
            true
        }
        Err(e) => {
            error!("failed collecting custom metrics: {}: {}", e.description(), e);
            false
        }
    };

    let scrape = Scrape {
        records,
        success,
        duration: start.elapsed(),
    };
    (scrape, success)
}

fn publish(scrape: &Scrape, args: &Args) -> bool {
    let rendered = match exposition::render(scrape, &args.namespace, args.format) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            return false;
        }
    };
    if let Err(e) = exposition::write_output(&args.output, &rendered) {
        error!("Failed to write {}: {}", args.output, e);
        return false;
    }
    debug!("Wrote {} bytes to {}", rendered.len(), args.output);
    true
}

fn describe<A: Automation>(engine: &ClassQueryEngine<A>) -> bool {
    let classes = match engine.describe() {
        Ok(classes) => classes,
        Err(e) => {
            error!("failed describing custom classes: {}: {}", e.description(), e);
            return false;
        }
    };

    for class in &classes {
        println!("{} ({} instances)", class.spec, class.instances.len());
        for instance in &class.instances {
            println!("  {}", instance.identity);
            for property in &instance.properties {
                let exported = if property.sample().is_some() { "*" } else { " " };
                println!(
                    "    {} {:<32} {:<10} {:?}",
                    exported,
                    property.name,
                    property.type_tag().to_string(),
                    property.value
                );
            }
        }
    }
    true
}

fn run<A: Automation>(automation: A, args: &Args, config: &CollectorConfig) -> bool {
    let engine = ClassQueryEngine::new(automation, config);

    if args.describe {
        return describe(&engine);
    }

    if args.once {
        let (scrape, success) = run_cycle(&engine);
        return publish(&scrape, args) && success;
    }

    let interval = Duration::from_secs(args.interval.max(1));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");
    let mut cycles: u64 = 0;

    while running.load(Ordering::SeqCst) {
        cycles += 1;
        let (scrape, _) = run_cycle(&engine);
        debug!("Cycle #{}: {} records", cycles, scrape.records.len());
        publish(&scrape, args);

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down after {} cycles", cycles);
    true
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("wmi-collectord {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, output={}, format={:?}, kind={}",
        args.interval, args.output, args.format, args.metric_kind
    );

    let config = args.config();
    match config.class_specs() {
        Ok(specs) if specs.is_empty() => warn!("Class path is empty, nothing will be collected"),
        Ok(specs) => {
            for spec in &specs {
                info!("Class: {}", spec);
            }
        }
        Err(e) => {
            error!("{}: {}", e.description(), e);
            std::process::exit(2);
        }
    }

    #[cfg(windows)]
    let automation = match WmiAutomation::new() {
        Ok(automation) => automation,
        Err(e) => {
            error!("Failed to initialize COM: {}", e);
            std::process::exit(1);
        }
    };
    #[cfg(not(windows))]
    let automation = {
        warn!("WMI is only available on Windows, using the built-in mock host");
        MockAutomation::typical_host()
    };

    if !run(automation, &args, &config) {
        std::process::exit(1);
    }
}
