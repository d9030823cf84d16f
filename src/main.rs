use std::path::PathBuf;
use std::time::Duration;

use badge_sentinel::{
    describe_decision, FileScreenshots, MonitorConfig, MonitorError, NotificationMonitor,
};
use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "badge-sentinel")]
#[command(about = "Detect unread notification and message badges in top-bar screenshots")]
struct Cli {
    /// Screenshots to scan; attempts cycle through them in order
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of capture attempts (raised to the configured minimum)
    #[arg(short, long)]
    attempts: Option<u32>,

    /// Skip the settle delays between attempts
    #[arg(long)]
    no_delay: bool,

    /// Include per-sample reasoning and debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), MonitorError> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if args.no_delay {
        config = config.with_delays(Duration::ZERO, Duration::ZERO);
    }
    if args.verbose {
        config = config.with_debug_samples(true);
    }

    let monitor = NotificationMonitor::new(config)?;
    let provider = FileScreenshots::new(args.images)?;
    let report = monitor.scan(&provider, args.attempts);

    println!("{}", serde_json::to_string_pretty(&describe_decision(&report))?);
    Ok(())
}
