use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portscout::{discover, CaptureBackend, CaptureLoop, Config, ConsoleReporter, PnetBackend};

#[derive(Parser)]
#[command(name = "portscout")]
#[command(about = "Finds the interface carrying a TCP port's traffic and reports its packets")]
struct Args {
    /// TCP port identifying the traffic to watch
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum bytes captured per frame
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    snaplen: Option<usize>,

    /// Capture frames not addressed to this host
    #[arg(long)]
    promiscuous: bool,

    /// Seconds a single capture read may block
    #[arg(long, value_name = "SECS")]
    read_timeout: Option<u64>,

    /// Give up discovery after this many seconds without a match
    #[arg(long, value_name = "SECS")]
    discovery_timeout: Option<u64>,

    /// Wait for every losing prober to close before capturing
    #[arg(long)]
    join_probers: bool,

    /// Skip interfaces that are down
    #[arg(long)]
    skip_down: bool,

    /// Verbose output (debug logs and payload hex dumps)
    #[arg(short, long)]
    verbose: bool,

    /// List network interfaces and exit
    #[arg(short, long)]
    list_interfaces: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(snaplen) = self.snaplen {
            config.capture.snaplen = snaplen;
        }
        if self.promiscuous {
            config.capture.promiscuous = true;
        }
        if let Some(secs) = self.read_timeout {
            config.capture.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.discovery_timeout {
            config.discovery_timeout = Some(Duration::from_secs(secs));
        }
        config.join_probers |= self.join_probers;
        config.skip_down |= self.skip_down;
        config.verbose |= self.verbose;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Invalid environment configuration")?;
    args.apply(&mut config);

    // Logs go to stderr so stdout only carries reports
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.tracing_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let backend = Arc::new(PnetBackend::new());

    if args.list_interfaces {
        println!("Available interfaces:");
        for iface in backend.interfaces().context("Failed to list interfaces")? {
            println!("  {}", iface);
        }
        return Ok(());
    }

    let signature = config.signature();
    let discovery = discover(backend, signature, &config.discovery_options())
        .with_context(|| format!("Failed to find an interface carrying {}", signature))?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let reporter = ConsoleReporter::new().with_verbose(config.verbose);
    let stats = CaptureLoop::new(discovery.source, signature, reporter)
        .with_running(running)
        .run();

    tracing::info!("Capture finished: {}", stats);
    Ok(())
}
