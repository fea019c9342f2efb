//! Interface discovery race.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::prober::{ProbeEvent, ProbeOutcome, Prober};
use super::CancellationToken;
use crate::capture::{CaptureBackend, CaptureConfig, FrameSource};
use crate::error::DiscoveryError;
use crate::matcher::PortSignature;

/// Knobs for a discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Parameters for every prober's capture handle
    pub capture: CaptureConfig,
    /// Give up if no interface matches within this long
    pub deadline: Option<Duration>,
    /// Wait for every losing prober to finish before returning
    pub join_probers: bool,
    /// Do not probe interfaces reported as down
    pub skip_down: bool,
}

/// How one prober ended, as seen after joining it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub interface: String,
    pub outcome: ProbeOutcome,
}

/// The result of a successful discovery.
pub struct Discovery {
    /// The winning capture handle
    pub source: Box<dyn FrameSource>,
    /// Time from first prober start to the winning match
    pub elapsed: Duration,
    /// Prober outcomes; only filled when probers were joined
    pub reports: Vec<ProbeReport>,
}

impl Discovery {
    pub fn interface_name(&self) -> &str {
        self.source.interface_name()
    }
}

type Worker = (String, JoinHandle<ProbeOutcome>);

/// Find the interface carrying traffic for `signature`.
///
/// Opens every interface concurrently, one prober thread each. The first
/// prober to see a TCP segment whose source or destination port matches
/// wins; which one that is depends on live traffic timing, not on
/// enumeration order. All other probers are cancelled.
///
/// Handoff never blocks a prober, and any handle that matches after the
/// winner was chosen is closed by the cleanup pass, so no handle leaks.
/// Without `join_probers` that cleanup runs on a background thread and
/// losers release their handles within one read timeout.
///
/// With no deadline and no matching traffic this blocks indefinitely.
pub fn discover<B>(
    backend: Arc<B>,
    signature: PortSignature,
    options: &DiscoveryOptions,
) -> Result<Discovery, DiscoveryError>
where
    B: CaptureBackend + ?Sized + 'static,
{
    let interfaces: Vec<_> = backend
        .interfaces()
        .map_err(DiscoveryError::Enumeration)?
        .into_iter()
        .filter(|iface| !options.skip_down || iface.is_up)
        .collect();

    if interfaces.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    let total = interfaces.len();
    info!("Probing {} interface(s) for {}", total, signature);

    let (tx, rx) = mpsc::channel();
    let token = CancellationToken::new();
    let started = Instant::now();

    let mut workers: Vec<Worker> = Vec::with_capacity(total);
    let mut open_failures = 0;

    for iface in interfaces {
        let name = iface.name.clone();
        let prober = Prober::new(
            Arc::clone(&backend),
            iface,
            options.capture.clone(),
            signature,
            token.clone(),
            tx.clone(),
        );

        match thread::Builder::new()
            .name(format!("probe-{name}"))
            .spawn(move || prober.run())
        {
            Ok(handle) => workers.push((name, handle)),
            Err(e) => {
                warn!("Failed to start prober for {}: {}", name, e);
                open_failures += 1;
            }
        }
    }

    // Only probers hold senders now, so the channel disconnects once all exit.
    drop(tx);

    let mut remaining = workers.len();
    let mut timed_out = false;

    let winner = loop {
        if remaining == 0 {
            break None;
        }

        let received = match options.deadline {
            Some(deadline) => match rx.recv_timeout(deadline.saturating_sub(started.elapsed())) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    None
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => rx.recv().ok(),
        };

        let Some(event) = received else {
            break None;
        };

        match event {
            ProbeEvent::Matched(source) => break Some(source),
            ProbeEvent::OpenFailed { interface, error } => {
                debug!("Prober for {} dropped out: {}", interface, error);
                open_failures += 1;
                remaining -= 1;
            }
            ProbeEvent::Ended { interface } => {
                info!("Capture on {} ended without a match", interface);
                remaining -= 1;
            }
        }
    };

    token.cancel();
    let reports = finish(rx, workers, options.join_probers);

    match winner {
        Some(source) => {
            let elapsed = started.elapsed();
            info!(
                "Using device {} (found after {:.1}s)",
                source.interface_name(),
                elapsed.as_secs_f64()
            );
            Ok(Discovery {
                source,
                elapsed,
                reports,
            })
        }
        None if timed_out => Err(DiscoveryError::Timeout {
            port: signature.port(),
            after: options.deadline.unwrap_or_default(),
        }),
        None if open_failures == total => Err(DiscoveryError::AllProbersFailed(total)),
        None => Err(DiscoveryError::NoMatchingTraffic(signature.port())),
    }
}

/// Release everything the losing probers leave behind.
fn finish(rx: Receiver<ProbeEvent>, workers: Vec<Worker>, join: bool) -> Vec<ProbeReport> {
    if join {
        return reap(rx, workers);
    }

    thread::spawn(move || {
        reap(rx, workers);
    });
    Vec::new()
}

/// Join every prober, then close any handle that matched after the winner.
fn reap(rx: Receiver<ProbeEvent>, workers: Vec<Worker>) -> Vec<ProbeReport> {
    let mut reports = Vec::with_capacity(workers.len());

    for (interface, handle) in workers {
        match handle.join() {
            Ok(outcome) => reports.push(ProbeReport { interface, outcome }),
            Err(_) => warn!("Prober for {} panicked", interface),
        }
    }

    for event in rx.try_iter() {
        if let ProbeEvent::Matched(source) = event {
            info!("Closing late match on {}", source.interface_name());
            source.close();
        }
    }

    reports
}
