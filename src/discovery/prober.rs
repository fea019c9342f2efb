//! Per-interface prober.

use std::sync::mpsc::{SendError, Sender};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::CancellationToken;
use crate::capture::{CaptureBackend, CaptureConfig, FrameSource, InterfaceDescriptor};
use crate::decoder::tcp_ports;
use crate::error::CaptureError;
use crate::matcher::PortSignature;

/// Message from a prober to the coordinator.
pub(crate) enum ProbeEvent {
    /// A matching frame was seen; the handle now belongs to the receiver.
    Matched(Box<dyn FrameSource>),
    /// The interface could not be opened.
    OpenFailed {
        interface: String,
        error: CaptureError,
    },
    /// The frame sequence ended before any match; the handle was closed.
    Ended { interface: String },
}

/// How a prober finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Sent its handle to the coordinator.
    HandedOff,
    /// Saw the cancellation token and closed its handle.
    Cancelled,
    /// Could not open its interface.
    OpenFailed,
    /// Its frame sequence ended; the handle was closed.
    Ended,
}

/// Watches one interface for the first frame matching the signature.
///
/// Every handle the prober opens is either handed off or closed locally,
/// never both.
pub(crate) struct Prober<B: ?Sized> {
    backend: Arc<B>,
    interface: InterfaceDescriptor,
    config: CaptureConfig,
    signature: PortSignature,
    token: CancellationToken,
    events: Sender<ProbeEvent>,
}

impl<B: CaptureBackend + ?Sized> Prober<B> {
    pub(crate) fn new(
        backend: Arc<B>,
        interface: InterfaceDescriptor,
        config: CaptureConfig,
        signature: PortSignature,
        token: CancellationToken,
        events: Sender<ProbeEvent>,
    ) -> Self {
        Self {
            backend,
            interface,
            config,
            signature,
            token,
            events,
        }
    }

    pub(crate) fn run(self) -> ProbeOutcome {
        let name = self.interface.name.clone();
        info!("Trying device: {}", name);

        let mut source = match self.backend.open(&name, &self.config) {
            Ok(source) => source,
            Err(error) => {
                warn!("Failed to open {}: {}", name, error);
                // Coordinator gone means discovery is over; nothing to report.
                let _ = self.events.send(ProbeEvent::OpenFailed {
                    interface: name,
                    error,
                });
                return ProbeOutcome::OpenFailed;
            }
        };

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    if self.token.is_cancelled() {
                        return self.close_cancelled(source);
                    }
                    continue;
                }
                Err(e) => {
                    debug!("Frame source on {} ended: {}", name, e);
                    source.close();
                    let _ = self.events.send(ProbeEvent::Ended { interface: name });
                    return ProbeOutcome::Ended;
                }
            };

            if self.token.is_cancelled() {
                return self.close_cancelled(source);
            }

            if let Some((src_port, dst_port)) = tcp_ports(&frame) {
                if self.signature.matches_ports(src_port, dst_port) {
                    info!(
                        "Saw {} on {} ({} -> {})",
                        self.signature, name, src_port, dst_port
                    );
                    return self.hand_off(source);
                }
            }
        }
    }

    fn close_cancelled(&self, source: Box<dyn FrameSource>) -> ProbeOutcome {
        source.close();
        info!("Closed device: {}", self.interface.name);
        ProbeOutcome::Cancelled
    }

    fn hand_off(&self, source: Box<dyn FrameSource>) -> ProbeOutcome {
        match self.events.send(ProbeEvent::Matched(source)) {
            Ok(()) => ProbeOutcome::HandedOff,
            Err(SendError(event)) => {
                // Nobody is listening any more: take the handle back and release it.
                if let ProbeEvent::Matched(source) = event {
                    source.close();
                }
                info!("Closed device: {}", self.interface.name);
                ProbeOutcome::Cancelled
            }
        }
    }
}
