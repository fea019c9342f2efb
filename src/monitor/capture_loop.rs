//! Capture loop over the discovered interface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capture::FrameSource;
use crate::decoder::LayerDecoder;
use crate::domain::{CaptureStats, LayerKind, SignatureMatch};
use crate::matcher::PortSignature;
use crate::reporter::EventReporter;

/// Decodes every frame from one handle and reports signature matches.
pub struct CaptureLoop<R> {
    source: Box<dyn FrameSource>,
    signature: PortSignature,
    decoder: LayerDecoder,
    reporter: R,
    running: Arc<AtomicBool>,
}

impl<R: EventReporter> CaptureLoop<R> {
    pub fn new(source: Box<dyn FrameSource>, signature: PortSignature, reporter: R) -> Self {
        Self {
            source,
            signature,
            decoder: LayerDecoder::new(),
            reporter,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Share a shutdown flag; the loop stops once it reads `false`.
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Run until the frame sequence ends or the running flag is cleared.
    ///
    /// Decode errors are logged and skipped. The handle is closed before
    /// returning.
    pub fn run(mut self) -> CaptureStats {
        let interface = self.source.interface_name().to_string();
        self.reporter.on_start(&interface);

        let mut stats = CaptureStats::default();

        while self.running.load(Ordering::SeqCst) {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    info!("Capture on {} ended: {}", interface, e);
                    break;
                }
            };
            stats.frames += 1;

            if let Err(e) = self.decoder.decode(&frame) {
                warn!("Trouble decoding layers: {}", e);
                stats.decode_errors += 1;
            }

            // Layers decoded before an error are still inspected.
            for layer in self.decoder.layers() {
                if *layer != LayerKind::Tcp {
                    continue;
                }
                let Some(tcp) = self.decoder.tcp() else {
                    continue;
                };
                if !self.signature.matches(tcp) {
                    debug!("Skipping {} -> {}", tcp.src_port, tcp.dst_port);
                    continue;
                }

                let event = SignatureMatch::new(
                    interface.as_str(),
                    frame.data.len(),
                    self.decoder.ethernet().copied(),
                    self.decoder.ipv4().copied(),
                    tcp.clone(),
                );
                self.reporter.report(&event);
                stats.matches += 1;
            }
        }

        self.source.close();
        self.reporter.on_stop(&stats);
        stats
    }
}
