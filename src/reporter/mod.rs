//! Reporting module for signature matches.
//!
//! This module defines the `EventReporter` trait and provides
//! implementations for different output formats.

mod console_reporter;

pub use console_reporter::ConsoleReporter;

use crate::domain::{CaptureStats, SignatureMatch};

/// Sink for matched frames.
///
/// This trait only handles reporting, not filtering or decoding.
pub trait EventReporter: Send {
    /// Report a frame that matched the signature.
    fn report(&self, event: &SignatureMatch);

    /// Called when the capture loop starts on the discovered interface.
    fn on_start(&self, interface: &str);

    /// Called when the capture loop stops.
    fn on_stop(&self, stats: &CaptureStats);
}
