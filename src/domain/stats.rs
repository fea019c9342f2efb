//! Counters kept by the capture loop.

use std::fmt;

/// Totals for one capture loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames pulled from the handle
    pub frames: u64,
    /// Frames reported as matching the signature
    pub matches: u64,
    /// Frames that failed to decode
    pub decode_errors: u64,
}

impl fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} matched, {} decode errors",
            self.frames, self.matches, self.decode_errors
        )
    }
}
