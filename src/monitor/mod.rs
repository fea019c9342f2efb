//! Capture loop module.
//!
//! Owns the winning handle after discovery and reports every matching
//! frame until capture ends.

mod capture_loop;

pub use capture_loop::CaptureLoop;
