//! portscout - find the interface carrying a TCP port's traffic and watch it.
//!
//! Every interface on the host is probed concurrently; the first one to
//! carry a TCP segment to or from the configured port wins. The capture
//! loop then decodes Ethernet / IPv4 / TCP on that interface and reports
//! each matching segment.

pub mod capture;
pub mod config;
pub mod decoder;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod matcher;
pub mod monitor;
pub mod reporter;

pub use capture::{CaptureBackend, CaptureConfig, FrameSource, PnetBackend};
pub use config::Config;
pub use discovery::{discover, Discovery, DiscoveryOptions};
pub use error::{CaptureError, ConfigError, DecodeError, DiscoveryError};
pub use matcher::PortSignature;
pub use monitor::CaptureLoop;
pub use reporter::{ConsoleReporter, EventReporter};
