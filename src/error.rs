//! Error types for the application.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by capture backends and frame sources.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Failed to create capture channel: {0}")]
    ChannelCreation(String),

    #[error("Insufficient permissions for packet capture. Try running as root or with CAP_NET_RAW.")]
    InsufficientPermissions,

    #[error("Unsupported channel type on interface '{0}'")]
    UnsupportedChannel(String),

    /// Listing interfaces failed. The pnet backend cannot fail here, but
    /// discovery reports it for backends that can.
    #[error("Failed to enumerate interfaces: {0}")]
    Enumeration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a frame into layers.
///
/// These are never fatal: the caller logs them and moves on to the next frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{layer} layer truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed {layer} header: {reason}")]
    Malformed { layer: &'static str, reason: String },

    #[error("Unsupported link type: {0}")]
    UnsupportedLinkType(String),
}

/// Errors that end interface discovery.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Interface enumeration failed: {0}")]
    Enumeration(#[source] CaptureError),

    #[error("No network interfaces found")]
    NoInterfaces,

    #[error("Failed to open any of {0} interface(s) for capture")]
    AllProbersFailed(usize),

    #[error("Every capture source ended without seeing TCP port {0}")]
    NoMatchingTraffic(u16),

    #[error("No traffic on TCP port {port} seen within {after:?}")]
    Timeout { port: u16, after: Duration },
}

/// Errors raised while loading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
