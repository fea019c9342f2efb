//! Packet capture abstraction.
//!
//! This module defines the `CaptureBackend` and `FrameSource` traits and
//! provides a pnet-based implementation. Discovery and the capture loop
//! only ever see the traits, so tests drive them with scripted sources.

mod pnet_capture;
#[cfg(test)]
pub(crate) mod scripted;

pub use pnet_capture::PnetBackend;

use std::fmt;
use std::time::Duration;

use crate::error::CaptureError;

/// Default maximum bytes kept per captured frame.
pub const DEFAULT_SNAPLEN: usize = 1024;

/// Default upper bound on a single blocking read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters used when opening a capture handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Maximum bytes kept per frame; longer frames are cut short
    pub snaplen: usize,
    /// Capture frames not addressed to this host
    pub promiscuous: bool,
    /// Maximum time a single pull may block before returning empty-handed
    pub read_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            promiscuous: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A host network interface as seen at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub description: String,
    pub is_up: bool,
    pub is_loopback: bool,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_up: true,
            is_loopback: false,
        }
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_up { "UP" } else { "DOWN" };
        write!(f, "{}: {}", self.name, status)?;
        if self.is_loopback {
            write!(f, " loopback")?;
        }
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

/// Link-layer framing of captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    /// Bare IP packets with no link header (tun, ppp)
    RawIp,
    Unknown,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethernet => write!(f, "Ethernet"),
            Self::RawIp => write!(f, "Raw IP"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One captured link-layer frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// The frame bytes, at most `snaplen` long
    pub data: Vec<u8>,
    /// Framing of `data`, taken from the originating handle
    pub link_type: LinkType,
}

/// An open capture handle bound to one interface.
///
/// The handle yields frames until it is closed or the underlying source
/// fails. `close` consumes the handle, so it can only be released once.
pub trait FrameSource: Send {
    /// Name of the interface this handle captures on.
    fn interface_name(&self) -> &str;

    /// Pull the next frame.
    ///
    /// Returns `Ok(None)` when the read timeout elapses without a frame.
    /// Any error means the frame sequence has ended and must not be read again.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, CaptureError>;

    /// Release the underlying OS resource.
    fn close(self: Box<Self>);
}

/// Opens capture handles and enumerates interfaces.
pub trait CaptureBackend: Send + Sync {
    /// List the host's interfaces.
    fn interfaces(&self) -> Result<Vec<InterfaceDescriptor>, CaptureError>;

    /// Open a live capture on the named interface.
    fn open(
        &self,
        interface: &str,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError>;
}
