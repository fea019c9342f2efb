//! TCP port signature.

use std::fmt;

use crate::domain::TcpLayer;

/// Well-known port watched when none is configured.
pub const DEFAULT_PORT: u16 = 2050;

/// A TCP port identifying the protocol of interest.
///
/// A segment matches when either its source or destination port equals
/// the signature port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSignature {
    port: u16,
}

impl PortSignature {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check a decoded TCP layer against the signature.
    pub fn matches(&self, tcp: &TcpLayer) -> bool {
        self.matches_ports(tcp.src_port, tcp.dst_port)
    }

    /// Check a raw source/destination port pair against the signature.
    pub fn matches_ports(&self, src_port: u16, dst_port: u16) -> bool {
        src_port == self.port || dst_port == self.port
    }
}

impl Default for PortSignature {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl fmt::Display for PortSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp/{}", self.port)
    }
}
