//! Domain events produced by the capture loop.

use std::time::Instant;

use super::layers::{EthernetLayer, Ipv4Layer, TcpLayer};

/// A captured frame whose TCP ports matched the signature.
///
/// This is the primary domain event that our system produces.
#[derive(Debug, Clone)]
pub struct SignatureMatch {
    /// Timestamp when the frame was decoded
    pub timestamp: Instant,
    /// Interface the frame was captured on
    pub interface: String,
    /// Length of the captured frame in bytes
    pub frame_len: usize,
    /// Ethernet header, when the frame carried one
    pub ethernet: Option<EthernetLayer>,
    /// IPv4 header, when decoded
    pub ipv4: Option<Ipv4Layer>,
    /// The matching TCP header and payload
    pub tcp: TcpLayer,
}

impl SignatureMatch {
    pub fn new(
        interface: impl Into<String>,
        frame_len: usize,
        ethernet: Option<EthernetLayer>,
        ipv4: Option<Ipv4Layer>,
        tcp: TcpLayer,
    ) -> Self {
        Self {
            timestamp: Instant::now(),
            interface: interface.into(),
            frame_len,
            ethernet,
            ipv4,
            tcp,
        }
    }

    pub fn src_port(&self) -> u16 {
        self.tcp.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.tcp.dst_port
    }

    /// One line per decoded layer, outermost first.
    pub fn layer_summary(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if let Some(eth) = &self.ethernet {
            lines.push(eth.to_string());
        }
        if let Some(ip) = &self.ipv4 {
            lines.push(ip.to_string());
        }
        lines.push(self.tcp.to_string());
        lines
    }
}
