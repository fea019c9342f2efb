//! Decoded protocol layers.

use std::fmt;
use std::net::Ipv4Addr;

use macaddr::MacAddr6;

/// The protocol layers the decoder understands, in decode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Ethernet,
    Ipv4,
    Tcp,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethernet => write!(f, "Ethernet"),
            Self::Ipv4 => write!(f, "IPv4"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// Ethernet II header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetLayer {
    pub src_mac: MacAddr6,
    pub dst_mac: MacAddr6,
    pub ethertype: u16,
}

impl Default for EthernetLayer {
    fn default() -> Self {
        Self {
            src_mac: MacAddr6::nil(),
            dst_mac: MacAddr6::nil(),
            ethertype: 0,
        }
    }
}

impl fmt::Display for EthernetLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ethernet {} -> {} type={:#06x}",
            self.src_mac, self.dst_mac, self.ethertype
        )
    }
}

/// IPv4 header fields surfaced in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Layer {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub ttl: u8,
    pub protocol: u8,
    pub identification: u16,
    /// Header length in bytes.
    pub header_len: usize,
    pub total_len: u16,
}

impl Default for Ipv4Layer {
    fn default() -> Self {
        Self {
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
            ttl: 0,
            protocol: 0,
            identification: 0,
            header_len: 0,
            total_len: 0,
        }
    }
}

impl fmt::Display for Ipv4Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IPv4 {} -> {} ttl={} id={} len={}",
            self.src, self.dst, self.ttl, self.identification, self.total_len
        )
    }
}

/// TCP control flags.
pub mod tcp_flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
}

/// TCP header fields plus the captured payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub flags: u16,
    pub window: u16,
    /// Header length in bytes.
    pub header_len: usize,
    /// Payload bytes as captured (may be cut short by the snapshot length).
    pub payload: Vec<u8>,
}

impl TcpLayer {
    /// Render the flag bits as `[SYN,ACK]`.
    pub fn flag_names(&self) -> String {
        const NAMES: [(u16, &str); 6] = [
            (tcp_flags::FIN, "FIN"),
            (tcp_flags::SYN, "SYN"),
            (tcp_flags::RST, "RST"),
            (tcp_flags::PSH, "PSH"),
            (tcp_flags::ACK, "ACK"),
            (tcp_flags::URG, "URG"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(bit, _)| self.flags & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        format!("[{}]", set.join(","))
    }
}

impl fmt::Display for TcpLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TCP {} -> {} seq={} ack={} flags={} win={} payload={}B",
            self.src_port,
            self.dst_port,
            self.sequence,
            self.acknowledgement,
            self.flag_names(),
            self.window,
            self.payload.len()
        )
    }
}
