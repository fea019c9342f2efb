//! Layered Ethernet / IPv4 / TCP decoder.

use macaddr::MacAddr6;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{Ipv4Flags, Ipv4Packet};
use pnet::packet::tcp::TcpPacket;
use pnet::packet::Packet;

use crate::capture::{LinkType, RawFrame};
use crate::domain::{EthernetLayer, Ipv4Layer, LayerKind, TcpLayer};
use crate::error::DecodeError;

const ETHERNET_HEADER_LEN: usize = 14;
const MIN_IPV4_HEADER_LEN: usize = 20;
const MIN_TCP_HEADER_LEN: usize = 20;

/// Decodes frames into a fixed set of reusable layer buffers.
///
/// Each decoder is owned by exactly one prober or capture loop. Every call
/// to [`decode`](Self::decode) overwrites the buffers of the previous call,
/// so the decoded layers are only valid until the next frame.
#[derive(Debug, Default)]
pub struct LayerDecoder {
    ethernet: EthernetLayer,
    ipv4: Ipv4Layer,
    tcp: TcpLayer,
    found: Vec<LayerKind>,
}

impl LayerDecoder {
    pub fn new() -> Self {
        Self {
            found: Vec::with_capacity(3),
            ..Self::default()
        }
    }

    /// Decode a frame as far as Ethernet -> IPv4 -> TCP allows.
    ///
    /// Raw-IP frames start at the IPv4 layer. Decoding stops quietly at the
    /// first payload with no decoder (e.g. an IPv6 ethertype yields only
    /// `[Ethernet]`, an IPv4 fragment only `[Ethernet, Ipv4]`). Truncated or malformed
    /// headers return an error; layers decoded before the failure stay
    /// readable through [`layers`](Self::layers).
    pub fn decode(&mut self, frame: &RawFrame) -> Result<&[LayerKind], DecodeError> {
        self.found.clear();

        match frame.link_type {
            LinkType::Ethernet => self.decode_ethernet(&frame.data)?,
            LinkType::RawIp => self.decode_raw_ip(&frame.data)?,
            other => return Err(DecodeError::UnsupportedLinkType(other.to_string())),
        }

        Ok(&self.found)
    }

    /// Layers found by the most recent `decode` call, outermost first.
    pub fn layers(&self) -> &[LayerKind] {
        &self.found
    }

    pub fn ethernet(&self) -> Option<&EthernetLayer> {
        self.has(LayerKind::Ethernet).then_some(&self.ethernet)
    }

    pub fn ipv4(&self) -> Option<&Ipv4Layer> {
        self.has(LayerKind::Ipv4).then_some(&self.ipv4)
    }

    pub fn tcp(&self) -> Option<&TcpLayer> {
        self.has(LayerKind::Tcp).then_some(&self.tcp)
    }

    fn has(&self, kind: LayerKind) -> bool {
        self.found.contains(&kind)
    }

    fn decode_ethernet(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let ethernet = EthernetPacket::new(data).ok_or(DecodeError::Truncated {
            layer: "Ethernet",
            expected: ETHERNET_HEADER_LEN,
            actual: data.len(),
        })?;

        self.ethernet = EthernetLayer {
            src_mac: MacAddr6::from(ethernet.get_source().octets()),
            dst_mac: MacAddr6::from(ethernet.get_destination().octets()),
            ethertype: ethernet.get_ethertype().0,
        };
        self.found.push(LayerKind::Ethernet);

        if ethernet.get_ethertype() != EtherTypes::Ipv4 {
            return Ok(());
        }

        self.decode_ipv4(ethernet.payload())
    }

    fn decode_raw_ip(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        match data.first().map(|b| b >> 4) {
            Some(4) => self.decode_ipv4(data),
            Some(_) => Ok(()),
            None => Err(DecodeError::Truncated {
                layer: "IPv4",
                expected: MIN_IPV4_HEADER_LEN,
                actual: 0,
            }),
        }
    }

    fn decode_ipv4(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let (ipv4, header_len, end) = checked_ipv4(data)?;

        self.ipv4 = Ipv4Layer {
            src: ipv4.get_source(),
            dst: ipv4.get_destination(),
            ttl: ipv4.get_ttl(),
            protocol: ipv4.get_next_level_protocol().0,
            identification: ipv4.get_identification(),
            header_len,
            total_len: ipv4.get_total_length(),
        };
        self.found.push(LayerKind::Ipv4);

        if is_fragment(&ipv4) || ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
            return Ok(());
        }

        self.decode_tcp(&data[header_len..end])
    }

    fn decode_tcp(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let (tcp, header_len) = checked_tcp(data)?;

        self.tcp.src_port = tcp.get_source();
        self.tcp.dst_port = tcp.get_destination();
        self.tcp.sequence = tcp.get_sequence();
        self.tcp.acknowledgement = tcp.get_acknowledgement();
        self.tcp.flags = u16::from(tcp.get_flags());
        self.tcp.window = tcp.get_window();
        self.tcp.header_len = header_len;
        self.tcp.payload.clear();
        self.tcp.payload.extend_from_slice(&data[header_len..]);
        self.found.push(LayerKind::Tcp);

        Ok(())
    }
}

/// Cheap lookup of the TCP port pair in an Ethernet or raw-IP frame.
///
/// Validates headers the same way as [`LayerDecoder::decode`] but copies
/// nothing. Returns `None` for anything that is not well-formed, unfragmented
/// TCP over IPv4.
pub fn tcp_ports(frame: &RawFrame) -> Option<(u16, u16)> {
    let data = match frame.link_type {
        LinkType::Ethernet => {
            let ethernet = EthernetPacket::new(&frame.data)?;
            if ethernet.get_ethertype() != EtherTypes::Ipv4 {
                return None;
            }
            &frame.data[ETHERNET_HEADER_LEN..]
        }
        LinkType::RawIp => &frame.data[..],
        LinkType::Unknown => return None,
    };

    let (ipv4, header_len, end) = checked_ipv4(data).ok()?;
    if is_fragment(&ipv4) || ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }

    let (tcp, _) = checked_tcp(&data[header_len..end]).ok()?;
    Some((tcp.get_source(), tcp.get_destination()))
}

/// Validate an IPv4 header, returning the view, header length and payload end.
fn checked_ipv4(data: &[u8]) -> Result<(Ipv4Packet<'_>, usize, usize), DecodeError> {
    let ipv4 = Ipv4Packet::new(data).ok_or(DecodeError::Truncated {
        layer: "IPv4",
        expected: MIN_IPV4_HEADER_LEN,
        actual: data.len(),
    })?;

    if ipv4.get_version() != 4 {
        return Err(DecodeError::Malformed {
            layer: "IPv4",
            reason: format!("version {}", ipv4.get_version()),
        });
    }

    let header_len = usize::from(ipv4.get_header_length()) * 4;
    if header_len < MIN_IPV4_HEADER_LEN {
        return Err(DecodeError::Malformed {
            layer: "IPv4",
            reason: format!("header length {header_len} too small"),
        });
    }
    if header_len > data.len() {
        return Err(DecodeError::Truncated {
            layer: "IPv4",
            expected: header_len,
            actual: data.len(),
        });
    }

    let total_len = usize::from(ipv4.get_total_length());
    if total_len < header_len {
        return Err(DecodeError::Malformed {
            layer: "IPv4",
            reason: format!("total length {total_len} shorter than header {header_len}"),
        });
    }

    // Snapshot length may cut the datagram short; decode what was captured.
    let end = total_len.min(data.len());
    Ok((ipv4, header_len, end))
}

/// Any fragment, first or later. Only a reassembled datagram carries a
/// whole TCP header, and later fragments carry none at all.
fn is_fragment(ipv4: &Ipv4Packet<'_>) -> bool {
    ipv4.get_fragment_offset() != 0 || ipv4.get_flags() & Ipv4Flags::MoreFragments != 0
}

/// Validate a TCP header, returning the view and header length.
fn checked_tcp(data: &[u8]) -> Result<(TcpPacket<'_>, usize), DecodeError> {
    let tcp = TcpPacket::new(data).ok_or(DecodeError::Truncated {
        layer: "TCP",
        expected: MIN_TCP_HEADER_LEN,
        actual: data.len(),
    })?;

    let header_len = usize::from(tcp.get_data_offset()) * 4;
    if header_len < MIN_TCP_HEADER_LEN {
        return Err(DecodeError::Malformed {
            layer: "TCP",
            reason: format!("data offset {header_len} too small"),
        });
    }
    if header_len > data.len() {
        return Err(DecodeError::Truncated {
            layer: "TCP",
            expected: header_len,
            actual: data.len(),
        });
    }

    Ok((tcp, header_len))
}
