//! pnet-based packet capture implementation.

use std::io;

use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};

use super::{CaptureBackend, CaptureConfig, FrameSource, InterfaceDescriptor, LinkType, RawFrame};
use crate::error::CaptureError;

/// Smallest kernel read buffer requested, regardless of snapshot length.
const MIN_READ_BUFFER: usize = 4096;

/// Capture backend using the pnet datalink layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct PnetBackend;

impl PnetBackend {
    pub fn new() -> Self {
        Self
    }

    fn find_interface(name: &str) -> Result<NetworkInterface, CaptureError> {
        datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| CaptureError::InterfaceNotFound(name.to_string()))
    }
}

/// Framing the datalink channel delivers on `iface`.
///
/// Point-to-point and MAC-less interfaces (tun, ppp) hand over bare IP
/// packets. Loopback is framed as Ethernet.
fn link_type_of(iface: &NetworkInterface) -> LinkType {
    if iface.is_loopback() {
        LinkType::Ethernet
    } else if iface.is_point_to_point() || iface.mac.is_none() {
        LinkType::RawIp
    } else {
        LinkType::Ethernet
    }
}

impl From<&NetworkInterface> for InterfaceDescriptor {
    fn from(iface: &NetworkInterface) -> Self {
        Self {
            name: iface.name.clone(),
            description: iface.description.clone(),
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl CaptureBackend for PnetBackend {
    fn interfaces(&self) -> Result<Vec<InterfaceDescriptor>, CaptureError> {
        Ok(datalink::interfaces()
            .iter()
            .map(InterfaceDescriptor::from)
            .collect())
    }

    fn open(
        &self,
        interface: &str,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        let iface = Self::find_interface(interface)?;

        let channel_config = Config {
            read_buffer_size: config.snaplen.max(MIN_READ_BUFFER),
            read_timeout: Some(config.read_timeout),
            promiscuous: config.promiscuous,
            ..Config::default()
        };

        let (tx, rx) = match datalink::channel(&iface, channel_config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err(CaptureError::UnsupportedChannel(iface.name)),
            Err(e) => {
                let msg = e.to_string();
                if e.kind() == io::ErrorKind::PermissionDenied
                    || msg.contains("permission")
                    || msg.contains("Operation not permitted")
                {
                    return Err(CaptureError::InsufficientPermissions);
                }
                return Err(CaptureError::ChannelCreation(msg));
            }
        };

        let link_type = link_type_of(&iface);
        tracing::debug!(
            "Opened {} (link={}, snaplen={}, promiscuous={}, timeout={:?})",
            iface.name,
            link_type,
            config.snaplen,
            config.promiscuous,
            config.read_timeout
        );

        Ok(Box::new(PnetFrameSource {
            interface: iface.name,
            snaplen: config.snaplen,
            link_type,
            _tx: tx,
            rx,
        }))
    }
}

/// Live capture handle on one interface.
struct PnetFrameSource {
    interface: String,
    snaplen: usize,
    link_type: LinkType,
    // Held so the socket stays fully open; frames are never sent.
    _tx: Box<dyn DataLinkSender>,
    rx: Box<dyn DataLinkReceiver>,
}

impl FrameSource for PnetFrameSource {
    fn interface_name(&self) -> &str {
        &self.interface
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        match self.rx.next() {
            Ok(packet) => {
                let len = packet.len().min(self.snaplen);
                Ok(Some(RawFrame {
                    data: packet[..len].to_vec(),
                    link_type: self.link_type,
                }))
            }
            Err(e) => match e.kind() {
                // Timeout is expected, the caller re-checks its own state
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
                    Ok(None)
                }
                _ => {
                    tracing::debug!("Capture error on {}: {}", self.interface, e);
                    Err(CaptureError::Io(e))
                }
            },
        }
    }

    fn close(self: Box<Self>) {
        tracing::debug!("Closing capture on {}", self.interface);
        drop(self);
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use pnet::datalink::MacAddr;

    const IFF_UP: u32 = 0x1;
    const IFF_LOOPBACK: u32 = 0x8;
    const IFF_POINTOPOINT: u32 = 0x10;

    fn iface(name: &str, mac: Option<MacAddr>, flags: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index: 1,
            mac,
            ips: Vec::new(),
            flags,
        }
    }

    #[test]
    fn test_ethernet_nic() {
        let eth = iface("eth0", Some(MacAddr::new(2, 0, 0, 0, 0, 1)), IFF_UP);
        assert_eq!(link_type_of(&eth), LinkType::Ethernet);
    }

    #[test]
    fn test_tun_is_raw_ip() {
        let tun = iface("tun0", None, IFF_UP | IFF_POINTOPOINT);
        assert_eq!(link_type_of(&tun), LinkType::RawIp);

        let ppp = iface("ppp0", Some(MacAddr::zero()), IFF_UP | IFF_POINTOPOINT);
        assert_eq!(link_type_of(&ppp), LinkType::RawIp);
    }

    #[test]
    fn test_loopback_is_ethernet() {
        let lo = iface("lo", Some(MacAddr::zero()), IFF_UP | IFF_LOOPBACK);
        assert_eq!(link_type_of(&lo), LinkType::Ethernet);
    }
}
