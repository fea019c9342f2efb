//! Scripted in-memory capture backend for tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{CaptureBackend, CaptureConfig, FrameSource, InterfaceDescriptor, LinkType, RawFrame};
use crate::error::CaptureError;

/// Frames and behavior for one fake interface.
#[derive(Debug, Clone)]
pub struct ScriptedInterface {
    name: String,
    frames: Vec<Vec<u8>>,
    fail_open: bool,
    end_after_script: bool,
    frame_delay: Duration,
    link_type: LinkType,
}

impl ScriptedInterface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: Vec::new(),
            fail_open: false,
            end_after_script: false,
            frame_delay: Duration::ZERO,
            link_type: LinkType::Ethernet,
        }
    }

    /// Tag every frame from this interface with `link_type`.
    pub fn link_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn frames(mut self, frames: Vec<Vec<u8>>) -> Self {
        self.frames = frames;
        self
    }

    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// End the frame sequence once the script is exhausted instead of idling.
    pub fn end_after_script(mut self) -> Self {
        self.end_after_script = true;
        self
    }

    /// Sleep before handing out each scripted frame.
    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }
}

/// Backend serving scripted interfaces and counting handle closes.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    interfaces: Vec<ScriptedInterface>,
    enumeration_fails: bool,
    opens: Arc<Mutex<HashMap<String, usize>>>,
    closes: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(mut self, iface: ScriptedInterface) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn failing_enumeration() -> Self {
        Self {
            enumeration_fails: true,
            ..Self::default()
        }
    }

    pub fn open_count(&self, name: &str) -> usize {
        self.opens.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn close_count(&self, name: &str) -> usize {
        self.closes.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_closes(&self) -> usize {
        self.closes.lock().unwrap().values().sum()
    }
}

impl CaptureBackend for ScriptedBackend {
    fn interfaces(&self) -> Result<Vec<InterfaceDescriptor>, CaptureError> {
        if self.enumeration_fails {
            return Err(CaptureError::Enumeration("scripted failure".to_string()));
        }
        Ok(self
            .interfaces
            .iter()
            .map(|iface| InterfaceDescriptor::new(iface.name.clone()))
            .collect())
    }

    fn open(
        &self,
        interface: &str,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        let script = self
            .interfaces
            .iter()
            .find(|iface| iface.name == interface)
            .ok_or_else(|| CaptureError::InterfaceNotFound(interface.to_string()))?;

        if script.fail_open {
            return Err(CaptureError::InsufficientPermissions);
        }

        *self.opens.lock().unwrap().entry(interface.to_string()).or_default() += 1;

        Ok(Box::new(ScriptedSource {
            name: script.name.clone(),
            frames: script.frames.iter().cloned().collect(),
            end_after_script: script.end_after_script,
            frame_delay: script.frame_delay,
            link_type: script.link_type,
            idle: config.read_timeout,
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Handle over a scripted interface.
pub struct ScriptedSource {
    name: String,
    frames: VecDeque<Vec<u8>>,
    end_after_script: bool,
    frame_delay: Duration,
    link_type: LinkType,
    idle: Duration,
    closes: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedSource {
    /// A standalone handle, not tied to any backend, that ends after its frames.
    pub fn finite(name: &str, frames: Vec<Vec<u8>>) -> (Self, Arc<Mutex<HashMap<String, usize>>>) {
        Self::finite_with_link(name, frames, LinkType::Ethernet)
    }

    pub fn finite_with_link(
        name: &str,
        frames: Vec<Vec<u8>>,
        link_type: LinkType,
    ) -> (Self, Arc<Mutex<HashMap<String, usize>>>) {
        let closes = Arc::new(Mutex::new(HashMap::new()));
        let source = Self {
            name: name.to_string(),
            frames: frames.into(),
            end_after_script: true,
            frame_delay: Duration::ZERO,
            link_type,
            idle: Duration::from_millis(1),
            closes: Arc::clone(&closes),
        };
        (source, closes)
    }
}

impl FrameSource for ScriptedSource {
    fn interface_name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        match self.frames.pop_front() {
            Some(data) => {
                if !self.frame_delay.is_zero() {
                    thread::sleep(self.frame_delay);
                }
                Ok(Some(RawFrame {
                    data,
                    link_type: self.link_type,
                }))
            }
            None if self.end_after_script => Err(CaptureError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("script for {} exhausted", self.name),
            ))),
            None => {
                thread::sleep(self.idle);
                Ok(None)
            }
        }
    }

    fn close(self: Box<Self>) {
        *self.closes.lock().unwrap().entry(self.name.clone()).or_default() += 1;
    }
}

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;

fn ethernet_header(ethertype: u16) -> Vec<u8> {
    let mut frame = vec![0x02, 0x00, 0x00, 0x00, 0x00, 0x02];
    frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame
}

fn ipv4_header(protocol: u8, payload_len: usize) -> Vec<u8> {
    let total_len = (20 + payload_len) as u16;
    let mut header = vec![0x45, 0x00];
    header.extend_from_slice(&total_len.to_be_bytes());
    header.extend_from_slice(&[0x12, 0x34, 0x40, 0x00, 64, protocol, 0x00, 0x00]);
    header.extend_from_slice(&[10, 0, 0, 1]);
    header.extend_from_slice(&[10, 0, 0, 2]);
    header
}

fn tcp_segment(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut segment = Vec::with_capacity(20 + payload.len());
    segment.extend_from_slice(&src_port.to_be_bytes());
    segment.extend_from_slice(&dst_port.to_be_bytes());
    segment.extend_from_slice(&1000u32.to_be_bytes());
    segment.extend_from_slice(&2000u32.to_be_bytes());
    // data offset 5 words, flags PSH|ACK
    segment.extend_from_slice(&[0x50, 0x18]);
    segment.extend_from_slice(&1024u16.to_be_bytes());
    segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    segment.extend_from_slice(payload);
    segment
}

/// Ethernet + IPv4 + TCP frame with a short payload.
pub fn tcp_frame(src_port: u16, dst_port: u16) -> Vec<u8> {
    tcp_frame_with_payload(src_port, dst_port, b"hello")
}

pub fn tcp_frame_with_payload(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let segment = tcp_segment(src_port, dst_port, payload);
    let mut frame = ethernet_header(ETHERTYPE_IPV4);
    frame.extend(ipv4_header(IPPROTO_TCP, segment.len()));
    frame.extend(segment);
    frame
}

/// Ethernet + IPv4 + UDP frame; carries no TCP layer.
pub fn udp_frame(src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut udp = Vec::new();
    udp.extend_from_slice(&src_port.to_be_bytes());
    udp.extend_from_slice(&dst_port.to_be_bytes());
    udp.extend_from_slice(&8u16.to_be_bytes());
    udp.extend_from_slice(&[0x00, 0x00]);
    let mut frame = ethernet_header(ETHERTYPE_IPV4);
    frame.extend(ipv4_header(IPPROTO_UDP, udp.len()));
    frame.extend(udp);
    frame
}

/// Ethernet frame carrying an IPv6 ethertype.
pub fn ipv6_frame() -> Vec<u8> {
    let mut frame = ethernet_header(ETHERTYPE_IPV6);
    frame.extend_from_slice(&[0x60; 40]);
    frame
}

/// IPv4 + TCP with no link header, as read from a tun interface.
pub fn raw_ip_tcp_packet(src_port: u16, dst_port: u16) -> Vec<u8> {
    tcp_frame(src_port, dst_port).split_off(14)
}

/// A TCP frame whose IPv4 header marks it as a fragment.
///
/// `flags_and_offset` is the 16-bit flags / fragment offset field.
pub fn fragmented_tcp_frame(src_port: u16, dst_port: u16, flags_and_offset: u16) -> Vec<u8> {
    let mut frame = tcp_frame(src_port, dst_port);
    frame[14 + 6..14 + 8].copy_from_slice(&flags_and_offset.to_be_bytes());
    frame
}

/// A TCP frame cut off in the middle of the TCP header.
pub fn truncated_tcp_frame(src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut frame = tcp_frame(src_port, dst_port);
    frame.truncate(14 + 20 + 10);
    frame
}
