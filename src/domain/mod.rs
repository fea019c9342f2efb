//! Domain models for port-signature traffic observation.
//!
//! This module contains the core domain types that are independent
//! of any infrastructure concerns.

mod events;
mod layers;
mod stats;

pub use events::SignatureMatch;
pub use layers::{tcp_flags, EthernetLayer, Ipv4Layer, LayerKind, TcpLayer};
pub use stats::CaptureStats;
