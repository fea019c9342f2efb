//! Signature matching module.
//!
//! This module decides whether decoded TCP traffic belongs to the
//! protocol being watched, independent of capture or decoding.

mod port_signature;

pub use port_signature::{PortSignature, DEFAULT_PORT};
