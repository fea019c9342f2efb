//! Frame decoding module.
//!
//! This module is responsible for turning raw captured frames into
//! decoded protocol layers.

mod layer_decoder;

pub use layer_decoder::{tcp_ports, LayerDecoder};
