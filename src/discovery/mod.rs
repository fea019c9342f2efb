//! Interface discovery.
//!
//! Races one prober per interface and hands the first interface that
//! carries the signature's traffic to the caller.

mod coordinator;
mod prober;
mod token;

pub use coordinator::{discover, Discovery, DiscoveryOptions, ProbeReport};
pub use prober::ProbeOutcome;
pub use token::CancellationToken;
