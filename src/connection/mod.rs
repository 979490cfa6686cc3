//! Key lifecycle of a QUIC connection.
//!
//! Keys move through Initial, Handshake and 1-RTT levels, plus a 0-RTT level
//! on resumption. Each level's keys live in a [`KeyEpoch`]; 1-RTT keys can be
//! updated in place, with the previous phase kept briefly for reordered
//! packets.

mod epoch;
mod keys;

pub use epoch::{EpochState, KeyEpoch};
pub use keys::ConnectionKeys;

use crate::packet::MAX_PACKET_NUMBER;
use crate::Instant;

// ---------------------------------------------------------------------------
// Configuration trait
// ---------------------------------------------------------------------------

/// Compile-time configuration for connection key management.
pub trait KeyConfig {
    /// How long a retired epoch keeps accepting packets, in microseconds.
    ///
    /// RFC 9001 section 4.9 recommends three times the current PTO.
    const RETIRE_DELAY: Instant;
    /// Last packet number handed out in each packet number space.
    const MAX_PACKET_NUMBER: u64;
}

/// Default configuration suitable for most use cases.
pub struct DefaultConfig;

impl KeyConfig for DefaultConfig {
    const RETIRE_DELAY: Instant = 3_000_000;
    const MAX_PACKET_NUMBER: u64 = MAX_PACKET_NUMBER;
}

/// Which end of the connection we are.
///
/// Decides which Initial secret is used for sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}
