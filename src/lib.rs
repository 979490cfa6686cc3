#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod error;

pub mod crypto;
pub mod packet;
pub mod protection;

pub mod connection;
pub use connection::{ConnectionKeys, DefaultConfig, EpochState, KeyConfig, KeyEpoch, Role};

pub use crypto::Level;
pub use error::Error;
pub use protection::{protect_packet, unprotect_packet, Opener, PacketOpener, PacketSealer, Sealer, Unprotected};

/// Timestamp in microseconds from an arbitrary epoch.
///
/// Only used to bound how long retiring keys stay around.
pub type Instant = u64;
