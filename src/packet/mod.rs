//! Packet-level plumbing around protection.
//!
//! The framing layer owns header layout; this module only knows what
//! header protection needs: the header form bit, the packet number field,
//! and where the ciphertext sample lives.

pub mod number;
pub mod space;

pub use number::{
    decode_pn, encode_pn, pn_length, PacketNumberLen, PacketNumberWindow, MAX_PACKET_NUMBER,
    MAX_PN_LEN,
};
pub use space::PacketNumberSpace;

use crate::crypto::SAMPLE_LEN;

/// Offset of the header protection sample from the start of the packet
/// number field (RFC 9001 section 5.4.2).
pub const SAMPLE_OFFSET: usize = 4;

/// Bit 7 of the first byte: set for long headers.
pub const LONG_HEADER_FORM: u8 = 0x80;

/// Header form, which decides how many first-byte bits are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderForm {
    /// Initial, 0-RTT and Handshake packets.
    Long,
    /// 1-RTT packets.
    Short,
}

impl HeaderForm {
    /// Read the form bit. The bit itself is never protected.
    pub const fn of(first_byte: u8) -> Self {
        if first_byte & LONG_HEADER_FORM != 0 {
            HeaderForm::Long
        } else {
            HeaderForm::Short
        }
    }

    /// First-byte bits covered by header protection.
    ///
    /// Long headers protect the reserved and packet number length bits;
    /// short headers additionally protect the key phase bit.
    pub const fn protected_bits(self) -> u8 {
        match self {
            HeaderForm::Long => 0x0f,
            HeaderForm::Short => 0x1f,
        }
    }
}

/// Offset of the header protection sample for a packet number at `pn_offset`.
pub const fn sample_offset(pn_offset: usize) -> usize {
    pn_offset + SAMPLE_OFFSET
}

/// Minimum packet length that allows a sample for a packet number at
/// `pn_offset`.
pub const fn min_sampled_len(pn_offset: usize) -> usize {
    sample_offset(pn_offset) + SAMPLE_LEN
}

/// Copy the header protection sample out of a packet.
///
/// Returns `None` if the packet is too short.
pub fn sample(packet: &[u8], pn_offset: usize) -> Option<[u8; SAMPLE_LEN]> {
    let start = sample_offset(pn_offset);
    let bytes = packet.get(start..start + SAMPLE_LEN)?;
    let mut sample = [0u8; SAMPLE_LEN];
    sample.copy_from_slice(bytes);
    Some(sample)
}
