//! Packet protection: AEAD payload sealing plus header protection.
//!
//! A [`Sealer`] protects outgoing packets for one direction and level, an
//! [`Opener`] removes protection from incoming ones. The primitives are
//! usable on their own, but the header protection sample is taken from the
//! ciphertext, so sealing must happen before the header is masked.
//! [`protect_packet`] and [`unprotect_packet`] sequence the steps so call
//! sites cannot get the order wrong.
//!
//! # Caller contract
//!
//! - A packet number is never sealed twice under the same keys.
//! - The sample handed to [`Sealer::encrypt_header`] comes from the output
//!   of the [`Sealer::seal`] call for the same packet.
//!
//! Neither condition is detectable here; violating them silently breaks
//! confidentiality or corrupts the header.

pub mod mask;
mod opener;
mod sealer;

pub use opener::PacketOpener;
pub use sealer::PacketSealer;

use crate::crypto::SAMPLE_LEN;
use crate::error::Error;
use crate::packet::{self, decode_pn, PacketNumberLen, PacketNumberWindow, MAX_PN_LEN};

/// Sending half of packet protection.
pub trait Sealer {
    /// Bytes the AEAD tag adds to every payload.
    fn overhead(&self) -> usize;

    /// Encrypt `buf[..payload_len]` in place and append the tag.
    ///
    /// `aad` is the unprotected header, packet number included. Returns
    /// `payload_len + overhead()`.
    fn seal_in_place(
        &self,
        buf: &mut [u8],
        payload_len: usize,
        packet_number: u64,
        aad: &[u8],
    ) -> Result<usize, Error>;

    /// Encrypt a copy of `payload` into `out`.
    ///
    /// `payload` is left untouched. Returns `payload.len() + overhead()`.
    fn seal(
        &self,
        out: &mut [u8],
        payload: &[u8],
        packet_number: u64,
        aad: &[u8],
    ) -> Result<usize, Error> {
        let needed = payload.len() + self.overhead();
        if out.len() < needed {
            return Err(Error::BufferTooSmall { needed });
        }
        out[..payload.len()].copy_from_slice(payload);
        self.seal_in_place(out, payload.len(), packet_number, aad)
    }

    /// Apply header protection in place.
    ///
    /// `pn_window` starts at the packet number; only as many bytes as the
    /// still-unprotected `first_byte` announces are masked.
    fn encrypt_header(
        &self,
        sample: &[u8; SAMPLE_LEN],
        first_byte: &mut u8,
        pn_window: &mut PacketNumberWindow,
    );
}

/// Receiving half of packet protection.
pub trait Opener {
    /// Verify and decrypt `buf[..ciphertext_len]` in place.
    ///
    /// Returns the plaintext length. Every failure is [`Error::Decrypt`].
    fn open_in_place(
        &self,
        buf: &mut [u8],
        ciphertext_len: usize,
        packet_number: u64,
        aad: &[u8],
    ) -> Result<usize, Error>;

    /// Verify and decrypt `ciphertext` into `out`.
    ///
    /// An `out` shorter than `ciphertext` is a caller bug and reported as
    /// [`Error::BufferTooSmall`] before any decryption. Failures of the
    /// packet itself are [`Error::Decrypt`].
    fn open(
        &self,
        out: &mut [u8],
        ciphertext: &[u8],
        packet_number: u64,
        aad: &[u8],
    ) -> Result<usize, Error> {
        if out.len() < ciphertext.len() {
            return Err(Error::BufferTooSmall {
                needed: ciphertext.len(),
            });
        }
        out[..ciphertext.len()].copy_from_slice(ciphertext);
        self.open_in_place(out, ciphertext.len(), packet_number, aad)
    }

    /// Remove header protection in place.
    ///
    /// Returns the packet number length decoded from the unmasked first
    /// byte; exactly that many bytes of `pn_window` are unmasked.
    fn decrypt_header(
        &self,
        sample: &[u8; SAMPLE_LEN],
        first_byte: &mut u8,
        pn_window: &mut PacketNumberWindow,
    ) -> PacketNumberLen;
}

/// Split a packet into its first byte and the packet number window.
fn header_parts(
    packet: &mut [u8],
    pn_offset: usize,
) -> Option<(&mut u8, &mut PacketNumberWindow)> {
    if pn_offset == 0 {
        return None;
    }
    let (first, rest) = packet.split_first_mut()?;
    let window = rest.get_mut(pn_offset - 1..pn_offset - 1 + MAX_PN_LEN)?;
    Some((first, window.try_into().ok()?))
}

/// Seal a packet and apply header protection.
///
/// `packet[..pn_offset]` holds the unprotected header and is followed by
/// the truncated packet number (its length encoded in the first byte),
/// `payload_len` bytes of plaintext, and room for the tag.
///
/// Returns the length of the protected packet. Fails with
/// [`Error::SampleUnavailable`] if the packet is too short to sample; the
/// caller must pad the payload.
pub fn protect_packet<S: Sealer + ?Sized>(
    sealer: &S,
    packet: &mut [u8],
    pn_offset: usize,
    payload_len: usize,
    packet_number: u64,
) -> Result<usize, Error> {
    if pn_offset == 0 {
        return Err(Error::InvalidState);
    }
    let first_byte = *packet.first().ok_or(Error::BufferTooSmall {
        needed: pn_offset + 1,
    })?;
    let header_len = pn_offset + PacketNumberLen::from_first_byte(first_byte).get();
    let total = header_len + payload_len + sealer.overhead();
    if packet.len() < total {
        return Err(Error::BufferTooSmall { needed: total });
    }
    let min_len = packet::min_sampled_len(pn_offset);
    if total < min_len {
        return Err(Error::SampleUnavailable { needed: min_len });
    }

    let (header, body) = packet.split_at_mut(header_len);
    let sealed = sealer.seal_in_place(body, payload_len, packet_number, header)?;
    debug_assert_eq!(header_len + sealed, total);

    let packet = &mut packet[..total];
    let sample = packet::sample(packet, pn_offset).ok_or(Error::SampleUnavailable { needed: min_len })?;
    let (first_byte, pn_window) = header_parts(packet, pn_offset).ok_or(Error::InvalidState)?;
    sealer.encrypt_header(&sample, first_byte, pn_window);

    Ok(total)
}

/// Result of removing protection from a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unprotected {
    /// Reconstructed full packet number.
    pub packet_number: u64,
    /// Length of the header including the packet number.
    pub header_len: usize,
    /// Length of the decrypted payload following the header.
    pub payload_len: usize,
}

impl Unprotected {
    /// The decrypted payload within the packet buffer.
    pub fn payload<'a>(&self, packet: &'a [u8]) -> &'a [u8] {
        &packet[self.header_len..self.header_len + self.payload_len]
    }
}

/// Remove header protection and decrypt a packet in place.
///
/// `packet` must span exactly one packet (for long headers, as bounded by
/// its Length field). `largest_pn` is the largest packet number
/// successfully processed at this level, used to reconstruct the full
/// packet number.
///
/// Every failure, including a packet too short to sample, is reported as
/// [`Error::Decrypt`]. On failure the buffer contents are unspecified and
/// the packet must be dropped.
pub fn unprotect_packet<O: Opener + ?Sized>(
    opener: &O,
    packet: &mut [u8],
    pn_offset: usize,
    largest_pn: Option<u64>,
) -> Result<Unprotected, Error> {
    let sample = packet::sample(packet, pn_offset).ok_or(Error::Decrypt)?;
    let (first_byte, pn_window) = header_parts(packet, pn_offset).ok_or(Error::Decrypt)?;
    let pn_len = opener.decrypt_header(&sample, first_byte, pn_window);
    let packet_number = decode_pn(pn_len.read(pn_window), pn_len, largest_pn);

    let header_len = pn_offset + pn_len.get();
    let (header, body) = packet.split_at_mut(header_len);
    let ciphertext_len = body.len();
    let payload_len = opener
        .open_in_place(body, ciphertext_len, packet_number, header)
        .inspect_err(|_| {
            tracing::trace!(len = header_len + ciphertext_len, "dropping undecryptable packet");
        })?;

    Ok(Unprotected {
        packet_number,
        header_len,
        payload_len,
    })
}
