//! Per-level packet number bookkeeping.
//!
//! A sealer never checks packet number uniqueness itself. `PacketNumberSpace`
//! is the single owner that hands out outgoing numbers, so the only way to
//! seal twice with the same number is to bypass it.

use crate::error::Error;
use crate::packet::number::{encode_pn, PacketNumberLen, MAX_PACKET_NUMBER};

/// Packet number state for one encryption level.
#[derive(Debug, Clone)]
pub struct PacketNumberSpace {
    next_pn: u64,
    limit: u64,
    largest_acked: Option<u64>,
    largest_received: Option<u64>,
    exhausted: bool,
}

impl Default for PacketNumberSpace {
    fn default() -> Self {
        Self::with_limit(MAX_PACKET_NUMBER)
    }
}

impl PacketNumberSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Space whose last usable packet number is `limit`, capped at 2^62 - 1.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            next_pn: 0,
            limit: limit.min(MAX_PACKET_NUMBER),
            largest_acked: None,
            largest_received: None,
            exhausted: false,
        }
    }

    /// Allocate the next outgoing packet number.
    ///
    /// Each number is returned at most once. Fails permanently once the
    /// limit has been handed out.
    pub fn next_packet_number(&mut self) -> Result<u64, Error> {
        if self.exhausted {
            return Err(Error::PacketNumberExhausted);
        }
        let pn = self.next_pn;
        if pn == self.limit {
            self.exhausted = true;
        } else {
            self.next_pn += 1;
        }
        Ok(pn)
    }

    /// Allocate the next packet number and write its truncated encoding.
    pub fn encode_next(&mut self, buf: &mut [u8]) -> Result<(u64, PacketNumberLen), Error> {
        if self.exhausted {
            return Err(Error::PacketNumberExhausted);
        }
        let len = encode_pn(self.next_pn, self.largest_acked, buf)?;
        let pn = self.next_packet_number()?;
        Ok((pn, len))
    }

    /// Peek at the number the next call to [`next_packet_number`](Self::next_packet_number)
    /// would return.
    pub fn peek(&self) -> Option<u64> {
        (!self.exhausted).then_some(self.next_pn)
    }

    /// Record an acknowledgment from the peer.
    pub fn on_ack(&mut self, pn: u64) {
        if self.largest_acked.map_or(true, |l| pn > l) {
            self.largest_acked = Some(pn);
        }
    }

    /// Record a packet that decrypted successfully.
    ///
    /// Only authenticated packets may move the reconstruction reference,
    /// otherwise a forged packet could desynchronize decoding.
    pub fn on_packet_received(&mut self, pn: u64) {
        if self.largest_received.map_or(true, |l| pn > l) {
            self.largest_received = Some(pn);
        }
    }

    pub fn largest_acked(&self) -> Option<u64> {
        self.largest_acked
    }

    /// Reference value for packet number reconstruction.
    pub fn largest_received(&self) -> Option<u64> {
        self.largest_received
    }
}
