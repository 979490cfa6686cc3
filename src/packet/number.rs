//! QUIC packet number encoding and decoding (RFC 9000 section 17.1, A.2, A.3).

use crate::error::Error;

/// Largest packet number an endpoint may use (2^62 - 1).
pub const MAX_PACKET_NUMBER: u64 = (1 << 62) - 1;

/// Longest on-wire packet number encoding in bytes.
pub const MAX_PN_LEN: usize = 4;

/// Fixed window over the packet number field.
///
/// Header protection always has at least four bytes after the start of the
/// packet number (the sample starts there), so the window is four bytes
/// even when fewer of them belong to the packet number.
pub type PacketNumberWindow = [u8; MAX_PN_LEN];

/// On-wire length of a truncated packet number (1-4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PacketNumberLen(u8);

impl PacketNumberLen {
    /// Decode from the two low bits of an unprotected first byte.
    pub const fn from_first_byte(first_byte: u8) -> Self {
        Self((first_byte & 0x03) + 1)
    }

    pub const fn new(len: usize) -> Option<Self> {
        match len {
            1..=MAX_PN_LEN => Some(Self(len as u8)),
            _ => None,
        }
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// The two first-byte bits encoding this length.
    pub const fn first_byte_bits(self) -> u8 {
        self.0 - 1
    }

    /// Read the truncated packet number from the start of `window`.
    pub fn read(self, window: &PacketNumberWindow) -> u32 {
        window[..self.get()]
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    }
}

/// Determine how many bytes are needed to encode `full_pn` given `largest_acked`.
///
/// Chooses the smallest encoding that is at least twice the distance from
/// `largest_acked` to `full_pn`, as recommended by RFC 9000 section A.2.
pub fn pn_length(full_pn: u64, largest_acked: Option<u64>) -> PacketNumberLen {
    let num_unacked = match largest_acked {
        Some(acked) if full_pn > acked => full_pn - acked,
        Some(_) => 1,
        None => full_pn + 1,
    };
    let len = if num_unacked < (1 << 7) {
        1
    } else if num_unacked < (1 << 15) {
        2
    } else if num_unacked < (1 << 23) {
        3
    } else {
        4
    };
    PacketNumberLen(len)
}

/// Encode a packet number using minimal bytes.
///
/// Writes the truncated packet number to `buf` in big-endian order.
/// Returns the encoded length.
pub fn encode_pn(
    full_pn: u64,
    largest_acked: Option<u64>,
    buf: &mut [u8],
) -> Result<PacketNumberLen, Error> {
    let len = pn_length(full_pn, largest_acked);
    let n = len.get();
    if buf.len() < n {
        return Err(Error::BufferTooSmall { needed: n });
    }

    let pn_bytes = full_pn.to_be_bytes();
    buf[..n].copy_from_slice(&pn_bytes[8 - n..]);

    Ok(len)
}

/// Reconstruct a full packet number from its truncated form.
///
/// `largest_pn` is the largest packet number successfully processed in
/// this packet number space, or `None` if nothing has been received yet.
/// Values above 2^62 - 1 cannot occur on the wire and are clamped to it.
/// Picks the candidate closest to the next expected value (RFC 9000
/// section A.3).
pub fn decode_pn(truncated_pn: u32, pn_len: PacketNumberLen, largest_pn: Option<u64>) -> u64 {
    let pn_nbits = (pn_len.get() as u64) * 8;
    let pn_win = 1u64 << pn_nbits;
    let pn_hwin = pn_win / 2;
    let pn_mask = pn_win - 1;

    let expected_pn = largest_pn.map_or(0, |pn| pn.min(MAX_PACKET_NUMBER) + 1);

    let candidate_pn = (expected_pn & !pn_mask) | (truncated_pn as u64 & pn_mask);

    if candidate_pn + pn_hwin <= expected_pn && candidate_pn + pn_win <= (1u64 << 62) {
        candidate_pn + pn_win
    } else if candidate_pn > expected_pn + pn_hwin && candidate_pn >= pn_win {
        candidate_pn - pn_win
    } else {
        candidate_pn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len(n: usize) -> PacketNumberLen {
        PacketNumberLen::new(n).unwrap()
    }

    #[test]
    fn pn_encode_decode_basic() {
        let mut buf = [0u8; 4];
        let l = encode_pn(0, None, &mut buf).unwrap();
        assert_eq!(l.get(), 1);
        assert_eq!(buf[0], 0);
        assert_eq!(decode_pn(0, l, None), 0);
    }

    #[test]
    fn pn_encode_decode_small_gap() {
        let mut buf = [0u8; 4];
        let l = encode_pn(10, Some(5), &mut buf).unwrap();
        assert_eq!(l.get(), 1);
        assert_eq!(decode_pn(buf[0] as u32, l, Some(5)), 10);
    }

    #[test]
    fn pn_encode_decode_medium_gap() {
        let mut buf = [0u8; 4];
        let l = encode_pn(256, Some(0), &mut buf).unwrap();
        assert_eq!(l.get(), 2);
        let truncated = u16::from_be_bytes([buf[0], buf[1]]) as u32;
        assert_eq!(decode_pn(truncated, l, Some(0)), 256);
    }

    #[test]
    fn pn_encode_decode_large_gap() {
        let mut buf = [0u8; 4];
        let l = encode_pn(0x1_0000, Some(0), &mut buf).unwrap();
        assert_eq!(l.get(), 3);
        let truncated = u32::from_be_bytes([0, buf[0], buf[1], buf[2]]);
        assert_eq!(decode_pn(truncated, l, Some(0)), 0x1_0000);
    }

    #[test]
    fn encode_pn_buffer_too_small() {
        let mut buf = [0u8; 1];
        assert_eq!(
            encode_pn(0x1_0000, Some(0), &mut buf),
            Err(Error::BufferTooSmall { needed: 3 })
        );
    }

    #[test]
    fn pn_decode_rfc_example() {
        // RFC 9000 Appendix A.3
        assert_eq!(decode_pn(0x9b32, len(2), Some(0xa82f30ea)), 0xa82f9b32);
    }

    #[test]
    fn pn_decode_wraparound() {
        assert_eq!(decode_pn(0x02, len(1), Some(0xff)), 0x102);
    }

    #[test]
    fn pn_decode_reordered_packet_below_expected() {
        // Expected 0x101, truncated 0xfe is closer as 0xfe than 0x1fe.
        assert_eq!(decode_pn(0xfe, len(1), Some(0x100)), 0xfe);
    }

    #[test]
    fn pn_decode_clamps_out_of_range_largest() {
        for len in [len(1), len(2), len(4)] {
            for truncated in [0, 1, 0xff] {
                let clamped = decode_pn(truncated, len, Some(MAX_PACKET_NUMBER));
                assert_eq!(decode_pn(truncated, len, Some(u64::MAX)), clamped);
                assert_eq!(decode_pn(truncated, len, Some(1 << 62)), clamped);
            }
        }
    }

    #[test]
    fn pn_decode_nothing_received() {
        assert_eq!(decode_pn(0x00, len(1), None), 0);
        assert_eq!(decode_pn(0x01, len(1), None), 1);
        assert_eq!(decode_pn(0x01, len(1), Some(0)), 1);
    }

    #[test]
    fn pn_length_boundaries() {
        assert_eq!(pn_length(10, Some(5)).get(), 1);
        assert_eq!(pn_length(127, Some(0)).get(), 1);
        assert_eq!(pn_length(128, Some(0)).get(), 2);
        assert_eq!(pn_length(32767, Some(0)).get(), 2);
        assert_eq!(pn_length(32768, Some(0)).get(), 3);
        assert_eq!(pn_length(8388607, Some(0)).get(), 3);
        assert_eq!(pn_length(8388608, Some(0)).get(), 4);
        // Nothing acknowledged yet: distance counts from -1.
        assert_eq!(pn_length(126, None).get(), 1);
        assert_eq!(pn_length(127, None).get(), 2);
    }

    #[test]
    fn length_from_first_byte() {
        assert_eq!(PacketNumberLen::from_first_byte(0xc0).get(), 1);
        assert_eq!(PacketNumberLen::from_first_byte(0x41).get(), 2);
        assert_eq!(PacketNumberLen::from_first_byte(0x42).get(), 3);
        assert_eq!(PacketNumberLen::from_first_byte(0xc3).get(), 4);
        assert_eq!(len(3).first_byte_bits(), 0b10);
        assert!(PacketNumberLen::new(0).is_none());
        assert!(PacketNumberLen::new(5).is_none());
    }

    #[test]
    fn read_truncated_from_window() {
        let window = [0x00, 0xbf, 0xf4, 0x99];
        assert_eq!(len(3).read(&window), 0x00bff4);
        assert_eq!(len(1).read(&window), 0x00);
        assert_eq!(len(4).read(&window), 0x00bff499);
    }
}
