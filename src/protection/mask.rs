//! Byte-level application of the header protection mask (RFC 9001 section 5.4.1).

use crate::crypto::MASK_LEN;
use crate::packet::{HeaderForm, PacketNumberLen, PacketNumberWindow};

/// Mask an unprotected header.
///
/// The packet number length is read from `first_byte` before it is masked.
pub fn protect_header(
    mask: &[u8; MASK_LEN],
    first_byte: &mut u8,
    pn_window: &mut PacketNumberWindow,
) -> PacketNumberLen {
    let pn_len = PacketNumberLen::from_first_byte(*first_byte);
    *first_byte ^= mask[0] & HeaderForm::of(*first_byte).protected_bits();
    mask_packet_number(mask, pn_window, pn_len);
    pn_len
}

/// Remove the mask from a protected header.
///
/// The first byte is unmasked first; the packet number length it then
/// carries decides how many packet number bytes are unmasked.
pub fn unprotect_header(
    mask: &[u8; MASK_LEN],
    first_byte: &mut u8,
    pn_window: &mut PacketNumberWindow,
) -> PacketNumberLen {
    *first_byte ^= mask[0] & HeaderForm::of(*first_byte).protected_bits();
    let pn_len = PacketNumberLen::from_first_byte(*first_byte);
    mask_packet_number(mask, pn_window, pn_len);
    pn_len
}

fn mask_packet_number(mask: &[u8; MASK_LEN], pn_window: &mut PacketNumberWindow, pn_len: PacketNumberLen) {
    for (b, m) in pn_window[..pn_len.get()].iter_mut().zip(&mask[1..]) {
        *b ^= m;
    }
}
