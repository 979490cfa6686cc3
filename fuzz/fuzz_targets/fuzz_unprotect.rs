#![no_main]

use libfuzzer_sys::fuzz_target;
use milli_protect::crypto::rustcrypto::{Aes128GcmProvider, ChaCha20Provider};
use milli_protect::{unprotect_packet, PacketOpener};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let pn_offset = usize::from(data[0] % 24) + 1;
    let largest = (data[1] & 1 == 1).then_some(u64::from(data[1]) << 8);
    let packet = &data[2..];

    let aes = PacketOpener::from_secret(&Aes128GcmProvider, &[0x11; 32]).unwrap();
    let chacha = PacketOpener::from_secret(&ChaCha20Provider, &[0x22; 32]).unwrap();

    // Arbitrary bytes must never panic, only fail to decrypt.
    let mut buf = packet.to_vec();
    if let Ok(out) = unprotect_packet(&aes, &mut buf, pn_offset, largest) {
        let _ = out.payload(&buf);
    }

    let mut buf = packet.to_vec();
    if let Ok(out) = unprotect_packet(&chacha, &mut buf, pn_offset, largest) {
        let _ = out.payload(&buf);
    }
});
