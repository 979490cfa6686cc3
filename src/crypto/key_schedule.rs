//! QUIC key derivation (RFC 9001).
//!
//! The handshake owns the traffic secrets; this module only turns a secret
//! into packet protection keys. Provides HKDF-Expand-Label, Initial secret
//! derivation and the key update step for QUIC v1.

use zeroize::Zeroizing;

use crate::crypto::{Aead, CryptoProvider, HeaderProtection, Hkdf, PacketKeys, MAX_KEY_LEN, NONCE_LEN};
use crate::error::Error;

/// QUIC v1 Initial salt (RFC 9001 section 5.2).
pub const INITIAL_SALT_V1: [u8; 20] = [
    0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8, 0x0c,
    0xad, 0xcc, 0xbb, 0x7f, 0x0a,
];

/// Largest traffic secret of any supported hash (SHA-384).
pub const MAX_SECRET_LEN: usize = 48;

/// HKDF-Expand-Label as defined in RFC 8446 section 7.1, used by RFC 9001.
///
/// Constructs the HkdfLabel structure:
///   uint16 length = out.len()
///   opaque label<7..255> = "tls13 " + label
///   opaque context<0..255> = context
///
/// Then calls HKDF-Expand(secret, HkdfLabel, out.len()).
pub fn hkdf_expand_label<H: Hkdf>(
    hkdf: &H,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    out: &mut [u8],
) -> Result<(), Error> {
    const PREFIX: &[u8] = b"tls13 ";
    let full_label_len = PREFIX.len() + label.len();
    let info_len = 2 + 1 + full_label_len + 1 + context.len();

    // 80 bytes is ample for any QUIC label.
    let mut info = [0u8; 80];
    if info_len > info.len() {
        return Err(Error::Crypto);
    }

    info[..2].copy_from_slice(&(out.len() as u16).to_be_bytes());
    info[2] = full_label_len as u8;
    info[3..3 + PREFIX.len()].copy_from_slice(PREFIX);
    info[3 + PREFIX.len()..3 + full_label_len].copy_from_slice(label);
    info[3 + full_label_len] = context.len() as u8;
    info[4 + full_label_len..info_len].copy_from_slice(context);

    hkdf.expand(secret, &info[..info_len], out)
}

/// Derive the QUIC v1 initial secrets from a client Destination Connection ID.
///
/// Initial packets always use SHA-256, so both outputs are 32 bytes.
pub fn derive_initial_secrets<H: Hkdf>(
    hkdf: &H,
    dcid: &[u8],
    client_secret: &mut [u8],
    server_secret: &mut [u8],
) -> Result<(), Error> {
    let mut initial_secret = Zeroizing::new([0u8; 32]);
    hkdf.extract(&INITIAL_SALT_V1, dcid, &mut initial_secret[..])?;

    hkdf_expand_label(hkdf, &initial_secret[..], b"client in", &[], client_secret)?;
    hkdf_expand_label(hkdf, &initial_secret[..], b"server in", &[], server_secret)?;
    Ok(())
}

/// Expand a traffic secret into the three packet protection values.
///
/// `key` length should be the AEAD key size (16 for AES-128-GCM, 32 for
/// AES-256-GCM and ChaCha20), `iv` is 12 bytes, `hp_key` is the header
/// protection key size.
pub fn derive_packet_keys<H: Hkdf>(
    hkdf: &H,
    secret: &[u8],
    key: &mut [u8],
    iv: &mut [u8],
    hp_key: &mut [u8],
) -> Result<(), Error> {
    hkdf_expand_label(hkdf, secret, b"quic key", &[], key)?;
    hkdf_expand_label(hkdf, secret, b"quic iv", &[], iv)?;
    hkdf_expand_label(hkdf, secret, b"quic hp", &[], hp_key)?;
    Ok(())
}

/// Derive the next-generation application traffic secret for QUIC Key Update.
///
/// Per RFC 9001 section 6.1:
///   new_secret = HKDF-Expand-Label(current_secret, "quic ku", "", Hash.length)
///
/// The header protection key is not updated; callers carry the current
/// `hp_key` over into the new generation.
pub fn derive_next_application_secret<H: Hkdf>(
    hkdf: &H,
    current_secret: &[u8],
    new_secret: &mut [u8],
) -> Result<(), Error> {
    hkdf_expand_label(hkdf, current_secret, b"quic ku", &[], new_secret)
}

/// Derive complete [`PacketKeys`] for the cipher suite of `C` from a
/// traffic secret.
pub fn packet_keys_from_secret<C: CryptoProvider>(
    hkdf: &C::Hkdf,
    secret: &[u8],
) -> Result<PacketKeys, Error> {
    let mut key = Zeroizing::new([0u8; MAX_KEY_LEN]);
    let mut iv = Zeroizing::new([0u8; NONCE_LEN]);
    let mut hp = Zeroizing::new([0u8; MAX_KEY_LEN]);

    let key_len = C::Aead::KEY_LEN;
    let hp_key_len = C::HeaderProtection::KEY_LEN;

    derive_packet_keys(
        hkdf,
        secret,
        &mut key[..key_len],
        &mut iv[..],
        &mut hp[..hp_key_len],
    )?;

    PacketKeys::new(&key[..key_len], &iv[..], &hp[..hp_key_len])
}

#[cfg(all(test, feature = "rustcrypto-aes"))]
mod tests {
    use super::*;
    use hex_literal::hex;

    use crate::crypto::rustcrypto::{Aes128GcmProvider, HkdfSha256};

    // ---- RFC 9001 Appendix A.1 test vectors ----

    #[test]
    fn initial_secrets_rfc9001_a1() {
        let hkdf = HkdfSha256;
        let dcid = hex!("8394c8f03e515708");

        let mut client_secret = [0u8; 32];
        let mut server_secret = [0u8; 32];
        derive_initial_secrets(&hkdf, &dcid, &mut client_secret, &mut server_secret).unwrap();

        assert_eq!(
            client_secret,
            hex!("c00cf151ca5be075ed0ebfb5c80323c42d6b7db67881289af4008f1f6c357aea")
        );
        assert_eq!(
            server_secret,
            hex!("3c199828fd139efd216c155ad844cc81fb82fa8d7446fa7d78be803acdda951b")
        );
    }

    #[test]
    fn initial_client_keys_rfc9001_a1() {
        let hkdf = HkdfSha256;
        let client_secret =
            hex!("c00cf151ca5be075ed0ebfb5c80323c42d6b7db67881289af4008f1f6c357aea");

        let mut key = [0u8; 16];
        let mut iv = [0u8; 12];
        let mut hp = [0u8; 16];
        derive_packet_keys(&hkdf, &client_secret, &mut key, &mut iv, &mut hp).unwrap();

        assert_eq!(key, hex!("1f369613dd76d5467730efcbe3b1a22d"));
        assert_eq!(iv, hex!("fa044b2f42a3fd3b46fb255c"));
        assert_eq!(hp, hex!("9f50449e04a0e810283a1e9933adedd2"));
    }

    #[test]
    fn initial_server_keys_rfc9001_a1() {
        let hkdf = HkdfSha256;
        let server_secret =
            hex!("3c199828fd139efd216c155ad844cc81fb82fa8d7446fa7d78be803acdda951b");

        let keys = packet_keys_from_secret::<Aes128GcmProvider>(&hkdf, &server_secret).unwrap();

        assert_eq!(keys.key(), hex!("cf3a5331653c364c88f0f379b6067e37"));
        assert_eq!(keys.iv(), &hex!("0ac1493ca1905853b0bba03e"));
        assert_eq!(keys.hp_key(), hex!("c206b8d9b9f0f37644430b490eeaa314"));
    }

    #[test]
    fn hkdf_expand_label_client_in() {
        let hkdf = HkdfSha256;
        let dcid = hex!("8394c8f03e515708");
        let mut initial_secret = [0u8; 32];
        hkdf.extract(&INITIAL_SALT_V1, &dcid, &mut initial_secret)
            .unwrap();

        let mut client_secret = [0u8; 32];
        hkdf_expand_label(&hkdf, &initial_secret, b"client in", &[], &mut client_secret).unwrap();

        assert_eq!(
            client_secret,
            hex!("c00cf151ca5be075ed0ebfb5c80323c42d6b7db67881289af4008f1f6c357aea")
        );
    }

    #[test]
    fn hkdf_expand_label_rejects_oversized_label() {
        let hkdf = HkdfSha256;
        let mut out = [0u8; 16];
        let label = [b'x'; 80];
        assert_eq!(
            hkdf_expand_label(&hkdf, &[0u8; 32], &label, &[], &mut out),
            Err(Error::Crypto)
        );
    }

    #[cfg(feature = "rustcrypto-chacha")]
    #[test]
    fn chacha_keys_are_full_length() {
        use crate::crypto::rustcrypto::ChaCha20Provider;

        let keys = packet_keys_from_secret::<ChaCha20Provider>(&HkdfSha256, &[0x11; 32]).unwrap();
        assert_eq!(keys.key().len(), 32);
        assert_eq!(keys.hp_key().len(), 32);
        assert_ne!(keys.key(), keys.hp_key());
    }

    #[test]
    fn aes256_keys_from_sha384_secret() {
        use crate::crypto::rustcrypto::{Aes256GcmProvider, HkdfSha384};

        let keys = packet_keys_from_secret::<Aes256GcmProvider>(&HkdfSha384, &[0x22; 48]).unwrap();
        assert_eq!(keys.key().len(), 32);
        assert_eq!(keys.hp_key().len(), 32);
    }

    // ---- Key Update derivation (RFC 9001 section 6.1) ----

    #[test]
    fn derive_next_application_secret_produces_different_secret() {
        let hkdf = HkdfSha256;
        let current_secret =
            hex!("c00cf151ca5be075ed0ebfb5c80323c42d6b7db67881289af4008f1f6c357aea");

        let mut new_secret = [0u8; 32];
        derive_next_application_secret(&hkdf, &current_secret, &mut new_secret).unwrap();

        assert_ne!(new_secret, current_secret);
        assert_ne!(new_secret, [0u8; 32]);
    }

    #[test]
    fn key_update_secret_rfc9001_a5() {
        let secret = hex!("9ac312a7f877468ebe69422748ad00a15443f18203a07d6060f688f30f21632b");
        let mut next = [0u8; 32];
        derive_next_application_secret(&HkdfSha256, &secret, &mut next).unwrap();
        assert_eq!(
            next,
            hex!("1223504755036d556342ee9361d253421a826c9ecdf3c7148684b36b714881f9")
        );
    }

    #[test]
    fn derive_next_application_secret_chain() {
        let hkdf = HkdfSha256;
        let gen0 = [0xAA; 32];
        let mut gen1 = [0u8; 32];
        let mut gen2 = [0u8; 32];

        derive_next_application_secret(&hkdf, &gen0, &mut gen1).unwrap();
        derive_next_application_secret(&hkdf, &gen1, &mut gen2).unwrap();

        assert_ne!(gen0, gen1);
        assert_ne!(gen1, gen2);
        assert_ne!(gen0, gen2);

        let mut again = [0u8; 32];
        derive_next_application_secret(&hkdf, &gen0, &mut again).unwrap();
        assert_eq!(again, gen1);
    }
}
