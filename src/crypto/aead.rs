use crate::error::Error;

/// Nonce length in bytes (always 12 for QUIC).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes (always 16 for QUIC v1 suites).
pub const TAG_LEN: usize = 16;

/// AEAD used for packet payload protection (RFC 9001 section 5.3).
///
/// Implementations are built once per key and then only borrowed, so a
/// single instance may serve several threads.
pub trait Aead {
    /// Key length in bytes.
    const KEY_LEN: usize;
    /// Authentication tag length in bytes.
    const TAG_LEN: usize;

    /// Encrypt `buf[..payload_len]` and write the tag right after it.
    ///
    /// Needs `buf.len() >= payload_len + TAG_LEN`. Returns the sealed length.
    fn seal_in_place(
        &self,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize, Error>;

    /// Verify and decrypt `buf[..ciphertext_len]` (ciphertext then tag).
    ///
    /// Any failure is [`Error::Decrypt`]. Returns the plaintext length.
    fn open_in_place(
        &self,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        buf: &mut [u8],
        ciphertext_len: usize,
    ) -> Result<usize, Error>;
}
