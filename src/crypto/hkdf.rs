use crate::error::Error;

/// HMAC-based Key Derivation Function (RFC 5869).
///
/// Expands traffic secrets into packet protection keys, IVs and
/// header protection keys (RFC 9001 section 5.1).
pub trait Hkdf {
    /// Hash output length in bytes (32 for SHA-256, 48 for SHA-384).
    const HASH_LEN: usize;

    /// HKDF-Extract into `prk[..HASH_LEN]`.
    fn extract(&self, salt: &[u8], ikm: &[u8], prk: &mut [u8]) -> Result<(), Error>;

    /// HKDF-Expand a pseudorandom key with `info` into `okm`.
    fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<(), Error>;
}
