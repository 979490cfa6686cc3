/// Length of the ciphertext sample fed to header protection.
pub const SAMPLE_LEN: usize = 16;

/// Length of the header protection mask.
pub const MASK_LEN: usize = 5;

/// Header protection cipher (RFC 9001 section 5.4).
///
/// Turns a ciphertext sample into a mask over the protected first-byte
/// bits and the packet number. Applying the mask is left to
/// [`protection::mask`](crate::protection::mask).
pub trait HeaderProtection {
    /// Header protection key length in bytes.
    const KEY_LEN: usize;

    /// Byte 0 of the mask covers the first header byte, bytes 1..5 the
    /// packet number.
    fn mask(&self, sample: &[u8; SAMPLE_LEN]) -> [u8; MASK_LEN];
}
