use crate::crypto::Level;

/// Top-level crate error.
///
/// Every way an incoming packet can fail to decrypt collapses into
/// [`Error::Decrypt`]. Callers drop the packet and carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Key or IV of the wrong length handed over by the key schedule.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },
    /// The cryptographic backend failed.
    #[error("cryptographic error")]
    Crypto,
    /// Packet could not be decrypted or authenticated.
    #[error("packet decryption failed")]
    Decrypt,
    /// Caller-provided buffer too small.
    #[error("buffer too small, need {needed} bytes")]
    BufferTooSmall { needed: usize },
    /// Outgoing packet is too short to take a header protection sample.
    #[error("packet too short for header protection sample, need {needed} bytes")]
    SampleUnavailable { needed: usize },
    /// All packet numbers of the space have been used.
    #[error("packet number space exhausted")]
    PacketNumberExhausted,
    /// No keys are installed for the requested encryption level.
    #[error("no keys available at {0:?} level")]
    KeysUnavailable(Level),
    /// Operation not valid in the current state, such as retiring keys
    /// that were never installed.
    #[error("invalid state for the requested operation")]
    InvalidState,
}
