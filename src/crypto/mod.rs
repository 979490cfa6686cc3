//! Cryptographic traits and implementations for QUIC packet protection.
//!
//! Packet protection needs three primitives: an AEAD for the payload, a
//! header protection cipher for the packet number and flag bits, and HKDF to
//! expand traffic secrets into keys. The [`CryptoProvider`] trait bundles
//! these for one cipher suite, allowing pluggable implementations
//! (software via RustCrypto, or hardware-accelerated).

mod aead;
mod header_protection;
mod hkdf;

#[cfg(any(feature = "rustcrypto-chacha", feature = "rustcrypto-aes"))]
pub mod rustcrypto;

pub mod key_schedule;

pub use aead::{Aead, NONCE_LEN, TAG_LEN};
pub use header_protection::{HeaderProtection, MASK_LEN, SAMPLE_LEN};
pub use hkdf::Hkdf;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Error;

/// Largest AEAD or header protection key of any supported cipher suite.
pub const MAX_KEY_LEN: usize = 32;

/// Encryption level: determines which keys to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Initial,
    /// 0-RTT early data, protected with keys from a resumed session.
    ZeroRtt,
    Handshake,
    /// 1-RTT application data.
    Application,
}

impl Level {
    /// All levels in handshake order.
    pub const ALL: [Level; 4] = [
        Level::Initial,
        Level::ZeroRtt,
        Level::Handshake,
        Level::Application,
    ];

    pub const fn index(self) -> usize {
        match self {
            Level::Initial => 0,
            Level::ZeroRtt => 1,
            Level::Handshake => 2,
            Level::Application => 3,
        }
    }
}

/// Bundle of cryptographic primitives for one cipher suite.
pub trait CryptoProvider {
    type Aead: Aead;
    type Hkdf: Hkdf;
    type HeaderProtection: HeaderProtection;

    /// Create an AEAD instance from a key.
    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error>;

    /// Get an HKDF instance for key derivation.
    fn hkdf(&self) -> Self::Hkdf;

    /// Create a header protection cipher from a key.
    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error>;
}

/// Raw key material for one direction at one encryption level.
///
/// This is what the key schedule hands over. The bytes are wiped when the
/// value is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PacketKeys {
    key: [u8; MAX_KEY_LEN],
    key_len: usize,
    iv: [u8; NONCE_LEN],
    hp_key: [u8; MAX_KEY_LEN],
    hp_key_len: usize,
}

impl PacketKeys {
    /// Copy key material handed over by the key schedule.
    pub fn new(key: &[u8], iv: &[u8], hp_key: &[u8]) -> Result<Self, Error> {
        if key.len() > MAX_KEY_LEN {
            return Err(Error::KeyLength {
                expected: MAX_KEY_LEN,
                actual: key.len(),
            });
        }
        if hp_key.len() > MAX_KEY_LEN {
            return Err(Error::KeyLength {
                expected: MAX_KEY_LEN,
                actual: hp_key.len(),
            });
        }
        if iv.len() != NONCE_LEN {
            return Err(Error::KeyLength {
                expected: NONCE_LEN,
                actual: iv.len(),
            });
        }

        let mut keys = Self {
            key: [0u8; MAX_KEY_LEN],
            key_len: key.len(),
            iv: [0u8; NONCE_LEN],
            hp_key: [0u8; MAX_KEY_LEN],
            hp_key_len: hp_key.len(),
        };
        keys.key[..key.len()].copy_from_slice(key);
        keys.iv.copy_from_slice(iv);
        keys.hp_key[..hp_key.len()].copy_from_slice(hp_key);
        Ok(keys)
    }

    /// AEAD key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key[..self.key_len]
    }

    /// Base IV bytes.
    pub fn iv(&self) -> &[u8; NONCE_LEN] {
        &self.iv
    }

    /// Header protection key bytes.
    pub fn hp_key(&self) -> &[u8] {
        &self.hp_key[..self.hp_key_len]
    }
}

impl core::fmt::Debug for PacketKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PacketKeys")
            .field("key_len", &self.key_len)
            .field("hp_key_len", &self.hp_key_len)
            .finish_non_exhaustive()
    }
}

/// Base IV, XORed with the packet number to form the per-packet nonce.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Iv([u8; NONCE_LEN]);

impl Iv {
    pub const fn new(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// Compute the AEAD nonce for a given packet number.
    ///
    /// The packet number is encoded big-endian, left-padded to the IV
    /// length, and XORed with the IV.
    pub fn nonce(&self, packet_number: u64) -> [u8; NONCE_LEN] {
        let mut nonce = self.0;
        let pn_bytes = packet_number.to_be_bytes();
        for (n, p) in nonce[NONCE_LEN - 8..].iter_mut().zip(pn_bytes) {
            *n ^= p;
        }
        nonce
    }
}

impl core::fmt::Debug for Iv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Iv(..)")
    }
}

/// Keys for one direction (send or recv) at one encryption level.
pub struct DirectionalKeys<A: Aead, H: HeaderProtection> {
    pub aead: A,
    pub header_protection: H,
    pub iv: Iv,
}

impl<A: Aead, H: HeaderProtection> DirectionalKeys<A, H> {
    /// Instantiate the ciphers of `provider` from raw key material.
    pub fn new<C>(provider: &C, keys: &PacketKeys) -> Result<Self, Error>
    where
        C: CryptoProvider<Aead = A, HeaderProtection = H>,
    {
        Ok(Self {
            aead: provider.aead(keys.key())?,
            header_protection: provider.header_protection(keys.hp_key())?,
            iv: Iv::new(*keys.iv()),
        })
    }

    /// Compute the AEAD nonce for a given packet number.
    pub fn nonce(&self, packet_number: u64) -> [u8; NONCE_LEN] {
        self.iv.nonce(packet_number)
    }
}
