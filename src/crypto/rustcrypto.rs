//! RustCrypto-backed implementations of the QUIC crypto traits.

use aes::cipher::consts::U16;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::typenum::Unsigned;
use aes::cipher::{BlockEncrypt, BlockSizeUser, KeyInit, KeySizeUser};

use crate::crypto::{
    Aead as AeadTrait, CryptoProvider, HeaderProtection, Hkdf as HkdfTrait, MASK_LEN, NONCE_LEN,
    SAMPLE_LEN,
};
use crate::error::Error;

// ---- HKDF ----

macro_rules! rustcrypto_hkdf {
    ($(#[$meta:meta])* $name:ident, $digest:ty, $hash_len:expr) => {
        $(#[$meta])*
        pub struct $name;

        impl HkdfTrait for $name {
            const HASH_LEN: usize = $hash_len;

            fn extract(&self, salt: &[u8], ikm: &[u8], prk: &mut [u8]) -> Result<(), Error> {
                if prk.len() < Self::HASH_LEN {
                    return Err(Error::BufferTooSmall {
                        needed: Self::HASH_LEN,
                    });
                }
                let (out, _) = hkdf::Hkdf::<$digest>::extract(Some(salt), ikm);
                prk[..Self::HASH_LEN].copy_from_slice(&out);
                Ok(())
            }

            fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<(), Error> {
                let hk = hkdf::Hkdf::<$digest>::from_prk(prk).map_err(|_| Error::Crypto)?;
                hk.expand(info, okm).map_err(|_| Error::Crypto)
            }
        }
    };
}

rustcrypto_hkdf!(
    /// HKDF using SHA-256 (via the `hkdf` crate).
    HkdfSha256,
    sha2::Sha256,
    32
);

rustcrypto_hkdf!(
    /// HKDF using SHA-384, paired with AES-256-GCM.
    HkdfSha384,
    sha2::Sha384,
    48
);

// ---- AEADs ----

// All three AEADs come from the same `aead` trait family, so one body
// covers them. Tampering, truncation and wrong keys all map to
// `Error::Decrypt`.
macro_rules! rustcrypto_aead {
    ($(#[$meta:meta])* $name:ident, $cipher:ty, $key_len:expr) => {
        $(#[$meta])*
        pub struct $name {
            cipher: $cipher,
        }

        impl $name {
            fn new(key: &[u8]) -> Result<Self, Error> {
                use aes_gcm::aead::KeyInit;

                if key.len() != $key_len {
                    return Err(Error::KeyLength {
                        expected: $key_len,
                        actual: key.len(),
                    });
                }
                let cipher = <$cipher>::new_from_slice(key).map_err(|_| Error::Crypto)?;
                Ok(Self { cipher })
            }
        }

        impl AeadTrait for $name {
            const KEY_LEN: usize = $key_len;
            const TAG_LEN: usize = 16;

            fn seal_in_place(
                &self,
                nonce: &[u8; NONCE_LEN],
                aad: &[u8],
                buf: &mut [u8],
                payload_len: usize,
            ) -> Result<usize, Error> {
                use aes_gcm::aead::AeadInPlace;

                let total = payload_len + Self::TAG_LEN;
                if buf.len() < total {
                    return Err(Error::BufferTooSmall { needed: total });
                }

                let tag = self
                    .cipher
                    .encrypt_in_place_detached(
                        GenericArray::from_slice(nonce),
                        aad,
                        &mut buf[..payload_len],
                    )
                    .map_err(|_| Error::Crypto)?;
                buf[payload_len..total].copy_from_slice(&tag);
                Ok(total)
            }

            fn open_in_place(
                &self,
                nonce: &[u8; NONCE_LEN],
                aad: &[u8],
                buf: &mut [u8],
                ciphertext_len: usize,
            ) -> Result<usize, Error> {
                use aes_gcm::aead::AeadInPlace;

                if ciphertext_len < Self::TAG_LEN || buf.len() < ciphertext_len {
                    return Err(Error::Decrypt);
                }
                let plaintext_len = ciphertext_len - Self::TAG_LEN;
                let (payload, rest) = buf.split_at_mut(plaintext_len);
                let tag = GenericArray::clone_from_slice(&rest[..Self::TAG_LEN]);
                self.cipher
                    .decrypt_in_place_detached(GenericArray::from_slice(nonce), aad, payload, &tag)
                    .map_err(|_| Error::Decrypt)?;
                Ok(plaintext_len)
            }
        }
    };
}

rustcrypto_aead!(
    /// AES-128-GCM AEAD implementation.
    Aes128GcmAead,
    aes_gcm::Aes128Gcm,
    16
);

rustcrypto_aead!(
    /// AES-256-GCM AEAD implementation.
    Aes256GcmAead,
    aes_gcm::Aes256Gcm,
    32
);

#[cfg(feature = "rustcrypto-chacha")]
rustcrypto_aead!(
    /// ChaCha20-Poly1305 AEAD implementation.
    ChaCha20Poly1305Aead,
    chacha20poly1305::ChaCha20Poly1305,
    32
);

// ---- AES Header Protection ----

/// AES-ECB header protection (RFC 9001 section 5.4.3).
///
/// The mask is the first five bytes of the sample encrypted as a single
/// block. The key schedule is wiped on drop by the `aes` crate.
#[derive(Clone)]
pub struct AesHeaderProtection<B> {
    cipher: B,
}

impl<B> AesHeaderProtection<B>
where
    B: BlockEncrypt + BlockSizeUser<BlockSize = U16> + KeyInit,
{
    fn new(key: &[u8]) -> Result<Self, Error> {
        let expected = <B as KeySizeUser>::KeySize::USIZE;
        if key.len() != expected {
            return Err(Error::KeyLength {
                expected,
                actual: key.len(),
            });
        }
        let cipher = B::new_from_slice(key).map_err(|_| Error::Crypto)?;
        Ok(Self { cipher })
    }
}

impl<B> HeaderProtection for AesHeaderProtection<B>
where
    B: BlockEncrypt + BlockSizeUser<BlockSize = U16> + KeyInit,
{
    const KEY_LEN: usize = <B as KeySizeUser>::KeySize::USIZE;

    fn mask(&self, sample: &[u8; SAMPLE_LEN]) -> [u8; MASK_LEN] {
        let mut block = GenericArray::<u8, U16>::from(*sample);
        self.cipher.encrypt_block(&mut block);
        let mut mask = [0u8; MASK_LEN];
        mask.copy_from_slice(&block[..MASK_LEN]);
        mask
    }
}

// ---- ChaCha20 Header Protection ----

#[cfg(feature = "rustcrypto-chacha")]
/// ChaCha20 header protection (RFC 9001 section 5.4.4).
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct ChaChaHeaderProtection {
    key: [u8; 32],
}

#[cfg(feature = "rustcrypto-chacha")]
impl HeaderProtection for ChaChaHeaderProtection {
    const KEY_LEN: usize = 32;

    fn mask(&self, sample: &[u8; SAMPLE_LEN]) -> [u8; MASK_LEN] {
        use chacha20::cipher::consts::U10;
        use chacha20::cipher::{Block, KeyIvInit, StreamCipherCore, StreamCipherSeekCore};

        type ChaCha20Core = chacha20::ChaChaCore<U10>;

        // First four sample bytes are the little-endian block counter,
        // the remaining twelve the nonce. The mask is the start of that one
        // keystream block. Any counter is valid here, including 2^32 - 1,
        // which the `ChaCha20` stream wrapper rejects.
        let counter = u32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&sample[4..16]);

        let mut core = ChaCha20Core::new((&self.key).into(), (&nonce).into());
        core.set_block_pos(counter);
        let mut block = Block::<ChaCha20Core>::default();
        core.write_keystream_block(&mut block);

        let mut mask = [0u8; MASK_LEN];
        mask.copy_from_slice(&block[..MASK_LEN]);
        mask
    }
}

// ---- CryptoProvider bundles ----

/// AES-128-GCM cipher suite provider (`TLS_AES_128_GCM_SHA256`).
pub struct Aes128GcmProvider;

impl CryptoProvider for Aes128GcmProvider {
    type Aead = Aes128GcmAead;
    type Hkdf = HkdfSha256;
    type HeaderProtection = AesHeaderProtection<aes::Aes128>;

    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error> {
        Aes128GcmAead::new(key)
    }

    fn hkdf(&self) -> Self::Hkdf {
        HkdfSha256
    }

    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error> {
        AesHeaderProtection::new(key)
    }
}

/// AES-256-GCM cipher suite provider (`TLS_AES_256_GCM_SHA384`).
pub struct Aes256GcmProvider;

impl CryptoProvider for Aes256GcmProvider {
    type Aead = Aes256GcmAead;
    type Hkdf = HkdfSha384;
    type HeaderProtection = AesHeaderProtection<aes::Aes256>;

    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error> {
        Aes256GcmAead::new(key)
    }

    fn hkdf(&self) -> Self::Hkdf {
        HkdfSha384
    }

    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error> {
        AesHeaderProtection::new(key)
    }
}

#[cfg(feature = "rustcrypto-chacha")]
/// ChaCha20-Poly1305 cipher suite provider (`TLS_CHACHA20_POLY1305_SHA256`).
pub struct ChaCha20Provider;

#[cfg(feature = "rustcrypto-chacha")]
impl CryptoProvider for ChaCha20Provider {
    type Aead = ChaCha20Poly1305Aead;
    type Hkdf = HkdfSha256;
    type HeaderProtection = ChaChaHeaderProtection;

    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error> {
        ChaCha20Poly1305Aead::new(key)
    }

    fn hkdf(&self) -> Self::Hkdf {
        HkdfSha256
    }

    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error> {
        if key.len() != ChaChaHeaderProtection::KEY_LEN {
            return Err(Error::KeyLength {
                expected: ChaChaHeaderProtection::KEY_LEN,
                actual: key.len(),
            });
        }
        let mut k = [0u8; 32];
        k.copy_from_slice(key);
        Ok(ChaChaHeaderProtection { key: k })
    }
}
