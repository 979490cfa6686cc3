use crate::crypto::key_schedule::packet_keys_from_secret;
use crate::crypto::{Aead, CryptoProvider, DirectionalKeys, HeaderProtection, Iv, PacketKeys, SAMPLE_LEN};
use crate::error::Error;
use crate::packet::PacketNumberWindow;
use crate::protection::{mask, Sealer};

/// [`Sealer`] for the cipher suite of `C`.
///
/// Holds the local sending keys of one encryption level. Key material is
/// wiped when the sealer is dropped.
pub struct PacketSealer<C: CryptoProvider> {
    keys: DirectionalKeys<C::Aead, C::HeaderProtection>,
}

impl<C: CryptoProvider> PacketSealer<C> {
    /// Build a sealer from key material handed over by the key schedule.
    pub fn new(provider: &C, keys: &PacketKeys) -> Result<Self, Error> {
        Ok(Self {
            keys: DirectionalKeys::new(provider, keys)?,
        })
    }

    /// Derive keys from a traffic secret and build a sealer.
    pub fn from_secret(provider: &C, secret: &[u8]) -> Result<Self, Error> {
        let keys = packet_keys_from_secret::<C>(&provider.hkdf(), secret)?;
        Self::new(provider, &keys)
    }

    /// Build the sealer for the next key phase (RFC 9001 section 6).
    ///
    /// AEAD key and IV come from `next_secret`; the header protection key
    /// is not updated and carries over.
    pub fn next_generation(&self, provider: &C, next_secret: &[u8]) -> Result<Self, Error>
    where
        C::HeaderProtection: Clone,
    {
        let keys = packet_keys_from_secret::<C>(&provider.hkdf(), next_secret)?;
        Ok(Self {
            keys: DirectionalKeys {
                aead: provider.aead(keys.key())?,
                header_protection: self.keys.header_protection.clone(),
                iv: Iv::new(*keys.iv()),
            },
        })
    }
}

impl<C: CryptoProvider> Sealer for PacketSealer<C> {
    fn overhead(&self) -> usize {
        C::Aead::TAG_LEN
    }

    fn seal_in_place(
        &self,
        buf: &mut [u8],
        payload_len: usize,
        packet_number: u64,
        aad: &[u8],
    ) -> Result<usize, Error> {
        let nonce = self.keys.nonce(packet_number);
        self.keys.aead.seal_in_place(&nonce, aad, buf, payload_len)
    }

    fn encrypt_header(
        &self,
        sample: &[u8; SAMPLE_LEN],
        first_byte: &mut u8,
        pn_window: &mut PacketNumberWindow,
    ) {
        let mask = self.keys.header_protection.mask(sample);
        mask::protect_header(&mask, first_byte, pn_window);
    }
}

impl<C: CryptoProvider> core::fmt::Debug for PacketSealer<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PacketSealer")
            .field("overhead", &C::Aead::TAG_LEN)
            .finish_non_exhaustive()
    }
}
