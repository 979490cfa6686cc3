use crate::crypto::key_schedule::packet_keys_from_secret;
use crate::crypto::{Aead, CryptoProvider, DirectionalKeys, HeaderProtection, Iv, PacketKeys, SAMPLE_LEN};
use crate::error::Error;
use crate::packet::{PacketNumberLen, PacketNumberWindow};
use crate::protection::{mask, Opener};

/// [`Opener`] for the cipher suite of `C`.
///
/// Holds the peer's sending keys of one encryption level. Key material is
/// wiped when the opener is dropped.
pub struct PacketOpener<C: CryptoProvider> {
    keys: DirectionalKeys<C::Aead, C::HeaderProtection>,
}

impl<C: CryptoProvider> PacketOpener<C> {
    /// Build an opener from key material handed over by the key schedule.
    pub fn new(provider: &C, keys: &PacketKeys) -> Result<Self, Error> {
        Ok(Self {
            keys: DirectionalKeys::new(provider, keys)?,
        })
    }

    /// Derive keys from a traffic secret and build an opener.
    pub fn from_secret(provider: &C, secret: &[u8]) -> Result<Self, Error> {
        let keys = packet_keys_from_secret::<C>(&provider.hkdf(), secret)?;
        Self::new(provider, &keys)
    }

    /// Build the opener for the next key phase, keeping the header
    /// protection key.
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

impl<C: CryptoProvider> Opener for PacketOpener<C> {
    fn open_in_place(
        &self,
        buf: &mut [u8],
        ciphertext_len: usize,
        packet_number: u64,
        aad: &[u8],
    ) -> Result<usize, Error> {
        let nonce = self.keys.nonce(packet_number);
        self.keys
            .aead
            .open_in_place(&nonce, aad, buf, ciphertext_len)
            .map_err(|_| Error::Decrypt)
    }

    fn decrypt_header(
        &self,
        sample: &[u8; SAMPLE_LEN],
        first_byte: &mut u8,
        pn_window: &mut PacketNumberWindow,
    ) -> PacketNumberLen {
        let mask = self.keys.header_protection.mask(sample);
        mask::unprotect_header(&mask, first_byte, pn_window)
    }
}

impl<C: CryptoProvider> core::fmt::Debug for PacketOpener<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PacketOpener").finish_non_exhaustive()
    }
}
