//! Connection-level key management.
//!
//! Holds a sealer/opener epoch for each encryption level, derives Initial
//! keys from the client's Destination Connection ID, installs keys from
//! TLS-derived secrets and performs 1-RTT key updates.

use core::marker::PhantomData;

use zeroize::Zeroizing;

use crate::connection::{DefaultConfig, EpochState, KeyConfig, KeyEpoch, Role};
use crate::crypto::key_schedule::derive_initial_secrets;
use crate::crypto::{CryptoProvider, Level};
use crate::error::Error;
use crate::packet::PacketNumberSpace;
use crate::protection::{PacketOpener, PacketSealer};
use crate::Instant;

type Epoch<C> = KeyEpoch<PacketSealer<C>, PacketOpener<C>>;

/// Packet number spaces: Initial, Handshake and application data.
/// 0-RTT and 1-RTT packets share the last one (RFC 9000 section 12.3).
const SPACES: usize = 3;

const fn space_index(level: Level) -> usize {
    match level {
        Level::Initial => 0,
        Level::Handshake => 1,
        Level::ZeroRtt | Level::Application => 2,
    }
}

/// All packet protection keys of a QUIC connection.
pub struct ConnectionKeys<C: CryptoProvider, K: KeyConfig = DefaultConfig> {
    epochs: [Epoch<C>; 4],
    previous_application: Epoch<C>,
    spaces: [PacketNumberSpace; SPACES],
    key_phase: bool,
    _config: PhantomData<K>,
}

impl<C: CryptoProvider, K: KeyConfig> Default for ConnectionKeys<C, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CryptoProvider, K: KeyConfig> ConnectionKeys<C, K> {
    /// Create an empty key set (no keys installed yet).
    pub fn new() -> Self {
        Self {
            epochs: core::array::from_fn(|_| KeyEpoch::new()),
            previous_application: KeyEpoch::new(),
            spaces: core::array::from_fn(|_| PacketNumberSpace::with_limit(K::MAX_PACKET_NUMBER)),
            key_phase: false,
            _config: PhantomData,
        }
    }

    /// Derive and install Initial keys from a Destination Connection ID.
    ///
    /// For a client: send = client keys, recv = server keys.
    /// For a server: send = server keys, recv = client keys.
    ///
    /// QUIC v1 Initial packets are always protected with AES-128-GCM, so
    /// `provider` is normally `Aes128GcmProvider`.
    pub fn derive_initial(&mut self, provider: &C, dcid: &[u8], role: Role) -> Result<(), Error> {
        let hkdf = provider.hkdf();
        let mut client_secret = Zeroizing::new([0u8; 32]);
        let mut server_secret = Zeroizing::new([0u8; 32]);
        derive_initial_secrets(&hkdf, dcid, &mut client_secret[..], &mut server_secret[..])?;

        let (send, recv) = match role {
            Role::Client => (&client_secret, &server_secret),
            Role::Server => (&server_secret, &client_secret),
        };
        self.install_secrets(provider, Level::Initial, &send[..], &recv[..])
    }

    /// Install keys derived from TLS traffic secrets.
    ///
    /// For 0-RTT both directions use the client early traffic secret.
    pub fn install_secrets(
        &mut self,
        provider: &C,
        level: Level,
        send_secret: &[u8],
        recv_secret: &[u8],
    ) -> Result<(), Error> {
        let sealer = PacketSealer::from_secret(provider, send_secret)?;
        let opener = PacketOpener::from_secret(provider, recv_secret)?;
        self.epochs[level.index()].install(sealer, opener)?;
        tracing::debug!(epoch = ?level, "packet protection keys installed");
        Ok(())
    }

    /// Stop sending at `level`; incoming packets are still accepted for
    /// [`KeyConfig::RETIRE_DELAY`].
    pub fn retire(&mut self, level: Level, now: Instant) -> Result<(), Error> {
        self.epochs[level.index()].retire(now, K::RETIRE_DELAY)?;
        tracing::debug!(epoch = ?level, until = now.saturating_add(K::RETIRE_DELAY), "keys retiring");
        Ok(())
    }

    /// Drop the keys of `level` immediately (RFC 9001 section 4.9).
    ///
    /// Discarding 1-RTT keys also drops a previous key phase.
    pub fn discard(&mut self, level: Level) {
        self.epochs[level.index()].discard();
        if level == Level::Application {
            self.previous_application.discard();
        }
        tracing::debug!(epoch = ?level, "keys discarded");
    }

    /// Switch to the next 1-RTT key phase (RFC 9001 section 6).
    ///
    /// `send_secret` and `recv_secret` are the next-generation secrets, see
    /// [`derive_next_application_secret`](crate::crypto::key_schedule::derive_next_application_secret).
    /// Header protection keys carry over. The current phase becomes the
    /// previous one and keeps its opener for [`KeyConfig::RETIRE_DELAY`];
    /// an older previous phase is dropped.
    pub fn update_application(
        &mut self,
        provider: &C,
        send_secret: &[u8],
        recv_secret: &[u8],
        now: Instant,
    ) -> Result<(), Error>
    where
        C::HeaderProtection: Clone,
    {
        let current = &self.epochs[Level::Application.index()];
        let (sealer, opener) = match (current.sealer(), current.opener()) {
            (Some(sealer), Some(opener)) => (sealer, opener),
            _ => return Err(Error::KeysUnavailable(Level::Application)),
        };
        let next_sealer = sealer.next_generation(provider, send_secret)?;
        let next_opener = opener.next_generation(provider, recv_secret)?;

        let mut previous = self.epochs[Level::Application.index()].take();
        previous.retire(now, K::RETIRE_DELAY)?;
        self.previous_application = previous;
        self.epochs[Level::Application.index()].install(next_sealer, next_opener)?;
        self.key_phase = !self.key_phase;

        tracing::debug!(key_phase = self.key_phase, "1-RTT keys updated");
        Ok(())
    }

    /// Retire every epoch whose deadline has passed.
    pub fn on_timeout(&mut self, now: Instant) {
        for level in Level::ALL {
            if self.epochs[level.index()].on_timeout(now) {
                tracing::debug!(epoch = ?level, "retired keys dropped");
            }
        }
        if self.previous_application.on_timeout(now) {
            tracing::debug!("previous 1-RTT keys dropped");
        }
    }

    /// Earliest deadline of a retiring epoch.
    pub fn next_timeout(&self) -> Option<Instant> {
        self.epochs
            .iter()
            .chain(core::iter::once(&self.previous_application))
            .filter_map(|e| e.timeout())
            .min()
    }

    /// Keys for outgoing packets at `level`.
    pub fn sealer(&self, level: Level) -> Result<&PacketSealer<C>, Error> {
        self.epochs[level.index()]
            .sealer()
            .ok_or(Error::KeysUnavailable(level))
    }

    /// Keys for incoming packets at `level`.
    pub fn opener(&self, level: Level) -> Result<&PacketOpener<C>, Error> {
        self.epochs[level.index()]
            .opener()
            .ok_or(Error::KeysUnavailable(level))
    }

    /// Opener of the previous 1-RTT key phase, while it is retiring.
    pub fn previous_application_opener(&self) -> Option<&PacketOpener<C>> {
        self.previous_application.opener()
    }

    pub fn state(&self, level: Level) -> EpochState {
        self.epochs[level.index()].state()
    }

    /// Current value of the short header key phase bit.
    pub fn key_phase(&self) -> bool {
        self.key_phase
    }

    /// Packet number space used at `level`.
    pub fn space(&self, level: Level) -> &PacketNumberSpace {
        &self.spaces[space_index(level)]
    }

    pub fn space_mut(&mut self, level: Level) -> &mut PacketNumberSpace {
        &mut self.spaces[space_index(level)]
    }
}

impl<C: CryptoProvider, K: KeyConfig> core::fmt::Debug for ConnectionKeys<C, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionKeys")
            .field("epochs", &self.epochs)
            .field("previous_application", &self.previous_application)
            .field("key_phase", &self.key_phase)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "rustcrypto-aes"))]
mod tests {
    use super::*;
    use crate::crypto::key_schedule::derive_next_application_secret;
    use crate::crypto::rustcrypto::{Aes128GcmProvider, HkdfSha256};
    use crate::protection::{Opener, Sealer};
    use hex_literal::hex;

    type Keys = ConnectionKeys<Aes128GcmProvider>;

    struct ShortDelay;

    impl KeyConfig for ShortDelay {
        const RETIRE_DELAY: Instant = 100;
        const MAX_PACKET_NUMBER: u64 = 10;
    }

    const DCID: [u8; 8] = hex!("8394c8f03e515708");
    const APP_CLIENT: [u8; 32] = [0x0c; 32];
    const APP_SERVER: [u8; 32] = [0x05; 32];

    fn seal(keys: &impl Sealer, pn: u64, payload: &[u8], out: &mut [u8]) -> usize {
        keys.seal(out, payload, pn, b"header").unwrap()
    }

    fn pair() -> (Keys, Keys) {
        let mut client = Keys::new();
        let mut server = Keys::new();
        client.derive_initial(&Aes128GcmProvider, &DCID, Role::Client).unwrap();
        server.derive_initial(&Aes128GcmProvider, &DCID, Role::Server).unwrap();
        (client, server)
    }

    fn with_application<K: KeyConfig>() -> (ConnectionKeys<Aes128GcmProvider, K>, ConnectionKeys<Aes128GcmProvider, K>) {
        let mut client = ConnectionKeys::new();
        let mut server = ConnectionKeys::new();
        client
            .install_secrets(&Aes128GcmProvider, Level::Application, &APP_CLIENT, &APP_SERVER)
            .unwrap();
        server
            .install_secrets(&Aes128GcmProvider, Level::Application, &APP_SERVER, &APP_CLIENT)
            .unwrap();
        (client, server)
    }

    fn next_secret(current: &[u8]) -> [u8; 32] {
        let mut next = [0u8; 32];
        derive_next_application_secret(&HkdfSha256, current, &mut next).unwrap();
        next
    }

    #[test]
    fn derive_initial_client_keys() {
        let (client, _) = pair();
        assert_eq!(client.state(Level::Initial), EpochState::Active);
        assert_eq!(client.state(Level::Handshake), EpochState::Pending);
        assert!(client.sealer(Level::Initial).is_ok());
        assert_eq!(
            client.sealer(Level::Application).err(),
            Some(Error::KeysUnavailable(Level::Application))
        );
    }

    #[test]
    fn client_initial_header_mask_rfc9001_a2() {
        let (client, _) = pair();
        let mut first = 0xc3;
        let mut pn = hex!("00000002");
        client.sealer(Level::Initial).unwrap().encrypt_header(
            &hex!("d1b1c98dd7689fb8ec11d242b123dc9b"),
            &mut first,
            &mut pn,
        );
        assert_eq!(first, 0xc0);
        assert_eq!(pn, hex!("7b9aec34"));
    }

    #[test]
    fn derive_initial_server_keys_swapped() {
        let (client, server) = pair();
        let mut ct = [0u8; 64];
        let mut pt = [0u8; 64];

        let n = seal(client.sealer(Level::Initial).unwrap(), 0, b"client hello", &mut ct);
        let m = server.opener(Level::Initial).unwrap().open(&mut pt, &ct[..n], 0, b"header").unwrap();
        assert_eq!(&pt[..m], b"client hello");

        let n = seal(server.sealer(Level::Initial).unwrap(), 0, b"server hello", &mut ct);
        let m = client.opener(Level::Initial).unwrap().open(&mut pt, &ct[..n], 0, b"header").unwrap();
        assert_eq!(&pt[..m], b"server hello");
    }

    #[test]
    fn install_twice_fails() {
        let (mut client, _) = pair();
        assert_eq!(
            client.install_secrets(&Aes128GcmProvider, Level::Initial, &[1; 32], &[2; 32]),
            Err(Error::InvalidState)
        );
    }

    #[test]
    fn retired_initial_keys_open_until_deadline() {
        let mut client = ConnectionKeys::<Aes128GcmProvider, ShortDelay>::new();
        client.derive_initial(&Aes128GcmProvider, &DCID, Role::Client).unwrap();

        client.retire(Level::Initial, 1_000).unwrap();
        assert_eq!(client.state(Level::Initial), EpochState::Retiring { until: 1_100 });
        assert!(client.sealer(Level::Initial).is_err());
        assert!(client.opener(Level::Initial).is_ok());
        assert_eq!(client.next_timeout(), Some(1_100));

        client.on_timeout(1_099);
        assert!(client.opener(Level::Initial).is_ok());
        client.on_timeout(1_100);
        assert_eq!(client.state(Level::Initial), EpochState::Retired);
        assert_eq!(
            client.opener(Level::Initial).err(),
            Some(Error::KeysUnavailable(Level::Initial))
        );
        assert_eq!(client.next_timeout(), None);
    }

    #[test]
    fn discard_drops_both_directions() {
        let (mut client, _) = pair();
        client.discard(Level::Initial);
        assert_eq!(client.state(Level::Initial), EpochState::Retired);
        assert!(client.sealer(Level::Initial).is_err());
        assert!(client.opener(Level::Initial).is_err());
    }

    #[test]
    fn key_update_keeps_previous_opener() {
        let (mut client, mut server) = with_application::<ShortDelay>();
        let mut ct = [0u8; 64];
        let mut pt = [0u8; 64];

        // Sent before the update, delivered after it.
        let late = seal(client.sealer(Level::Application).unwrap(), 7, b"late", &mut ct);
        let mut late_ct = [0u8; 64];
        late_ct[..late].copy_from_slice(&ct[..late]);

        client
            .update_application(&Aes128GcmProvider, &next_secret(&APP_CLIENT), &next_secret(&APP_SERVER), 500)
            .unwrap();
        server
            .update_application(&Aes128GcmProvider, &next_secret(&APP_SERVER), &next_secret(&APP_CLIENT), 500)
            .unwrap();
        assert!(client.key_phase());
        assert!(server.key_phase());

        let n = seal(client.sealer(Level::Application).unwrap(), 8, b"new phase", &mut ct);
        let current = server.opener(Level::Application).unwrap();
        let m = current.open(&mut pt, &ct[..n], 8, b"header").unwrap();
        assert_eq!(&pt[..m], b"new phase");

        let previous = server.previous_application_opener().unwrap();
        assert_eq!(previous.open(&mut pt, &ct[..n], 8, b"header"), Err(Error::Decrypt));
        let m = previous.open(&mut pt, &late_ct[..late], 7, b"header").unwrap();
        assert_eq!(&pt[..m], b"late");
        assert_eq!(current.open(&mut pt, &late_ct[..late], 7, b"header"), Err(Error::Decrypt));

        server.on_timeout(600);
        assert!(server.previous_application_opener().is_none());
        assert!(server.opener(Level::Application).is_ok());
    }

    #[test]
    fn key_update_keeps_header_protection() {
        let (mut client, _) = with_application::<DefaultConfig>();
        let sample = [0x42; 16];
        let (mut f1, mut w1) = (0x41, [9, 9, 9, 9]);
        client.sealer(Level::Application).unwrap().encrypt_header(&sample, &mut f1, &mut w1);

        client
            .update_application(&Aes128GcmProvider, &[7; 32], &[8; 32], 0)
            .unwrap();
        let (mut f2, mut w2) = (0x41, [9, 9, 9, 9]);
        client.sealer(Level::Application).unwrap().encrypt_header(&sample, &mut f2, &mut w2);
        assert_eq!((f1, w1), (f2, w2));
    }

    #[test]
    fn key_update_needs_active_application_keys() {
        let (mut client, _) = pair();
        assert_eq!(
            client.update_application(&Aes128GcmProvider, &[1; 32], &[2; 32], 0),
            Err(Error::KeysUnavailable(Level::Application))
        );
        assert!(!client.key_phase());
    }

    #[test]
    fn discarding_application_drops_previous_phase() {
        let (mut client, _) = with_application::<DefaultConfig>();
        client
            .update_application(&Aes128GcmProvider, &[1; 32], &[2; 32], 0)
            .unwrap();
        assert!(client.previous_application_opener().is_some());
        client.discard(Level::Application);
        assert!(client.previous_application_opener().is_none());
    }

    #[test]
    fn zero_rtt_and_one_rtt_share_a_space() {
        let mut keys = ConnectionKeys::<Aes128GcmProvider, ShortDelay>::new();
        assert_eq!(keys.space_mut(Level::ZeroRtt).next_packet_number(), Ok(0));
        assert_eq!(keys.space_mut(Level::Application).next_packet_number(), Ok(1));
        assert_eq!(keys.space(Level::Initial).peek(), Some(0));
        assert_eq!(keys.space(Level::Handshake).peek(), Some(0));

        let space = keys.space_mut(Level::Initial);
        for _ in 0..=ShortDelay::MAX_PACKET_NUMBER {
            space.next_packet_number().unwrap();
        }
        assert_eq!(space.next_packet_number(), Err(Error::PacketNumberExhausted));
    }
}
