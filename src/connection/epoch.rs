//! Lifetime of one set of packet protection keys.

use crate::error::Error;
use crate::Instant;

/// Where a [`KeyEpoch`] is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochState {
    /// No keys yet.
    Pending,
    /// Keys protect outgoing packets and remove protection from incoming ones.
    Active,
    /// Only incoming packets are accepted, until the deadline passes.
    Retiring { until: Instant },
    /// Keys are gone for good.
    Retired,
}

/// Sealer and opener of one encryption level or key phase.
///
/// ```text
/// Pending --install--> Active --retire--> Retiring --timeout--> Retired
///    \________________________\____________\___discard___________^
/// ```
///
/// Dropping a sealer or opener wipes its key material, so leaving a state
/// is what destroys the keys.
pub struct KeyEpoch<S, O> {
    state: EpochState,
    sealer: Option<S>,
    opener: Option<O>,
}

impl<S, O> Default for KeyEpoch<S, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, O> KeyEpoch<S, O> {
    pub const fn new() -> Self {
        Self {
            state: EpochState::Pending,
            sealer: None,
            opener: None,
        }
    }

    pub fn state(&self) -> EpochState {
        self.state
    }

    /// Install keys. Only valid once, from `Pending`.
    pub fn install(&mut self, sealer: S, opener: O) -> Result<(), Error> {
        if self.state != EpochState::Pending {
            return Err(Error::InvalidState);
        }
        self.sealer = Some(sealer);
        self.opener = Some(opener);
        self.state = EpochState::Active;
        Ok(())
    }

    /// Stop sending with these keys. The opener stays until `now + delay`
    /// to accept reordered packets.
    pub fn retire(&mut self, now: Instant, delay: Instant) -> Result<(), Error> {
        if self.state != EpochState::Active {
            return Err(Error::InvalidState);
        }
        self.sealer = None;
        self.state = EpochState::Retiring {
            until: now.saturating_add(delay),
        };
        Ok(())
    }

    /// Drop all keys immediately, whatever the state.
    pub fn discard(&mut self) {
        self.sealer = None;
        self.opener = None;
        self.state = EpochState::Retired;
    }

    /// Finish retirement once the deadline has passed.
    ///
    /// Returns `true` if this call retired the epoch.
    pub fn on_timeout(&mut self, now: Instant) -> bool {
        match self.state {
            EpochState::Retiring { until } if now >= until => {
                self.opener = None;
                self.state = EpochState::Retired;
                true
            }
            _ => false,
        }
    }

    /// Deadline of a retiring epoch.
    pub fn timeout(&self) -> Option<Instant> {
        match self.state {
            EpochState::Retiring { until } => Some(until),
            _ => None,
        }
    }

    pub fn sealer(&self) -> Option<&S> {
        match self.state {
            EpochState::Active => self.sealer.as_ref(),
            _ => None,
        }
    }

    pub fn opener(&self) -> Option<&O> {
        match self.state {
            EpochState::Active | EpochState::Retiring { .. } => self.opener.as_ref(),
            _ => None,
        }
    }

    /// Move the keys out, leaving this epoch `Pending`.
    pub(crate) fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

impl<S, O> core::fmt::Debug for KeyEpoch<S, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyEpoch")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
