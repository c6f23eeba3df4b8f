//! Background token renewal.
//!
//! One task per armed session sleeps until 80% of the lease has elapsed,
//! renews the token, and loops with the new lease. A 403 stops it for
//! good; any other failure is retried on the previous lease's cadence.
//! The task holds only a weak reference to the session, never keeps the
//! runtime alive on its own, and exits as soon as it is cancelled.

use crate::{error::VaultError, session::Inner};
use parking_lot::Mutex;
use std::{sync::Weak, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound on a single renewal delay (about 24.8 days).
pub const MAX_RENEWAL_DELAY: Duration = Duration::from_millis(i32::MAX as u64);

/// Delay before renewing a lease of `lease_duration` seconds.
///
/// Reserves a fifth of the lease (rounded up) as a safety buffer, never
/// waits less than one second, and never more than [`MAX_RENEWAL_DELAY`].
///
/// ```
/// use std::time::Duration;
/// use vault_session::renewal_delay;
///
/// assert_eq!(renewal_delay(3600), Duration::from_secs(2880));
/// assert_eq!(renewal_delay(1), Duration::from_secs(1));
/// ```
#[must_use]
pub fn renewal_delay(lease_duration: u64) -> Duration {
    let buffer = lease_duration.div_ceil(5);
    let secs = lease_duration.saturating_sub(buffer).max(1);
    Duration::from_secs(secs).min(MAX_RENEWAL_DELAY)
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenewalState {
    /// Nothing scheduled
    #[default]
    Idle,
    /// Waiting to renew
    Armed {
        /// Time until the renewal fires, as of arming
        delay: Duration,
    },
    /// Renewal request in flight
    Renewing,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    state: RenewalState,
    cancel: Option<CancellationToken>,
}

/// Owns at most one renewal task per session.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    slot: Mutex<Slot>,
}

impl Scheduler {
    /// Start a renewal task, replacing any pending one.
    pub(crate) fn arm(&self, inner: Weak<Inner>, lease_duration: u64) {
        let cancel = CancellationToken::new();
        let generation = {
            let mut slot = self.slot.lock();
            if let Some(previous) = slot.cancel.replace(cancel.clone()) {
                previous.cancel();
            }
            slot.generation += 1;
            slot.state = RenewalState::Armed {
                delay: renewal_delay(lease_duration),
            };
            slot.generation
        };
        debug!(lease_secs = lease_duration, generation, "Arming token renewal");
        tokio::spawn(run(inner, generation, cancel, lease_duration));
    }

    /// Cancel the pending task, if any. An in-flight renewal is left to
    /// finish but its result is discarded.
    pub(crate) fn disarm(&self) {
        let mut slot = self.slot.lock();
        if let Some(cancel) = slot.cancel.take() {
            cancel.cancel();
            debug!(generation = slot.generation, "Disarmed token renewal");
        }
        slot.generation += 1;
        slot.state = RenewalState::Idle;
    }

    pub(crate) fn state(&self) -> RenewalState {
        self.slot.lock().state
    }

    /// Move to `state` if `generation` is still the current task.
    fn transition(&self, generation: u64, state: RenewalState) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return false;
        }
        slot.state = state;
        true
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot.generation == generation {
            slot.state = RenewalState::Idle;
            slot.cancel = None;
        }
    }
}

async fn run(inner: Weak<Inner>, generation: u64, cancel: CancellationToken, mut lease_duration: u64) {
    loop {
        let delay = renewal_delay(lease_duration);
        {
            let Some(inner) = inner.upgrade() else { return };
            if cancel.is_cancelled() || !inner.renewal.transition(generation, RenewalState::Armed { delay }) {
                return;
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }

        let Some(inner) = inner.upgrade() else { return };
        if cancel.is_cancelled() || !inner.renewal.transition(generation, RenewalState::Renewing) {
            return;
        }

        let result = match inner.current_token().await {
            Ok(token) => inner.renew_with(&token, None, None).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(renewal) => {
                if !inner.commit_renewal(&renewal, Some(&cancel)).await {
                    return;
                }
                info!(lease_secs = renewal.lease_duration, "Renewed Vault token");
                if renewal.lease_duration == 0 {
                    info!("Token lease no longer expires, stopping renewal");
                    inner.renewal.finish(generation);
                    return;
                }
                lease_duration = renewal.lease_duration;
            }
            Err(VaultError::Unauthenticated) => {
                inner.renewal.finish(generation);
                return;
            }
            Err(e) if e.is_permission_denied() => {
                error!(error = %e, "Token renewal denied, stopping renewal");
                inner.renewal.finish(generation);
                return;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in_secs = renewal_delay(lease_duration).as_secs(),
                    "Token renewal failed, retrying"
                );
            }
        }
    }
}
