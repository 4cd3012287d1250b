use std::time::{Duration, Instant};

use relaybridge_transport::RelaySocket;
use tracing::{error, info};

/// Relay network access lifecycle.
///
/// The relay's one-time access handshake may fail (no connectivity, service
/// outage). Failures are logged and retried from [`maintain`](Self::maintain)
/// at `retry_interval` instead of aborting the host.
#[derive(Debug)]
pub struct RelayNetwork {
    retry_interval: Duration,
    last_attempt: Option<Instant>,
    attempts: u32,
}

impl RelayNetwork {
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            retry_interval,
            last_attempt: None,
            attempts: 0,
        }
    }

    /// Attempt initialization now unless the relay is already ready.
    pub fn initialize<R: RelaySocket + ?Sized>(&mut self, relay: &mut R) -> bool {
        if relay.is_network_ready() {
            return true;
        }
        self.attempt(relay)
    }

    /// The low-frequency maintenance tick.
    ///
    /// Retries a failed initialization once `retry_interval` has elapsed,
    /// then drives the relay's own callback dispatch.
    pub fn maintain<R: RelaySocket + ?Sized>(&mut self, relay: &mut R) {
        if !relay.is_network_ready() {
            let due = self
                .last_attempt
                .is_none_or(|at| at.elapsed() >= self.retry_interval);
            if !due || !self.attempt(relay) {
                return;
            }
        }
        relay.run_callbacks();
    }

    /// Number of initialization attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn attempt<R: RelaySocket + ?Sized>(&mut self, relay: &mut R) -> bool {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(Instant::now());
        match relay.init_network() {
            Ok(()) => {
                info!(attempts = self.attempts, "relay network ready");
                true
            }
            Err(err) => {
                error!(
                    attempt = self.attempts,
                    error = %err,
                    retry_in = ?self.retry_interval,
                    "relay network initialization failed"
                );
                false
            }
        }
    }
}

impl Default for RelayNetwork {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
