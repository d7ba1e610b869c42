//! The leadership campaign loop.
//!
//! [`LeadershipCampaign`] drives a [`LeaderElector`](super::LeaderElector)
//! through the acquire/renew/release lifecycle and publishes the current
//! leadership state over a `tokio::sync::watch` channel. Gated loops hold a
//! [`LeaderStatus`] and either poll [`LeaderStatus::is_leader`] at their tick
//! boundaries or await [`LeaderStatus::changed`].
//!
//! Losing the lease (failed renewal, backend outage, shutdown) flips the
//! channel to `false`; gated work observes the flip at its next checkpoint
//! and stops. Re-election is automatic: the campaign keeps retrying
//! acquisition at the retry interval until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{LeaderElector, LeadershipResult, RenewalResult};
use crate::error::{Error, Result};
use crate::metrics;

/// Timing for one campaign.
///
/// The reference deployment uses a 15 second lease renewed every 10 seconds,
/// with non-leaders retrying acquisition every 2 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseSettings {
    /// How long a granted lease lasts without renewal.
    pub lease_duration: Duration,
    /// How often the leader renews. Must be shorter than `lease_duration`.
    pub renew_interval: Duration,
    /// How often a non-leader retries acquisition.
    pub retry_interval: Duration,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(15),
            renew_interval: Duration::from_secs(10),
            retry_interval: Duration::from_secs(2),
        }
    }
}

impl LeaseSettings {
    /// Checks the intervals against each other.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any interval is zero or if the renew
    /// interval is not shorter than the lease duration.
    pub fn validate(&self) -> Result<()> {
        if self.lease_duration.is_zero() {
            return Err(Error::configuration("lease duration must be positive"));
        }
        if self.renew_interval.is_zero() {
            return Err(Error::configuration("renew interval must be positive"));
        }
        if self.retry_interval.is_zero() {
            return Err(Error::configuration("retry interval must be positive"));
        }
        if self.renew_interval >= self.lease_duration {
            return Err(Error::configuration(
                "renew interval must be shorter than the lease duration",
            ));
        }
        Ok(())
    }
}

/// Read handle onto a campaign's leadership state.
#[derive(Debug, Clone)]
pub struct LeaderStatus {
    inner: watch::Receiver<bool>,
}

impl LeaderStatus {
    /// Returns whether this instance currently holds leadership.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        *self.inner.borrow()
    }

    /// Waits for the next leadership change and returns the new state.
    ///
    /// Returns `false` once the campaign has stopped.
    pub async fn changed(&mut self) -> bool {
        if self.inner.changed().await.is_err() {
            return false;
        }
        *self.inner.borrow()
    }
}

/// Acquire/renew/release loop for the janitor leadership lease.
pub struct LeadershipCampaign {
    elector: Arc<dyn LeaderElector>,
    lock_key: String,
    instance_id: String,
    settings: LeaseSettings,
    status_tx: watch::Sender<bool>,
}

impl LeadershipCampaign {
    /// Creates a campaign and the status handle its observers share.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are inconsistent.
    pub fn new(
        elector: Arc<dyn LeaderElector>,
        lock_key: impl Into<String>,
        instance_id: impl Into<String>,
        settings: LeaseSettings,
    ) -> Result<(Self, LeaderStatus)> {
        settings.validate()?;
        let (status_tx, status_rx) = watch::channel(false);
        Ok((
            Self {
                elector,
                lock_key: lock_key.into(),
                instance_id: instance_id.into(),
                settings,
                status_tx,
            },
            LeaderStatus { inner: status_rx },
        ))
    }

    /// Runs the campaign until the shutdown channel fires, then releases any
    /// held lease.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            lock_key = %self.lock_key,
            instance_id = %self.instance_id,
            "starting leadership campaign"
        );

        let mut lease_token: Option<String> = None;
        loop {
            lease_token = self.step(lease_token).await;

            let wait = if lease_token.is_some() {
                self.settings.renew_interval
            } else {
                self.settings.retry_interval
            };
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }
        }

        if let Some(token) = lease_token {
            match self.elector.release(&self.lock_key, &token).await {
                Ok(true) => info!(lock_key = %self.lock_key, "released janitor lease"),
                Ok(false) => debug!(lock_key = %self.lock_key, "lease already gone at release"),
                Err(error) => warn!(error = %error, "failed to release lease at shutdown"),
            }
        }
        self.publish(false);
        info!(instance_id = %self.instance_id, "leadership campaign stopped");
    }

    /// One acquire-or-renew step; returns the lease token held afterwards.
    async fn step(&self, lease_token: Option<String>) -> Option<String> {
        match lease_token {
            None => match self
                .elector
                .try_acquire(&self.lock_key, &self.instance_id)
                .await
            {
                Ok(LeadershipResult::Acquired { lease_token, .. }) => {
                    info!(
                        lock_key = %self.lock_key,
                        instance_id = %self.instance_id,
                        "acquired janitor leadership"
                    );
                    self.publish(true);
                    Some(lease_token)
                }
                Ok(LeadershipResult::NotLeader { current_leader }) => {
                    debug!(current_leader = ?current_leader, "leadership held elsewhere");
                    self.publish(false);
                    None
                }
                Err(error) => {
                    warn!(error = %error, "leader election backend unavailable");
                    self.publish(false);
                    None
                }
            },
            Some(token) => match self.elector.renew(&self.lock_key, &token).await {
                Ok(RenewalResult::Renewed { .. }) => {
                    debug!(lock_key = %self.lock_key, "renewed janitor lease");
                    Some(token)
                }
                Ok(RenewalResult::Lost | RenewalResult::InvalidToken) => {
                    warn!(
                        lock_key = %self.lock_key,
                        instance_id = %self.instance_id,
                        "lost janitor leadership"
                    );
                    self.publish(false);
                    None
                }
                Err(error) => {
                    warn!(error = %error, "lease renewal failed, stepping down");
                    self.publish(false);
                    None
                }
            },
        }
    }

    fn publish(&self, leader: bool) {
        let flipped = self.status_tx.send_if_modified(|current| {
            if *current == leader {
                false
            } else {
                *current = leader;
                true
            }
        });
        if flipped {
            metrics::set_leader_state(leader);
        }
    }
}
