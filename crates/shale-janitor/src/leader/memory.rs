//! In-memory leader elector for testing and local development.
//!
//! [`InMemoryLeaderElector`] keeps leases in a process-local map, so it can
//! exercise the full campaign lifecycle (acquire, renew, expire, release)
//! without a coordination backend.
//!
//! ## Limitations
//!
//! - **Single-process only**: Leadership is not shared across process
//!   boundaries, so it cannot arbitrate between real replicas
//! - **No persistence**: All leases are lost when the process exits

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use super::{LeaderElector, LeadershipResult, RenewalResult};
use crate::error::{Error, Result};

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::election("lock poisoned")
}

/// A granted lease for one lock key.
#[derive(Debug, Clone)]
struct Lease {
    /// The instance holding the lease.
    holder: String,
    /// Token the holder must present for renewal and release.
    token: String,
    /// When the lease expires unless renewed.
    expires_at: DateTime<Utc>,
}

impl Lease {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// In-memory lease map implementing [`LeaderElector`].
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
///
/// use shale_janitor::leader::InMemoryLeaderElector;
///
/// let elector = InMemoryLeaderElector::new(Duration::from_secs(15));
/// // Hand to a LeadershipCampaign or call try_acquire directly in tests.
/// ```
#[derive(Debug)]
pub struct InMemoryLeaderElector {
    leases: RwLock<HashMap<String, Lease>>,
    lease_duration: Duration,
}

impl Default for InMemoryLeaderElector {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

impl InMemoryLeaderElector {
    /// Creates an elector granting leases of the given duration.
    #[must_use]
    pub fn new(lease_duration: Duration) -> Self {
        Self {
            leases: RwLock::new(HashMap::new()),
            lease_duration,
        }
    }

    fn generate_token() -> String {
        Ulid::new().to_string()
    }

    /// Expiry instant for a lease granted or renewed at `now`.
    fn lease_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let duration = chrono::Duration::from_std(self.lease_duration)
            .unwrap_or_else(|_| chrono::Duration::seconds(15));
        now + duration
    }

    fn grant(&self, holder: &str, now: DateTime<Utc>) -> Lease {
        Lease {
            holder: holder.to_string(),
            token: Self::generate_token(),
            expires_at: self.lease_expiry(now),
        }
    }
}

#[async_trait]
impl LeaderElector for InMemoryLeaderElector {
    async fn try_acquire(&self, lock_key: &str, instance_id: &str) -> Result<LeadershipResult> {
        let mut leases = self.leases.write().map_err(poison_err)?;
        let now = Utc::now();

        if let Some(lease) = leases.get(lock_key) {
            if lease.is_live(now) {
                if lease.holder != instance_id {
                    let current_leader = lease.holder.clone();
                    drop(leases);
                    return Ok(LeadershipResult::NotLeader {
                        current_leader: Some(current_leader),
                    });
                }
                // We already hold it: grant a fresh lease with a new token.
            }
            // Expired leases fall through and are replaced.
        }

        let lease = self.grant(instance_id, now);
        let lease_token = lease.token.clone();
        leases.insert(lock_key.to_string(), lease);
        drop(leases);

        Ok(LeadershipResult::Acquired {
            lease_token,
            lease_duration: self.lease_duration,
        })
    }

    async fn renew(&self, lock_key: &str, lease_token: &str) -> Result<RenewalResult> {
        let mut leases = self.leases.write().map_err(poison_err)?;
        let now = Utc::now();

        let Some(lease) = leases.get_mut(lock_key) else {
            drop(leases);
            return Ok(RenewalResult::Lost);
        };
        if lease.token != lease_token {
            drop(leases);
            return Ok(RenewalResult::InvalidToken);
        }
        if !lease.is_live(now) {
            drop(leases);
            return Ok(RenewalResult::Lost);
        }

        // Extend the expiry without rotating the token, so the holder can
        // keep renewing and eventually release with the same token.
        lease.expires_at = self.lease_expiry(now);
        drop(leases);

        Ok(RenewalResult::Renewed {
            lease_duration: self.lease_duration,
        })
    }

    async fn release(&self, lock_key: &str, lease_token: &str) -> Result<bool> {
        let mut leases = self.leases.write().map_err(poison_err)?;

        let Some(lease) = leases.get(lock_key) else {
            drop(leases);
            return Ok(false);
        };
        if lease.token != lease_token {
            drop(leases);
            return Ok(false);
        }

        leases.remove(lock_key);
        drop(leases);

        Ok(true)
    }

    async fn current_leader(&self, lock_key: &str) -> Result<Option<String>> {
        let leases = self.leases.read().map_err(poison_err)?;
        let now = Utc::now();

        let leader = leases
            .get(lock_key)
            .filter(|lease| lease.is_live(now))
            .map(|lease| lease.holder.clone());
        drop(leases);

        Ok(leader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK_KEY: &str = "log-janitor";

    #[tokio::test]
    async fn acquire_leadership_when_no_leader() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let result = elector.try_acquire(LOCK_KEY, "janitor-a").await?;

        assert!(result.is_leader());
        assert!(result.lease_token().is_some());

        Ok(())
    }

    #[tokio::test]
    async fn cannot_acquire_while_another_holds_lease() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let first = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        assert!(first.is_leader());

        let second = elector.try_acquire(LOCK_KEY, "janitor-b").await?;
        assert_eq!(
            second,
            LeadershipResult::NotLeader {
                current_leader: Some("janitor-a".to_string())
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn holder_reacquire_rotates_the_token() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let first = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        let token1 = first.lease_token().unwrap().to_string();

        let second = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        let token2 = second.lease_token().unwrap().to_string();

        assert!(second.is_leader());
        assert_ne!(token1, token2);

        Ok(())
    }

    #[tokio::test]
    async fn renew_extends_without_rotating_token() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let acquired = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        let token = acquired.lease_token().unwrap().to_string();

        // The same token keeps renewing and still releases.
        assert!(elector.renew(LOCK_KEY, &token).await?.is_renewed());
        assert!(elector.renew(LOCK_KEY, &token).await?.is_renewed());
        assert!(elector.release(LOCK_KEY, &token).await?);

        Ok(())
    }

    #[tokio::test]
    async fn renew_with_invalid_token() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let _ = elector.try_acquire(LOCK_KEY, "janitor-a").await?;

        let result = elector.renew(LOCK_KEY, "wrong-token").await?;
        assert_eq!(result, RenewalResult::InvalidToken);

        Ok(())
    }

    #[tokio::test]
    async fn renew_without_a_lease_is_lost() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let result = elector.renew(LOCK_KEY, "some-token").await?;
        assert_eq!(result, RenewalResult::Lost);

        Ok(())
    }

    #[tokio::test]
    async fn release_clears_the_leader() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let acquired = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        let token = acquired.lease_token().unwrap();

        assert_eq!(
            elector.current_leader(LOCK_KEY).await?,
            Some("janitor-a".to_string())
        );

        assert!(elector.release(LOCK_KEY, token).await?);
        assert_eq!(elector.current_leader(LOCK_KEY).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn release_with_wrong_token_keeps_the_lease() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        let _ = elector.try_acquire(LOCK_KEY, "janitor-a").await?;

        assert!(!elector.release(LOCK_KEY, "wrong-token").await?);
        assert_eq!(
            elector.current_leader(LOCK_KEY).await?,
            Some("janitor-a".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn current_leader_when_no_lease() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        assert_eq!(elector.current_leader(LOCK_KEY).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn lock_keys_are_independent() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_secs(15));

        assert!(elector
            .try_acquire(LOCK_KEY, "janitor-a")
            .await?
            .is_leader());
        assert!(elector
            .try_acquire("log-backup", "janitor-b")
            .await?
            .is_leader());

        assert_eq!(
            elector.current_leader(LOCK_KEY).await?,
            Some("janitor-a".to_string())
        );
        assert_eq!(
            elector.current_leader("log-backup").await?,
            Some("janitor-b".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_millis(1));

        let _ = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = elector.try_acquire(LOCK_KEY, "janitor-b").await?;
        assert!(result.is_leader());
        assert_eq!(
            elector.current_leader(LOCK_KEY).await?,
            Some("janitor-b".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn expired_lease_cannot_renew() -> Result<()> {
        let elector = InMemoryLeaderElector::new(Duration::from_millis(1));

        let acquired = elector.try_acquire(LOCK_KEY, "janitor-a").await?;
        let token = acquired.lease_token().unwrap().to_string();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = elector.renew(LOCK_KEY, &token).await?;
        assert_eq!(result, RenewalResult::Lost);

        Ok(())
    }
}
