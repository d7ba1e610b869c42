//! Leader election for the janitor singleton.
//!
//! Many janitor replicas may run for availability, but purge and garbage
//! collection must be driven by exactly one of them at a time. The
//! [`LeaderElector`] trait provides a pluggable election mechanism, separate
//! from log storage concerns:
//!
//! - **Testing**: Use [`InMemoryLeaderElector`] for unit tests and local
//!   development
//! - **Production**: Use a shared backend such as Postgres advisory locks or
//!   etcd leases
//!
//! ## Design Principles
//!
//! - **Leases, not locks**: The leader holds a time-bounded lease, not an
//!   indefinite lock
//! - **Heartbeat renewal**: The leader must renew periodically or lose
//!   leadership
//! - **Graceful handoff**: A shutting-down leader releases its lease so
//!   failover does not wait out the full lease duration
//!
//! ## Safety
//!
//! Purge and GC are deletion passes. Election ensures only one instance runs
//! them at a time, but correctness does not depend on it: both passes only
//! delete below the monotonic compaction boundary, so an overlapping pass
//! during a leadership handover merely repeats idempotent work.

pub mod campaign;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use campaign::{LeaderStatus, LeadershipCampaign, LeaseSettings};
pub use memory::InMemoryLeaderElector;

/// Result of a leadership acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadershipResult {
    /// Successfully acquired leadership.
    Acquired {
        /// Lease token that must be used for renewal and release.
        lease_token: String,
        /// Duration until the lease expires.
        lease_duration: Duration,
    },
    /// Leadership is held by another instance.
    NotLeader {
        /// Identifier of the current leader, if known.
        current_leader: Option<String>,
    },
}

impl LeadershipResult {
    /// Returns true if leadership was acquired.
    #[must_use]
    pub const fn is_leader(&self) -> bool {
        matches!(self, Self::Acquired { .. })
    }

    /// Returns the lease token if leadership was acquired.
    #[must_use]
    pub fn lease_token(&self) -> Option<&str> {
        match self {
            Self::Acquired { lease_token, .. } => Some(lease_token),
            Self::NotLeader { .. } => None,
        }
    }
}

/// Result of a lease renewal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalResult {
    /// Successfully renewed the lease.
    Renewed {
        /// New lease duration.
        lease_duration: Duration,
    },
    /// The lease expired or was taken by another instance.
    Lost,
    /// The provided lease token does not match the current lease.
    InvalidToken,
}

impl RenewalResult {
    /// Returns true if the lease was successfully renewed.
    #[must_use]
    pub const fn is_renewed(&self) -> bool {
        matches!(self, Self::Renewed { .. })
    }
}

/// Lease-based leader election for coordinated deletion work.
///
/// ## Example Usage
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use shale_janitor::error::Result;
/// use shale_janitor::leader::{LeaderElector, LeadershipResult};
///
/// async fn run_purge_pass() {}
///
/// async fn run_janitor<L: LeaderElector>(elector: &L, instance_id: &str) -> Result<()> {
///     loop {
///         match elector.try_acquire("log-janitor", instance_id).await? {
///             LeadershipResult::Acquired { lease_token, .. } => {
///                 // We are the leader: run gated work, then keep renewing.
///                 run_purge_pass().await;
///                 elector.renew("log-janitor", &lease_token).await?;
///             }
///             LeadershipResult::NotLeader { .. } => {
///                 tokio::time::sleep(Duration::from_secs(2)).await;
///             }
///         }
///     }
/// }
/// ```
///
/// In the daemon this loop is [`LeadershipCampaign`], which publishes the
/// current state over a watch channel instead of being polled inline.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from async
/// tasks.
#[async_trait]
pub trait LeaderElector: Send + Sync {
    /// Attempts to acquire leadership for a lock key.
    ///
    /// # Arguments
    ///
    /// * `lock_key` - Identifier for the coordinated role (e.g. "log-janitor")
    /// * `instance_id` - Unique identifier for this instance
    ///
    /// # Errors
    ///
    /// Returns an error if the election backend cannot be reached.
    async fn try_acquire(&self, lock_key: &str, instance_id: &str) -> Result<LeadershipResult>;

    /// Renews an existing lease.
    ///
    /// Must be called before the lease expires to maintain leadership.
    ///
    /// # Errors
    ///
    /// Returns an error if the election backend cannot be reached.
    async fn renew(&self, lock_key: &str, lease_token: &str) -> Result<RenewalResult>;

    /// Voluntarily releases leadership.
    ///
    /// Called during orderly shutdown so another instance can take over
    /// without waiting for the lease to expire. Returns `true` if the lease
    /// was held and released.
    ///
    /// # Errors
    ///
    /// Returns an error if the election backend cannot be reached.
    async fn release(&self, lock_key: &str, lease_token: &str) -> Result<bool>;

    /// Returns the instance ID of the current leader, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the election backend cannot be reached.
    async fn current_leader(&self, lock_key: &str) -> Result<Option<String>>;
}
