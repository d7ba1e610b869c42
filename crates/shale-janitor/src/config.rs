//! Environment-driven configuration for the janitor daemon.
//!
//! Every knob has a `SHALE_JANITOR_*` environment variable and a default
//! matching the reference deployment. Values are strict: a present but
//! invalid value is a configuration error, never silently replaced.

use std::time::Duration;

use ulid::Ulid;

use crate::error::{Error, Result};
use crate::leader::LeaseSettings;

const ENV_PURGE_INTERVAL_SECS: &str = "SHALE_JANITOR_PURGE_INTERVAL_SECS";
const ENV_GC_INTERVAL_SECS: &str = "SHALE_JANITOR_GC_INTERVAL_SECS";
const ENV_BACKLOG_INTERVAL_SECS: &str = "SHALE_JANITOR_BACKLOG_INTERVAL_SECS";
const ENV_LEASE_SECS: &str = "SHALE_JANITOR_LEASE_SECS";
const ENV_RENEW_SECS: &str = "SHALE_JANITOR_RENEW_SECS";
const ENV_RETRY_SECS: &str = "SHALE_JANITOR_RETRY_SECS";
const ENV_LOCK_KEY: &str = "SHALE_JANITOR_LOCK_KEY";
const ENV_INSTANCE_ID: &str = "SHALE_JANITOR_INSTANCE_ID";
const ENV_UNHEALTHY_THRESHOLD_SECS: &str = "SHALE_JANITOR_UNHEALTHY_THRESHOLD_SECS";

const DEFAULT_PURGE_INTERVAL_SECS: u64 = 10;
const DEFAULT_GC_INTERVAL_SECS: u64 = 7200;
const DEFAULT_BACKLOG_INTERVAL_SECS: u64 = 1;
const DEFAULT_LEASE_SECS: u64 = 15;
const DEFAULT_RENEW_SECS: u64 = 10;
const DEFAULT_RETRY_SECS: u64 = 2;
const DEFAULT_LOCK_KEY: &str = "log-janitor";
const DEFAULT_UNHEALTHY_THRESHOLD_SECS: u64 = 60;

/// Janitor daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Interval between routine purge passes.
    pub purge_interval: Duration,
    /// Interval between deep garbage-collection passes.
    pub gc_interval: Duration,
    /// Interval between backlog gauge samples.
    pub backlog_interval: Duration,
    /// Leadership lease timing.
    pub lease: LeaseSettings,
    /// Election lock key shared by all janitor replicas.
    pub lock_key: String,
    /// Identity this replica campaigns under.
    pub instance_id: String,
    /// Seconds without a successful purge before the leader reports
    /// unhealthy.
    pub unhealthy_threshold_secs: u64,
}

impl JanitorConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a provided value is not a positive
    /// integer, is blank, or the lease intervals are inconsistent.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration with a custom environment source.
    ///
    /// This entry point is test-friendly and accepts a key lookup function.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a provided value is not a positive
    /// integer, is blank, or the lease intervals are inconsistent.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let purge_interval_secs = parse_positive_u64_env(
            &get_env,
            ENV_PURGE_INTERVAL_SECS,
            DEFAULT_PURGE_INTERVAL_SECS,
        )?;
        let gc_interval_secs =
            parse_positive_u64_env(&get_env, ENV_GC_INTERVAL_SECS, DEFAULT_GC_INTERVAL_SECS)?;
        let backlog_interval_secs = parse_positive_u64_env(
            &get_env,
            ENV_BACKLOG_INTERVAL_SECS,
            DEFAULT_BACKLOG_INTERVAL_SECS,
        )?;
        let lease_secs = parse_positive_u64_env(&get_env, ENV_LEASE_SECS, DEFAULT_LEASE_SECS)?;
        let renew_secs = parse_positive_u64_env(&get_env, ENV_RENEW_SECS, DEFAULT_RENEW_SECS)?;
        let retry_secs = parse_positive_u64_env(&get_env, ENV_RETRY_SECS, DEFAULT_RETRY_SECS)?;
        let unhealthy_threshold_secs = parse_positive_u64_env(
            &get_env,
            ENV_UNHEALTHY_THRESHOLD_SECS,
            DEFAULT_UNHEALTHY_THRESHOLD_SECS,
        )?;

        let lease = LeaseSettings {
            lease_duration: Duration::from_secs(lease_secs),
            renew_interval: Duration::from_secs(renew_secs),
            retry_interval: Duration::from_secs(retry_secs),
        };
        lease.validate()?;

        let lock_key = non_blank_env(&get_env, ENV_LOCK_KEY, DEFAULT_LOCK_KEY)?;
        let instance_id = match get_env(ENV_INSTANCE_ID) {
            Some(value) if value.trim().is_empty() => {
                return Err(Error::configuration(format!(
                    "{ENV_INSTANCE_ID} must not be blank"
                )));
            }
            Some(value) => value,
            None => generate_instance_id(),
        };

        Ok(Self {
            purge_interval: Duration::from_secs(purge_interval_secs),
            gc_interval: Duration::from_secs(gc_interval_secs),
            backlog_interval: Duration::from_secs(backlog_interval_secs),
            lease,
            lock_key,
            instance_id,
            unhealthy_threshold_secs,
        })
    }
}

/// A fresh replica identity, used when none is configured.
fn generate_instance_id() -> String {
    format!("janitor-{}", Ulid::new())
}

fn non_blank_env<F>(get_env: &F, key: &str, default: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(default.to_string());
    };
    if raw.trim().is_empty() {
        return Err(Error::configuration(format!("{key} must not be blank")));
    }
    Ok(raw)
}

fn parse_positive_u64_env<F>(get_env: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(default);
    };

    let parsed = raw.parse::<u64>().map_err(|_| {
        Error::configuration(format!("{key} must be a positive integer, got '{raw}'"))
    })?;
    if parsed == 0 {
        return Err(Error::configuration(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(parsed)
}
