//! Read policy configuration.
//!
//! Defaults give the strict, sequential behaviour: any failure aborts the
//! affected subtree, keys vanishing mid-read are dropped with a warning,
//! and each backend call gets [`DEFAULT_CALL_TIMEOUT`].

use std::str::FromStr;
use std::time::Duration;

use strum::{Display, EnumString};

use crate::error::{ReaderError, Result};

/// Default per-call backend timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// What to do when a child subtree fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole read and return the error.
    #[default]
    Strict,
    /// Substitute an empty value for the failed branch, record the
    /// failure and continue.
    BestEffort,
}

/// What to do when a listed key is gone by the time it is hydrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MissingInstancePolicy {
    /// Drop the instance with a warning.
    #[default]
    Skip,
    /// Treat it as a failure of the list node.
    Fail,
}

/// What to do when `list_keys` returns the same key more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Keep the first occurrence and warn.
    #[default]
    FirstWins,
    /// Fail the list node with `DuplicateKey`.
    Reject,
}

/// Configuration of a [`ReadOrchestrator`](crate::ReadOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Whether a failed branch aborts the read (`STATETREE_FAILURE_POLICY`).
    pub failure_policy: FailurePolicy,
    /// What to do with keys that vanish before hydration (`STATETREE_MISSING_INSTANCE`).
    pub missing_instance: MissingInstancePolicy,
    /// What to do when `list_keys` repeats a key (`STATETREE_DUPLICATE_KEYS`).
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Upper bound on each customizer call (`STATETREE_CALL_TIMEOUT_MS`).
    pub call_timeout: Duration,
    /// Sort listed keys instead of keeping backend order (`STATETREE_SORT_KEYS`).
    pub sort_keys: bool,
    /// Read sibling subtrees concurrently (`STATETREE_PARALLEL_SIBLINGS`).
    ///
    /// Results are still merged in registry order.
    pub parallel_siblings: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            missing_instance: MissingInstancePolicy::default(),
            duplicate_keys: DuplicateKeyPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            sort_keys: false,
            parallel_siblings: false,
        }
    }
}

impl ReaderConfig {
    /// Read the configuration from `STATETREE_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("STATETREE_FAILURE_POLICY") {
            config.failure_policy = parse_var("STATETREE_FAILURE_POLICY", &v)?;
        }
        if let Some(v) = lookup("STATETREE_MISSING_INSTANCE") {
            config.missing_instance = parse_var("STATETREE_MISSING_INSTANCE", &v)?;
        }
        if let Some(v) = lookup("STATETREE_DUPLICATE_KEYS") {
            config.duplicate_keys = parse_var("STATETREE_DUPLICATE_KEYS", &v)?;
        }
        if let Some(v) = lookup("STATETREE_CALL_TIMEOUT_MS") {
            let millis: u64 = parse_var("STATETREE_CALL_TIMEOUT_MS", &v)?;
            config.call_timeout = Duration::from_millis(millis);
        }
        if let Some(v) = lookup("STATETREE_SORT_KEYS") {
            config.sort_keys = parse_flag("STATETREE_SORT_KEYS", &v)?;
        }
        if let Some(v) = lookup("STATETREE_PARALLEL_SIBLINGS") {
            config.parallel_siblings = parse_flag("STATETREE_PARALLEL_SIBLINGS", &v)?;
        }

        Ok(config)
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set how vanished instances are handled.
    pub fn with_missing_instance(mut self, policy: MissingInstancePolicy) -> Self {
        self.missing_instance = policy;
        self
    }

    /// Set how repeated keys from `list_keys` are handled.
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sort listed keys (or keep backend order).
    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    /// Read siblings concurrently.
    pub fn with_parallel_siblings(mut self, parallel: bool) -> Self {
        self.parallel_siblings = parallel;
        self
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ReaderError::Config(format!("invalid value '{value}' for {name}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ReaderError::Config(format!(
            "invalid value '{value}' for {name}, expected true or false"
        ))),
    }
}
