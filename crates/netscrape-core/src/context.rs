//! Per-scrape query context: cancellation, deadline and environment overrides.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::source::StatError;

/// Environment overrides handed to the stat source.
///
/// Keys follow the conventional container-mount variables, e.g.
/// `HOST_PROC=/hostfs/proc` when `/proc` of the host is bind-mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EnvOverrides(BTreeMap<String, String>);

impl EnvOverrides {
    /// Root of the proc filesystem.
    pub const HOST_PROC: &'static str = "HOST_PROC";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies every entry of `other` over `self`.
    pub fn merge(&mut self, other: &EnvOverrides) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

/// Context threaded through every stat source query.
///
/// The cancellation flag is shared with the caller: setting it aborts the
/// remaining queries of the current scrape. Each query of a cancelled or
/// expired context fails, which the scraper counts as a partial failure.
#[derive(Debug, Clone, Default)]
pub struct ScrapeContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    env: EnvOverrides,
}

impl ScrapeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares an externally owned cancellation flag (e.g. a shutdown signal).
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    /// Returns a copy whose environment has `overrides` layered on top.
    pub fn layered_env(&self, overrides: &EnvOverrides) -> Self {
        let mut ctx = self.clone();
        ctx.env.merge(overrides);
        ctx
    }

    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), StatError> {
        if self.is_cancelled() {
            return Err(StatError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(StatError::DeadlineExceeded);
        }
        Ok(())
    }
}
