//! Partial-failure accumulation for one scrape cycle.

use std::fmt;

use crate::config::ConfigError;
use crate::source::StatError;

/// Failure of one metric group.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("failed to read network IO stats: {0}")]
    IoCounters(#[source] StatError),
    #[error("failed to read TCP connections: {0}")]
    Connections(#[source] StatError),
    #[error("failed to read conntrack info: {0}")]
    Conntrack(#[source] StatError),
    #[error("no conntrack counters available")]
    NoConntrackCounters,
    #[error("failed to read network proto counters: {0}")]
    ProtoCounters(#[source] StatError),
    #[error("no network proto counters available")]
    NoProtoCounters,
}

/// A group failure together with the number of metrics it left unreported.
#[derive(Debug)]
pub struct PartialFailure {
    pub failed: usize,
    pub cause: GroupError,
}

/// Collects group failures during a scrape. Groups never short-circuit.
#[derive(Debug, Default)]
pub struct ScrapeErrors {
    failures: Vec<PartialFailure>,
}

impl ScrapeErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_partial(&mut self, failed: usize, cause: GroupError) {
        self.failures.push(PartialFailure { failed, cause });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Folds the collected failures into one error, `None` when there were none.
    pub fn combine(self) -> Option<ScrapeError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(ScrapeError {
                failures: self.failures,
            })
        }
    }
}

/// Combined partial failure of a scrape.
#[derive(Debug)]
pub struct ScrapeError {
    failures: Vec<PartialFailure>,
}

impl ScrapeError {
    /// Total number of metrics that could not be reported.
    pub fn failed_metrics(&self) -> usize {
        self.failures.iter().map(|f| f.failed).sum()
    }

    pub fn failures(&self) -> &[PartialFailure] {
        &self.failures
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({} metrics)", failure.cause, failure.failed)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScrapeError {}

/// Errors that leave the caller without a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read boot time: {0}")]
    Start(#[source] StatError),
    #[error("scrape called before start")]
    NotStarted,
}
