//! Snapshot structures produced by the metrics builder.
//!
//! A [`Metrics`] snapshot is immutable once emitted and serializes to the
//! JSON line format written by the daemon.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_unix_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    pub fn now() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        Self(u64::try_from(nanos).unwrap_or(0))
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn to_rfc3339(self) -> String {
        let nanos = i64::try_from(self.0).unwrap_or(i64::MAX);
        DateTime::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporality {
    Cumulative,
}

/// One sample of a metric series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberDataPoint {
    /// Start of the cumulative window (host boot time).
    pub start_time: Timestamp,
    /// When the sample was taken.
    pub timestamp: Timestamp,
    pub value: i64,
    pub attributes: BTreeMap<&'static str, String>,
}

impl NumberDataPoint {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A named sum series with its data points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSeries {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub is_monotonic: bool,
    pub aggregation_temporality: Temporality,
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub attributes: BTreeMap<String, String>,
}

/// Metrics snapshot of one scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub resource: Resource,
    pub scope: &'static str,
    pub metrics: Vec<MetricSeries>,
}

impl Metrics {
    pub fn metric(&self, name: &str) -> Option<&MetricSeries> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn data_point_count(&self) -> usize {
        self.metrics.iter().map(|m| m.data_points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterates over every data point whose attribute `key` equals `value`.
    pub fn points_with_attribute<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> impl Iterator<Item = (&'a MetricSeries, &'a NumberDataPoint)> + 'a {
        self.metrics.iter().flat_map(move |metric| {
            metric
                .data_points
                .iter()
                .filter(move |p| p.attribute(key) == Some(value))
                .map(move |p| (metric, p))
        })
    }
}
