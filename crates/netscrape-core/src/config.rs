//! Scraper configuration.
//!
//! Deserialized from JSON with every field optional; missing metrics keep
//! their default enable state. Validation (filter compilation) happens when
//! the scraper is constructed.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::context::EnvOverrides;
use crate::filter::FilterSetKind;
use crate::metadata::Metric;

/// Configuration errors. All of them prevent a scraper from being created.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error creating network interface {set} filters: {source}")]
    Filter {
        set: FilterSetKind,
        #[source]
        source: regex::Error,
    },
    #[error("unknown metric {0:?}")]
    UnknownMetric(String),
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Enable switch of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub enabled: bool,
}

impl MetricConfig {
    const fn on() -> Self {
        Self { enabled: true }
    }

    const fn off() -> Self {
        Self { enabled: false }
    }
}

/// Enable switches for every metric of the network scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(rename = "system.network.connections")]
    pub system_network_connections: MetricConfig,
    #[serde(rename = "system.network.conntrack.count")]
    pub system_network_conntrack_count: MetricConfig,
    #[serde(rename = "system.network.conntrack.max")]
    pub system_network_conntrack_max: MetricConfig,
    #[serde(rename = "system.network.dropped")]
    pub system_network_dropped: MetricConfig,
    #[serde(rename = "system.network.errors")]
    pub system_network_errors: MetricConfig,
    #[serde(rename = "system.network.io")]
    pub system_network_io: MetricConfig,
    #[serde(rename = "system.network.packets")]
    pub system_network_packets: MetricConfig,
    #[serde(rename = "system.network.udp.buf_errors")]
    pub system_network_udp_buf_errors: MetricConfig,
    #[serde(rename = "system.network.udp.datagrams")]
    pub system_network_udp_datagrams: MetricConfig,
    #[serde(rename = "system.network.udp.errors")]
    pub system_network_udp_errors: MetricConfig,
    /// Gates the `NoPorts` counter. The value is reported on the
    /// `system.network.udp.errors` series, so it is only emitted when that
    /// metric is enabled as well.
    #[serde(rename = "system.network.udp.no_ports")]
    pub system_network_udp_no_ports: MetricConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            system_network_connections: MetricConfig::on(),
            system_network_conntrack_count: MetricConfig::off(),
            system_network_conntrack_max: MetricConfig::off(),
            system_network_dropped: MetricConfig::on(),
            system_network_errors: MetricConfig::on(),
            system_network_io: MetricConfig::on(),
            system_network_packets: MetricConfig::on(),
            system_network_udp_buf_errors: MetricConfig::off(),
            system_network_udp_datagrams: MetricConfig::off(),
            system_network_udp_errors: MetricConfig::off(),
            system_network_udp_no_ports: MetricConfig::off(),
        }
    }
}

impl MetricsConfig {
    pub fn get(&self, metric: Metric) -> &MetricConfig {
        match metric {
            Metric::Connections => &self.system_network_connections,
            Metric::ConntrackCount => &self.system_network_conntrack_count,
            Metric::ConntrackMax => &self.system_network_conntrack_max,
            Metric::Dropped => &self.system_network_dropped,
            Metric::Errors => &self.system_network_errors,
            Metric::Io => &self.system_network_io,
            Metric::Packets => &self.system_network_packets,
            Metric::UdpBufErrors => &self.system_network_udp_buf_errors,
            Metric::UdpDatagrams => &self.system_network_udp_datagrams,
            Metric::UdpErrors => &self.system_network_udp_errors,
            Metric::UdpNoPorts => &self.system_network_udp_no_ports,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut MetricConfig {
        match metric {
            Metric::Connections => &mut self.system_network_connections,
            Metric::ConntrackCount => &mut self.system_network_conntrack_count,
            Metric::ConntrackMax => &mut self.system_network_conntrack_max,
            Metric::Dropped => &mut self.system_network_dropped,
            Metric::Errors => &mut self.system_network_errors,
            Metric::Io => &mut self.system_network_io,
            Metric::Packets => &mut self.system_network_packets,
            Metric::UdpBufErrors => &mut self.system_network_udp_buf_errors,
            Metric::UdpDatagrams => &mut self.system_network_udp_datagrams,
            Metric::UdpErrors => &mut self.system_network_udp_errors,
            Metric::UdpNoPorts => &mut self.system_network_udp_no_ports,
        }
    }

    /// Toggles a metric by its telemetry name (`system.network.io`).
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        let metric =
            Metric::from_name(name).ok_or_else(|| ConfigError::UnknownMetric(name.to_string()))?;
        self.get_mut(metric).enabled = enabled;
        Ok(())
    }

    /// Names of the enabled metrics in catalog order.
    pub fn enabled_metrics(&self) -> Vec<&'static str> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.get(*m).enabled)
            .map(Metric::name)
            .collect()
    }
}

/// How interface patterns are matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Exact name equality.
    #[default]
    Strict,
    /// Regular expression, unanchored unless the pattern anchors itself.
    Regexp,
}

/// Interface name rules of one filter set. No interfaces means no set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub interfaces: Vec<String>,
    pub match_type: MatchType,
}

impl MatchConfig {
    pub fn new(interfaces: Vec<String>, match_type: MatchType) -> Self {
        Self {
            interfaces,
            match_type,
        }
    }
}

/// Full configuration of a network scraper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScraperConfig {
    pub metrics: MetricsConfig,
    pub include: MatchConfig,
    pub exclude: MatchConfig,
    /// Passed to the stat source with every query.
    pub env: EnvOverrides,
    /// Reported as the `host.name` resource attribute.
    pub host_name: Option<String>,
}

impl ScraperConfig {
    pub fn from_json_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content, path)
    }
}
