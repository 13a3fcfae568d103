//! Metric catalog, attribute values and the metrics builder.
//!
//! Every metric the network scraper can report is listed in [`Metric`] with
//! its telemetry name, unit and sum semantics. The [`MetricsBuilder`]
//! accumulates data points for enabled metrics and emits an immutable
//! [`Metrics`] snapshot once per scrape.

mod builder;
mod model;

pub use builder::MetricsBuilder;
pub use model::{MetricSeries, Metrics, NumberDataPoint, Resource, Temporality, Timestamp};

/// Instrumentation scope reported with every snapshot.
pub const SCOPE_NAME: &str = "netscrape/network";

/// Metrics reported by the network scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Connections,
    ConntrackCount,
    ConntrackMax,
    Dropped,
    Errors,
    Io,
    Packets,
    UdpBufErrors,
    UdpDatagrams,
    UdpErrors,
    /// Enable key only; its values are recorded on `UdpErrors`.
    UdpNoPorts,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::Connections,
        Metric::ConntrackCount,
        Metric::ConntrackMax,
        Metric::Dropped,
        Metric::Errors,
        Metric::Io,
        Metric::Packets,
        Metric::UdpBufErrors,
        Metric::UdpDatagrams,
        Metric::UdpErrors,
        Metric::UdpNoPorts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Connections => "system.network.connections",
            Metric::ConntrackCount => "system.network.conntrack.count",
            Metric::ConntrackMax => "system.network.conntrack.max",
            Metric::Dropped => "system.network.dropped",
            Metric::Errors => "system.network.errors",
            Metric::Io => "system.network.io",
            Metric::Packets => "system.network.packets",
            Metric::UdpBufErrors => "system.network.udp.buf_errors",
            Metric::UdpDatagrams => "system.network.udp.datagrams",
            Metric::UdpErrors => "system.network.udp.errors",
            Metric::UdpNoPorts => "system.network.udp.no_ports",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Metric::Connections => "The number of connections.",
            Metric::ConntrackCount => "The count of entries in conntrack table.",
            Metric::ConntrackMax => "The limit for entries in the conntrack table.",
            Metric::Dropped => "The number of packets dropped.",
            Metric::Errors => "The number of errors encountered.",
            Metric::Io => "The number of bytes transmitted and received.",
            Metric::Packets => "The number of packets transferred.",
            Metric::UdpBufErrors => "The number of UDP buffer errors.",
            Metric::UdpDatagrams => "The number of UDP datagrams transferred.",
            Metric::UdpErrors => "The number of UDP receive errors.",
            Metric::UdpNoPorts => "The number of UDP datagrams received for unknown ports.",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Connections => "{connections}",
            Metric::ConntrackCount | Metric::ConntrackMax => "{entries}",
            Metric::Dropped | Metric::Packets => "{packets}",
            Metric::Errors | Metric::UdpBufErrors | Metric::UdpErrors | Metric::UdpNoPorts => {
                "{errors}"
            }
            Metric::Io => "By",
            Metric::UdpDatagrams => "{datagrams}",
        }
    }

    /// Gauge-like sums (current connection and table counts) are not monotonic.
    pub fn is_monotonic(self) -> bool {
        !matches!(
            self,
            Metric::Connections | Metric::ConntrackCount | Metric::ConntrackMax
        )
    }
}

/// `direction` attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Transmit,
    Receive,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Transmit => "transmit",
            Direction::Receive => "receive",
        }
    }
}

/// `protocol` attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
        }
    }
}
