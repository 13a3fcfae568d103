//! Network scraper: turns stat source queries into a metrics snapshot.
//!
//! A scrape runs four groups in order (IO counters, TCP connections,
//! conntrack, UDP protocol counters). Each group either records its data
//! points or reports a partial failure sized by the number of metrics it
//! covers; the snapshot is returned in both cases.

mod errors;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

pub use errors::{GroupError, PartialFailure, ScrapeError, ScrapeErrors, ScraperError};

use crate::config::ScraperConfig;
use crate::context::ScrapeContext;
use crate::filter::InterfaceFilter;
use crate::metadata::{Direction, Metrics, MetricsBuilder, Protocol, Timestamp};
use crate::source::{ConnectionKind, ConnectionRecord, IoCountersRecord, StatSources};

/// Metrics covered by the IO counter group (packets, dropped, errors, io).
pub const NETWORK_METRICS_LEN: usize = 4;
/// Metrics covered by the connections group and by the conntrack group.
pub const CONNECTIONS_METRICS_LEN: usize = 1;
/// Metrics covered by the UDP protocol counter group.
pub const PROTO_METRICS_LEN: usize = 4;

/// TCP states reported on every scrape, zero when no socket is in them.
pub const TCP_STATES: [&str; 12] = [
    "CLOSE",
    "CLOSE_WAIT",
    "CLOSING",
    "DELETE",
    "ESTABLISHED",
    "FIN_WAIT1",
    "FIN_WAIT2",
    "LAST_ACK",
    "LISTEN",
    "SYN_SENT",
    "SYN_RECV",
    "TIME_WAIT",
];

/// Counts connections per state.
///
/// Every state of [`TCP_STATES`] is present. Labels outside that vocabulary
/// are counted under their own key, so the counts always sum to
/// `connections.len()`.
pub fn tcp_connection_status_counts(connections: &[ConnectionRecord]) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> =
        TCP_STATES.iter().map(|state| (state.to_string(), 0)).collect();
    for connection in connections {
        *counts.entry(connection.status.clone()).or_insert(0) += 1;
    }
    counts
}

/// Result of a scrape: the snapshot plus the partial failures, if any.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub metrics: Metrics,
    pub error: Option<ScrapeError>,
}

impl ScrapeOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

pub struct NetworkScraper {
    config: ScraperConfig,
    filter: InterfaceFilter,
    sources: StatSources,
    start_time: Option<Timestamp>,
    builder: Option<MetricsBuilder>,
}

impl NetworkScraper {
    /// Validates the configuration and compiles the interface filter.
    pub fn new(config: ScraperConfig, sources: StatSources) -> Result<Self, ScraperError> {
        let filter = InterfaceFilter::from_config(&config.include, &config.exclude)?;
        Ok(Self {
            config,
            filter,
            sources,
            start_time: None,
            builder: None,
        })
    }

    /// Captures the host boot time as the start of every cumulative series.
    ///
    /// Calling `start` on a started scraper does nothing.
    pub fn start(&mut self, ctx: &ScrapeContext) -> Result<(), ScraperError> {
        if self.builder.is_some() {
            return Ok(());
        }
        let ctx = ctx.layered_env(&self.config.env);
        let boot_time = self
            .sources
            .boot_time
            .boot_time(&ctx)
            .map_err(ScraperError::Start)?;
        let start_time = Timestamp::from_unix_secs(boot_time);

        let mut builder = MetricsBuilder::new(self.config.metrics, start_time);
        if let Some(host_name) = &self.config.host_name {
            builder = builder.with_resource_attribute("host.name", host_name.clone());
        }
        info!(boot_time = %start_time.to_rfc3339(), "network scraper started");

        self.start_time = Some(start_time);
        self.builder = Some(builder);
        Ok(())
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Runs one collection cycle.
    pub fn scrape(&mut self, ctx: &ScrapeContext) -> Result<ScrapeOutcome, ScraperError> {
        let mut builder = self.builder.take().ok_or(ScraperError::NotStarted)?;
        let ctx = ctx.layered_env(&self.config.env);
        let mut errors = ScrapeErrors::new();

        if let Err(e) = self.record_network_counter_metrics(&ctx, &mut builder) {
            errors.add_partial(NETWORK_METRICS_LEN, e);
        }
        if let Err(e) = self.record_network_connections_metrics(&ctx, &mut builder) {
            errors.add_partial(CONNECTIONS_METRICS_LEN, e);
        }
        if let Err(e) = self.record_network_conntrack_metrics(&ctx, &mut builder) {
            errors.add_partial(CONNECTIONS_METRICS_LEN, e);
        }
        if let Err(e) = self.record_network_proto_counter_metrics(&ctx, &mut builder) {
            errors.add_partial(PROTO_METRICS_LEN, e);
        }

        let metrics = builder.emit();
        self.builder = Some(builder);

        let error = errors.combine();
        if let Some(err) = &error {
            warn!(failed = err.failed_metrics(), error = %err, "network scrape partially failed");
        }
        debug!(
            metrics = metrics.metric_count(),
            points = metrics.data_point_count(),
            "network scrape finished"
        );
        Ok(ScrapeOutcome { metrics, error })
    }

    /// Stops the scraper. Buffered state is dropped.
    pub fn shutdown(self) {
        debug!("network scraper stopped");
    }

    fn record_network_counter_metrics(
        &self,
        ctx: &ScrapeContext,
        builder: &mut MetricsBuilder,
    ) -> Result<(), GroupError> {
        let now = Timestamp::now();
        let io_counters = self
            .sources
            .io_counters
            .io_counters(ctx, true)
            .map_err(GroupError::IoCounters)?;
        let io_counters = self.filter.filter_by_interface(io_counters);

        if !io_counters.is_empty() {
            record_network_packets_metric(builder, now, &io_counters);
            record_network_dropped_packets_metric(builder, now, &io_counters);
            record_network_error_packets_metric(builder, now, &io_counters);
            record_network_io_metric(builder, now, &io_counters);
        }
        debug!(interfaces = io_counters.len(), "recorded network IO counters");
        Ok(())
    }

    fn record_network_connections_metrics(
        &self,
        ctx: &ScrapeContext,
        builder: &mut MetricsBuilder,
    ) -> Result<(), GroupError> {
        if !self.config.metrics.system_network_connections.enabled {
            return Ok(());
        }
        let now = Timestamp::now();
        let connections = self
            .sources
            .connections
            .connections(ctx, ConnectionKind::Tcp)
            .map_err(GroupError::Connections)?;

        let counts = tcp_connection_status_counts(&connections);
        for (state, count) in &counts {
            builder.record_system_network_connections_data_point(now, *count, Protocol::Tcp, state);
        }
        debug!(connections = connections.len(), "recorded TCP connection states");
        Ok(())
    }

    fn record_network_conntrack_metrics(
        &self,
        ctx: &ScrapeContext,
        builder: &mut MetricsBuilder,
    ) -> Result<(), GroupError> {
        let metrics = &self.config.metrics;
        let count_enabled = metrics.system_network_conntrack_count.enabled;
        let max_enabled = metrics.system_network_conntrack_max.enabled;
        if !count_enabled && !max_enabled {
            return Ok(());
        }
        let now = Timestamp::now();
        let conntrack = self
            .sources
            .conntrack
            .conntrack(ctx)
            .map_err(GroupError::Conntrack)?;
        if conntrack.is_empty() {
            return Err(GroupError::NoConntrackCounters);
        }

        for stats in &conntrack {
            if count_enabled {
                builder.record_system_network_conntrack_count_data_point(
                    now,
                    to_value(stats.conntrack_count),
                );
            }
            if max_enabled {
                builder.record_system_network_conntrack_max_data_point(
                    now,
                    to_value(stats.conntrack_max),
                );
            }
        }
        Ok(())
    }

    fn record_network_proto_counter_metrics(
        &self,
        ctx: &ScrapeContext,
        builder: &mut MetricsBuilder,
    ) -> Result<(), GroupError> {
        let metrics = &self.config.metrics;
        let datagrams = metrics.system_network_udp_datagrams.enabled;
        let buf_errors = metrics.system_network_udp_buf_errors.enabled;
        let udp_errors = metrics.system_network_udp_errors.enabled;
        let no_ports = metrics.system_network_udp_no_ports.enabled;
        if !(datagrams || buf_errors || udp_errors || no_ports) {
            return Ok(());
        }
        let now = Timestamp::now();
        let counters = self
            .sources
            .proto_counters
            .proto_counters(ctx, &["udp"])
            .map_err(GroupError::ProtoCounters)?;
        if counters.is_empty() {
            return Err(GroupError::NoProtoCounters);
        }

        for counter in &counters {
            if datagrams {
                builder.record_system_network_udp_datagrams_data_point(
                    now,
                    counter.stat("OutDatagrams"),
                    Direction::Transmit,
                );
                builder.record_system_network_udp_datagrams_data_point(
                    now,
                    counter.stat("InDatagrams"),
                    Direction::Receive,
                );
            }
            if buf_errors {
                builder.record_system_network_udp_buf_errors_data_point(
                    now,
                    counter.stat("SndbufErrors"),
                    Direction::Transmit,
                );
                builder.record_system_network_udp_buf_errors_data_point(
                    now,
                    counter.stat("RcvbufErrors"),
                    Direction::Receive,
                );
            }
            if udp_errors {
                builder.record_system_network_udp_errors_data_point(now, counter.stat("InErrors"));
            }
            // NoPorts goes to the errors series; see MetricsConfig::system_network_udp_no_ports.
            if no_ports {
                builder.record_system_network_udp_errors_data_point(now, counter.stat("NoPorts"));
            }
        }
        debug!(protocols = counters.len(), "recorded UDP protocol counters");
        Ok(())
    }
}

/// Counters are reported as signed values, clamped at `i64::MAX`.
fn to_value(counter: u64) -> i64 {
    i64::try_from(counter).unwrap_or(i64::MAX)
}

fn record_network_packets_metric(
    builder: &mut MetricsBuilder,
    now: Timestamp,
    records: &[IoCountersRecord],
) {
    for r in records {
        let (sent, recv) = (to_value(r.packets_sent), to_value(r.packets_recv));
        builder.record_system_network_packets_data_point(now, sent, &r.name, Direction::Transmit);
        builder.record_system_network_packets_data_point(now, recv, &r.name, Direction::Receive);
    }
}

fn record_network_dropped_packets_metric(
    builder: &mut MetricsBuilder,
    now: Timestamp,
    records: &[IoCountersRecord],
) {
    for r in records {
        let (out, in_) = (to_value(r.dropout), to_value(r.dropin));
        builder.record_system_network_dropped_data_point(now, out, &r.name, Direction::Transmit);
        builder.record_system_network_dropped_data_point(now, in_, &r.name, Direction::Receive);
    }
}

fn record_network_error_packets_metric(
    builder: &mut MetricsBuilder,
    now: Timestamp,
    records: &[IoCountersRecord],
) {
    for r in records {
        let (out, in_) = (to_value(r.errout), to_value(r.errin));
        builder.record_system_network_errors_data_point(now, out, &r.name, Direction::Transmit);
        builder.record_system_network_errors_data_point(now, in_, &r.name, Direction::Receive);
    }
}

fn record_network_io_metric(
    builder: &mut MetricsBuilder,
    now: Timestamp,
    records: &[IoCountersRecord],
) {
    for r in records {
        let (sent, recv) = (to_value(r.bytes_sent), to_value(r.bytes_recv));
        builder.record_system_network_io_data_point(now, sent, &r.name, Direction::Transmit);
        builder.record_system_network_io_data_point(now, recv, &r.name, Direction::Receive);
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    use super::*;
    use crate::collector::MockFs;
    use crate::config::{MatchConfig, MatchType, MetricsConfig};
    use crate::metadata::Metric;
    use crate::source::{ConntrackRecord, ProtoCountersRecord, StatError};

    const BOOT: Timestamp = Timestamp::from_unix_secs(1_700_000_000);

    fn typical_sources() -> StatSources {
        StatSources::procfs(MockFs::typical_host(), "/proc")
    }

    fn started(config: ScraperConfig, sources: StatSources) -> NetworkScraper {
        let mut scraper = NetworkScraper::new(config, sources).unwrap();
        scraper.start(&ScrapeContext::new()).unwrap();
        scraper
    }

    fn connection(status: &str) -> ConnectionRecord {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 80));
        ConnectionRecord {
            local_addr: addr,
            remote_addr: addr,
            status: status.to_string(),
        }
    }

    fn value_of(metrics: &Metrics, name: &str, device: &str, direction: &str) -> Option<i64> {
        metrics
            .metric(name)?
            .data_points
            .iter()
            .find(|p| {
                p.attribute("device") == Some(device) && p.attribute("direction") == Some(direction)
            })
            .map(|p| p.value)
    }

    fn udp_enabled() -> ScraperConfig {
        let mut config = ScraperConfig::default();
        for metric in [
            Metric::UdpDatagrams,
            Metric::UdpBufErrors,
            Metric::UdpErrors,
            Metric::UdpNoPorts,
        ] {
            config.metrics.get_mut(metric).enabled = true;
        }
        config
    }

    #[test]
    fn test_status_counts_cover_known_states() {
        let counts = tcp_connection_status_counts(&[]);
        assert_eq!(counts.len(), TCP_STATES.len());
        assert!(counts.values().all(|c| *c == 0));
    }

    #[test]
    fn test_status_counts_sum_to_input_len() {
        let connections = [
            connection("ESTABLISHED"),
            connection("ESTABLISHED"),
            connection("LISTEN"),
            connection("NONE"),
        ];
        let counts = tcp_connection_status_counts(&connections);

        assert_eq!(counts["ESTABLISHED"], 2);
        assert_eq!(counts["LISTEN"], 1);
        assert_eq!(counts["NONE"], 1);
        assert_eq!(counts.values().sum::<i64>(), connections.len() as i64);
    }

    #[test]
    fn test_scrape_before_start() {
        let mut scraper = NetworkScraper::new(ScraperConfig::default(), typical_sources()).unwrap();
        assert!(matches!(scraper.scrape(&ScrapeContext::new()), Err(ScraperError::NotStarted)));
    }

    #[test]
    fn test_start_failure_is_fatal() {
        let sources =
            typical_sources().with_boot_time(|_: &ScrapeContext| -> Result<u64, StatError> {
                Err(StatError::Other("no btime".into()))
            });
        let mut scraper = NetworkScraper::new(ScraperConfig::default(), sources).unwrap();

        let err = scraper.start(&ScrapeContext::new()).unwrap_err();
        assert!(matches!(err, ScraperError::Start(_)));
        assert!(scraper.start_time().is_none());
        assert!(matches!(scraper.scrape(&ScrapeContext::new()), Err(ScraperError::NotStarted)));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut scraper = started(ScraperConfig::default(), typical_sources());
        scraper.start(&ScrapeContext::new()).unwrap();
        assert_eq!(scraper.start_time(), Some(BOOT));
    }

    #[test]
    fn test_invalid_filter_fails_construction() {
        let config = ScraperConfig {
            include: MatchConfig::new(vec!["(eth".into()], MatchType::Regexp),
            ..Default::default()
        };
        let err = NetworkScraper::new(config, typical_sources()).err().unwrap();
        assert!(matches!(err, ScraperError::Config(_)));
        assert!(err.to_string().contains("include filters"));
    }

    #[test]
    fn test_default_scrape_of_typical_host() {
        let mut scraper = started(ScraperConfig::default(), typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();
        assert!(outcome.is_complete());

        let names: Vec<&str> = outcome.metrics.metrics.iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            [
                "system.network.connections",
                "system.network.dropped",
                "system.network.errors",
                "system.network.io",
                "system.network.packets",
            ]
        );

        let eth0: Vec<_> = outcome.metrics.points_with_attribute("device", "eth0").collect();
        assert_eq!(eth0.len(), 8);

        let m = &outcome.metrics;
        assert_eq!(value_of(m, "system.network.packets", "eth0", "transmit"), Some(100));
        assert_eq!(value_of(m, "system.network.packets", "eth0", "receive"), Some(200));
        assert_eq!(value_of(m, "system.network.dropped", "eth0", "transmit"), Some(1));
        assert_eq!(value_of(m, "system.network.dropped", "eth0", "receive"), Some(0));
        assert_eq!(value_of(m, "system.network.errors", "eth0", "transmit"), Some(0));
        assert_eq!(value_of(m, "system.network.errors", "eth0", "receive"), Some(2));
        assert_eq!(value_of(m, "system.network.io", "eth0", "transmit"), Some(1000));
        assert_eq!(value_of(m, "system.network.io", "eth0", "receive"), Some(2000));

        for (_, point) in &eth0 {
            assert_eq!(point.start_time, BOOT);
        }
    }

    #[test]
    fn test_connection_states_of_typical_host() {
        let mut scraper = started(ScraperConfig::default(), typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();
        let connections = outcome.metrics.metric("system.network.connections").unwrap();

        let state = |name: &str| {
            connections
                .data_points
                .iter()
                .find(|p| p.attribute("state") == Some(name))
                .map(|p| p.value)
        };
        assert_eq!(state("LISTEN"), Some(2));
        assert_eq!(state("ESTABLISHED"), Some(2));
        assert_eq!(state("TIME_WAIT"), Some(1));
        assert_eq!(state("SYN_SENT"), Some(0));
        assert!(connections.data_points.iter().all(|p| p.attribute("protocol") == Some("tcp")));
    }

    #[test]
    fn test_empty_connections_emit_zero_per_state() {
        let sources = typical_sources().with_connections(
            |_: &ScrapeContext, _: ConnectionKind| -> Result<Vec<ConnectionRecord>, StatError> {
                Ok(Vec::new())
            },
        );
        let mut scraper = started(ScraperConfig::default(), sources);
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        let connections = outcome.metrics.metric("system.network.connections").unwrap();
        assert_eq!(connections.data_points.len(), TCP_STATES.len());
        assert!(connections.data_points.iter().all(|p| p.value == 0));
    }

    #[test]
    fn test_io_failure_is_partial() {
        let sources = typical_sources().with_io_counters(
            |_: &ScrapeContext, _: bool| -> Result<Vec<IoCountersRecord>, StatError> {
                Err(StatError::Other("interface table unavailable".into()))
            },
        );
        let mut scraper = started(ScraperConfig::default(), sources);
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        let err = outcome.error.unwrap();
        assert_eq!(err.failed_metrics(), NETWORK_METRICS_LEN);
        assert!(err.to_string().contains("failed to read network IO stats"));
        assert!(outcome.metrics.metric("system.network.io").is_none());
        assert!(outcome.metrics.metric("system.network.connections").is_some());
    }

    #[test]
    fn test_connections_failure_is_partial() {
        let sources = typical_sources().with_connections(
            |_: &ScrapeContext, _: ConnectionKind| -> Result<Vec<ConnectionRecord>, StatError> {
                Err(StatError::Other("netlink".into()))
            },
        );
        let mut scraper = started(ScraperConfig::default(), sources);
        let err = scraper.scrape(&ScrapeContext::new()).unwrap().error.unwrap();
        assert_eq!(err.failed_metrics(), CONNECTIONS_METRICS_LEN);
        assert!(err.to_string().starts_with("failed to read TCP connections"));
    }

    #[test]
    fn test_exclude_drops_only_that_interface() {
        let config = ScraperConfig {
            exclude: MatchConfig::new(vec!["eth0".into()], MatchType::Strict),
            ..Default::default()
        };
        let mut scraper = started(config, typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        assert_eq!(outcome.metrics.points_with_attribute("device", "eth0").count(), 0);
        assert_eq!(outcome.metrics.points_with_attribute("device", "eth1").count(), 8);
        assert_eq!(
            value_of(&outcome.metrics, "system.network.io", "eth1", "transmit"),
            Some(87654321)
        );
    }

    #[test]
    fn test_include_nothing_matching_is_silent() {
        let config = ScraperConfig {
            include: MatchConfig::new(vec!["^wlan".into()], MatchType::Regexp),
            ..Default::default()
        };
        let mut scraper = started(config, typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        assert!(outcome.is_complete());
        assert!(outcome.metrics.metric("system.network.io").is_none());
    }

    #[test]
    fn test_disabled_io_families_are_skipped() {
        let mut config = ScraperConfig::default();
        config.metrics.system_network_io.enabled = false;
        config.metrics.system_network_dropped.enabled = false;
        let mut scraper = started(config, typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        assert!(outcome.metrics.metric("system.network.io").is_none());
        assert!(outcome.metrics.metric("system.network.dropped").is_none());
        assert_eq!(outcome.metrics.points_with_attribute("device", "eth0").count(), 4);
    }

    #[test]
    fn test_udp_counters() {
        let mut scraper = started(udp_enabled(), typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();
        assert!(outcome.is_complete());
        let m = &outcome.metrics;

        let by_direction = |name: &str, direction: &str| {
            m.metric(name)?
                .data_points
                .iter()
                .find(|p| p.attribute("direction") == Some(direction))
                .map(|p| p.value)
        };
        assert_eq!(by_direction("system.network.udp.datagrams", "transmit"), Some(4000));
        assert_eq!(by_direction("system.network.udp.datagrams", "receive"), Some(5000));
        assert_eq!(by_direction("system.network.udp.buf_errors", "transmit"), Some(2));
        assert_eq!(by_direction("system.network.udp.buf_errors", "receive"), Some(1));

        // InErrors and NoPorts both land in the errors series.
        let errors: Vec<i64> = m
            .metric("system.network.udp.errors")
            .unwrap()
            .data_points
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(errors, [3, 12]);
        assert!(m.metric("system.network.udp.no_ports").is_none());
    }

    #[test]
    fn test_empty_proto_counters_fail_group() {
        let sources = typical_sources().with_proto_counters(
            |_: &ScrapeContext, _: &[&str]| -> Result<Vec<ProtoCountersRecord>, StatError> {
                Ok(Vec::new())
            },
        );
        let mut config = ScraperConfig::default();
        config.metrics.system_network_udp_datagrams.enabled = true;
        let mut scraper = started(config, sources);

        let err = scraper.scrape(&ScrapeContext::new()).unwrap().error.unwrap();
        assert_eq!(err.failed_metrics(), PROTO_METRICS_LEN);
        assert!(err.to_string().contains("no network proto counters available"));
    }

    #[test]
    fn test_proto_counters_not_queried_when_disabled() {
        let sources = typical_sources().with_proto_counters(
            |_: &ScrapeContext, _: &[&str]| -> Result<Vec<ProtoCountersRecord>, StatError> {
                Err(StatError::Other("should not be called".into()))
            },
        );
        let mut scraper = started(ScraperConfig::default(), sources);
        assert!(scraper.scrape(&ScrapeContext::new()).unwrap().is_complete());
    }

    #[test]
    fn test_connections_not_queried_when_disabled() {
        let sources = typical_sources().with_connections(
            |_: &ScrapeContext, _: ConnectionKind| -> Result<Vec<ConnectionRecord>, StatError> {
                Err(StatError::Other("should not be called".into()))
            },
        );
        let mut config = ScraperConfig::default();
        config.metrics.system_network_connections.enabled = false;
        let mut scraper = started(config, sources);

        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();
        assert!(outcome.is_complete());
        assert!(outcome.metrics.metric("system.network.connections").is_none());
        assert_eq!(outcome.metrics.metric_count(), 4);
    }

    #[test]
    fn test_conntrack_not_queried_when_disabled() {
        let sources = typical_sources().with_conntrack(
            |_: &ScrapeContext| -> Result<Vec<ConntrackRecord>, StatError> {
                Err(StatError::Other("should not be called".into()))
            },
        );
        let mut scraper = started(ScraperConfig::default(), sources);

        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();
        assert!(outcome.is_complete());
        assert!(outcome.metrics.metric("system.network.conntrack.count").is_none());
        assert!(outcome.metrics.metric("system.network.conntrack.max").is_none());
    }

    #[test]
    fn test_conntrack_count_only() {
        let mut config = ScraperConfig::default();
        config.metrics.system_network_conntrack_count.enabled = true;
        let mut scraper = started(config, typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        assert!(outcome.is_complete());
        let count = outcome.metrics.metric("system.network.conntrack.count").unwrap();
        assert_eq!(count.data_points.len(), 1);
        assert_eq!(count.data_points[0].value, 42);
        assert!(outcome.metrics.metric("system.network.conntrack.max").is_none());
    }

    #[test]
    fn test_conntrack_counters() {
        let mut config = ScraperConfig::default();
        config.metrics.system_network_conntrack_count.enabled = true;
        config.metrics.system_network_conntrack_max.enabled = true;
        let mut scraper = started(config, typical_sources());
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        let m = &outcome.metrics;
        assert_eq!(m.metric("system.network.conntrack.count").unwrap().data_points[0].value, 42);
        assert_eq!(m.metric("system.network.conntrack.max").unwrap().data_points[0].value, 262144);
    }

    #[test]
    fn test_conntrack_unsupported_is_partial() {
        let mut config = ScraperConfig::default();
        config.metrics.system_network_conntrack_max.enabled = true;
        let sources = StatSources::procfs(MockFs::host_without_conntrack(), "/proc");
        let mut scraper = started(config, sources);
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        let err = outcome.error.unwrap();
        assert_eq!(err.failed_metrics(), CONNECTIONS_METRICS_LEN);
        assert!(err.to_string().contains("conntrack is not supported on this host"));
        assert!(outcome.metrics.metric("system.network.io").is_some());
    }

    #[test]
    fn test_empty_conntrack_is_failure() {
        let mut config = ScraperConfig::default();
        config.metrics.system_network_conntrack_count.enabled = true;
        let sources = typical_sources().with_conntrack(
            |_: &ScrapeContext| -> Result<Vec<ConntrackRecord>, StatError> { Ok(Vec::new()) },
        );
        let mut scraper = started(config, sources);
        let err = scraper.scrape(&ScrapeContext::new()).unwrap().error.unwrap();
        assert_eq!(err.to_string(), "no conntrack counters available (1 metrics)");
    }

    #[test]
    fn test_every_group_failing_sums_counts() {
        let mut config = udp_enabled();
        config.metrics.system_network_conntrack_count.enabled = true;
        let sources = StatSources::procfs(MockFs::new(), "/proc")
            .with_boot_time(|_: &ScrapeContext| -> Result<u64, StatError> { Ok(1_700_000_000) });
        let mut scraper = started(config, sources);
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        let err = outcome.error.unwrap();
        assert_eq!(err.failures().len(), 4);
        assert_eq!(err.failed_metrics(), 4 + 1 + 1 + 4);
        assert!(outcome.metrics.is_empty());
    }

    #[test]
    fn test_cancelled_context_surfaces_as_partial_failures() {
        let mut scraper = started(ScraperConfig::default(), typical_sources());
        let flag = Arc::new(AtomicBool::new(true));
        let ctx = ScrapeContext::new().with_cancel_flag(flag);

        let outcome = scraper.scrape(&ctx).unwrap();
        let err = outcome.error.unwrap();
        assert_eq!(err.failed_metrics(), NETWORK_METRICS_LEN + CONNECTIONS_METRICS_LEN);
        assert!(err.to_string().contains("query cancelled"));
        assert!(outcome.metrics.is_empty());
    }

    #[test]
    fn test_expired_deadline_surfaces_as_partial_failures() {
        let mut scraper = started(ScraperConfig::default(), typical_sources());
        let ctx = ScrapeContext::new().with_deadline(Instant::now());

        let outcome = scraper.scrape(&ctx).unwrap();
        let err = outcome.error.unwrap();
        assert_eq!(err.failed_metrics(), NETWORK_METRICS_LEN + CONNECTIONS_METRICS_LEN);
        assert_eq!(
            err.to_string(),
            "failed to read network IO stats: query deadline exceeded (4 metrics); \
             failed to read TCP connections: query deadline exceeded (1 metrics)"
        );
        assert!(outcome.metrics.is_empty());
    }

    #[test]
    fn test_env_overrides_reach_source() {
        let mut fs = MockFs::new();
        fs.add_file("/hostfs/proc/stat", "btime 1700000000\n");
        fs.add_file("/hostfs/proc/net/dev", crate::collector::mock::scenarios::NET_DEV);
        fs.add_file("/hostfs/proc/net/tcp", crate::collector::mock::scenarios::NET_TCP);
        let config = ScraperConfig {
            env: crate::context::EnvOverrides::new().with("HOST_PROC", "/hostfs/proc"),
            ..Default::default()
        };
        let mut scraper = started(config, StatSources::procfs(fs, "/proc"));
        let outcome = scraper.scrape(&ScrapeContext::new()).unwrap();

        assert!(outcome.is_complete(), "{:?}", outcome.error);
        assert_eq!(outcome.metrics.points_with_attribute("device", "eth0").count(), 8);
    }

    #[test]
    fn test_host_name_resource_and_reuse_across_scrapes() {
        let config = ScraperConfig {
            host_name: Some("web-01".into()),
            metrics: MetricsConfig::default(),
            ..Default::default()
        };
        let mut scraper = started(config, typical_sources());
        let first = scraper.scrape(&ScrapeContext::new()).unwrap().metrics;
        let second = scraper.scrape(&ScrapeContext::new()).unwrap().metrics;

        assert_eq!(first.resource.attributes.get("host.name").map(String::as_str), Some("web-01"));
        assert_eq!(first.data_point_count(), second.data_point_count());
        scraper.shutdown();
    }
}
