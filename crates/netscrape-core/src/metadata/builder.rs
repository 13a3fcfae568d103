//! Accumulates data points between scrapes and emits snapshots.

use std::collections::BTreeMap;

use super::model::{MetricSeries, Metrics, NumberDataPoint, Resource, Temporality, Timestamp};
use super::{Direction, Metric, Protocol, SCOPE_NAME};
use crate::config::MetricsConfig;

/// Collects data points for the metrics enabled in `MetricsConfig`.
///
/// Records for disabled metrics are dropped. Every point carries the
/// builder's start time so consumers can anchor cumulative series.
#[derive(Debug, Clone)]
pub struct MetricsBuilder {
    config: MetricsConfig,
    start_time: Timestamp,
    resource: Resource,
    buffers: BTreeMap<Metric, Vec<NumberDataPoint>>,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig, start_time: Timestamp) -> Self {
        Self {
            config,
            start_time,
            resource: Resource::default(),
            buffers: BTreeMap::new(),
        }
    }

    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource.attributes.insert(key.into(), value.into());
        self
    }

    /// Number of data points buffered since the last emit.
    pub fn pending_points(&self) -> usize {
        self.buffers.values().map(Vec::len).sum()
    }

    fn record(
        &mut self,
        metric: Metric,
        now: Timestamp,
        value: i64,
        attributes: BTreeMap<&'static str, String>,
    ) {
        if !self.config.get(metric).enabled {
            return;
        }
        self.buffers.entry(metric).or_default().push(NumberDataPoint {
            start_time: self.start_time,
            timestamp: now,
            value,
            attributes,
        });
    }

    pub fn record_system_network_connections_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        protocol: Protocol,
        state: &str,
    ) {
        let attributes = BTreeMap::from([
            ("protocol", protocol.as_str().to_string()),
            ("state", state.to_string()),
        ]);
        self.record(Metric::Connections, now, value, attributes);
    }

    pub fn record_system_network_conntrack_count_data_point(&mut self, now: Timestamp, value: i64) {
        self.record(Metric::ConntrackCount, now, value, BTreeMap::new());
    }

    pub fn record_system_network_conntrack_max_data_point(&mut self, now: Timestamp, value: i64) {
        self.record(Metric::ConntrackMax, now, value, BTreeMap::new());
    }

    pub fn record_system_network_dropped_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        device: &str,
        direction: Direction,
    ) {
        self.record(Metric::Dropped, now, value, device_attributes(device, direction));
    }

    pub fn record_system_network_errors_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        device: &str,
        direction: Direction,
    ) {
        self.record(Metric::Errors, now, value, device_attributes(device, direction));
    }

    pub fn record_system_network_io_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        device: &str,
        direction: Direction,
    ) {
        self.record(Metric::Io, now, value, device_attributes(device, direction));
    }

    pub fn record_system_network_packets_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        device: &str,
        direction: Direction,
    ) {
        self.record(Metric::Packets, now, value, device_attributes(device, direction));
    }

    pub fn record_system_network_udp_buf_errors_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        direction: Direction,
    ) {
        let attributes = BTreeMap::from([("direction", direction.as_str().to_string())]);
        self.record(Metric::UdpBufErrors, now, value, attributes);
    }

    pub fn record_system_network_udp_datagrams_data_point(
        &mut self,
        now: Timestamp,
        value: i64,
        direction: Direction,
    ) {
        let attributes = BTreeMap::from([("direction", direction.as_str().to_string())]);
        self.record(Metric::UdpDatagrams, now, value, attributes);
    }

    pub fn record_system_network_udp_errors_data_point(&mut self, now: Timestamp, value: i64) {
        self.record(Metric::UdpErrors, now, value, BTreeMap::new());
    }

    /// Drains the buffered points into a snapshot.
    ///
    /// Metrics without points are omitted. The builder is empty afterwards
    /// and keeps its start time and resource for the next scrape.
    pub fn emit(&mut self) -> Metrics {
        let mut buffers = std::mem::take(&mut self.buffers);
        let metrics = Metric::ALL
            .into_iter()
            .filter_map(|metric| {
                let data_points = buffers.remove(&metric)?;
                Some(MetricSeries {
                    name: metric.name(),
                    description: metric.description(),
                    unit: metric.unit(),
                    is_monotonic: metric.is_monotonic(),
                    aggregation_temporality: Temporality::Cumulative,
                    data_points,
                })
            })
            .collect();

        Metrics {
            resource: self.resource.clone(),
            scope: SCOPE_NAME,
            metrics,
        }
    }
}

fn device_attributes(device: &str, direction: Direction) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("device", device.to_string()),
        ("direction", direction.as_str().to_string()),
    ])
}
