//! Network stat source reading from `/proc`.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::collector::procfs::parser::{
    ParseError, parse_boot_time, parse_net_dev, parse_net_snmp, parse_single_value,
    parse_tcp_table, tcp_state_label,
};
use crate::collector::traits::FileSystem;
use crate::context::{EnvOverrides, ScrapeContext};
use crate::source::{
    BootTimeSource, ConnectionKind, ConnectionRecord, ConnectionsSource, ConntrackRecord,
    ConntrackSource, IoCountersRecord, IoCountersSource, ProtoCountersRecord, ProtoCountersSource,
    StatError,
};

/// Name of the aggregate record returned when per-interface counters are not requested.
pub const AGGREGATE_INTERFACE: &str = "all";

/// Implements every stat source capability on top of a proc filesystem.
///
/// The proc root is `proc_path` unless the query context carries a
/// `HOST_PROC` override.
pub struct ProcfsStatSource<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcfsStatSource<F> {
    /// Creates a new stat source.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    pub fn proc_path(&self) -> &str {
        &self.proc_path
    }

    /// Reads the host name from `sys/kernel/hostname`.
    pub fn host_name(&self, ctx: &ScrapeContext) -> Result<String, StatError> {
        let (_, content) = self.read(ctx, "sys/kernel/hostname")?;
        Ok(content.trim().to_string())
    }

    fn root<'a>(&'a self, ctx: &'a ScrapeContext) -> &'a str {
        ctx.env()
            .get(EnvOverrides::HOST_PROC)
            .unwrap_or(&self.proc_path)
    }

    /// Returns `(path, content)` of a file below the proc root.
    fn read(&self, ctx: &ScrapeContext, relative: &str) -> Result<(String, String), StatError> {
        ctx.check()?;
        let path = format!("{}/{}", self.root(ctx), relative);
        match self.fs.read_to_string(Path::new(&path)) {
            Ok(content) => Ok((path, content)),
            Err(source) => Err(StatError::Io { path, source }),
        }
    }

    fn read_value(&self, ctx: &ScrapeContext, relative: &str) -> Result<u64, StatError> {
        let (path, content) = self.read(ctx, relative)?;
        parse_single_value(&content).map_err(|e| parse_failure(path, e))
    }
}

fn parse_failure(path: String, err: ParseError) -> StatError {
    StatError::Parse {
        path,
        message: err.message,
    }
}

impl<F: FileSystem> BootTimeSource for ProcfsStatSource<F> {
    fn boot_time(&self, ctx: &ScrapeContext) -> Result<u64, StatError> {
        let (path, content) = self.read(ctx, "stat")?;
        parse_boot_time(&content).map_err(|e| parse_failure(path, e))
    }
}

impl<F: FileSystem> IoCountersSource for ProcfsStatSource<F> {
    fn io_counters(
        &self,
        ctx: &ScrapeContext,
        per_interface: bool,
    ) -> Result<Vec<IoCountersRecord>, StatError> {
        let (path, content) = self.read(ctx, "net/dev")?;
        let devices = parse_net_dev(&content).map_err(|e| parse_failure(path, e))?;

        let records: Vec<IoCountersRecord> = devices
            .into_iter()
            .map(|dev| IoCountersRecord {
                name: dev.interface,
                bytes_sent: dev.tx_bytes,
                bytes_recv: dev.rx_bytes,
                packets_sent: dev.tx_packets,
                packets_recv: dev.rx_packets,
                errin: dev.rx_errs,
                errout: dev.tx_errs,
                dropin: dev.rx_drop,
                dropout: dev.tx_drop,
            })
            .collect();

        if per_interface {
            return Ok(records);
        }

        let total = records.into_iter().fold(
            IoCountersRecord {
                name: AGGREGATE_INTERFACE.to_string(),
                ..Default::default()
            },
            |mut acc, r| {
                acc.bytes_sent = acc.bytes_sent.wrapping_add(r.bytes_sent);
                acc.bytes_recv = acc.bytes_recv.wrapping_add(r.bytes_recv);
                acc.packets_sent = acc.packets_sent.wrapping_add(r.packets_sent);
                acc.packets_recv = acc.packets_recv.wrapping_add(r.packets_recv);
                acc.errin = acc.errin.wrapping_add(r.errin);
                acc.errout = acc.errout.wrapping_add(r.errout);
                acc.dropin = acc.dropin.wrapping_add(r.dropin);
                acc.dropout = acc.dropout.wrapping_add(r.dropout);
                acc
            },
        );
        Ok(vec![total])
    }
}

impl<F: FileSystem> ConnectionsSource for ProcfsStatSource<F> {
    fn connections(
        &self,
        ctx: &ScrapeContext,
        kind: ConnectionKind,
    ) -> Result<Vec<ConnectionRecord>, StatError> {
        // (file, required): tcp6 is absent when IPv6 is disabled
        let tables: &[(&str, bool)] = match kind {
            ConnectionKind::Tcp => &[("net/tcp", true), ("net/tcp6", false)],
            ConnectionKind::Tcp4 => &[("net/tcp", true)],
            ConnectionKind::Tcp6 => &[("net/tcp6", true)],
        };

        let mut connections = Vec::new();
        for &(relative, required) in tables {
            let (path, content) = match self.read(ctx, relative) {
                Ok(read) => read,
                Err(StatError::Io { path, source })
                    if !required && source.kind() == io::ErrorKind::NotFound =>
                {
                    debug!("{} not present, skipping", path);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let entries = parse_tcp_table(&content).map_err(|e| parse_failure(path, e))?;
            connections.extend(entries.into_iter().map(|entry| ConnectionRecord {
                local_addr: entry.local,
                remote_addr: entry.remote,
                status: tcp_state_label(entry.state)
                    .unwrap_or("UNKNOWN")
                    .to_string(),
            }));
        }

        Ok(connections)
    }
}

impl<F: FileSystem> ConntrackSource for ProcfsStatSource<F> {
    fn conntrack(&self, ctx: &ScrapeContext) -> Result<Vec<ConntrackRecord>, StatError> {
        ctx.check()?;
        let netfilter = format!("{}/sys/net/netfilter", self.root(ctx));
        if !self.fs.exists(Path::new(&netfilter)) {
            return Err(StatError::Unsupported("conntrack".to_string()));
        }

        let conntrack_count = self.read_value(ctx, "sys/net/netfilter/nf_conntrack_count")?;
        let conntrack_max = self.read_value(ctx, "sys/net/netfilter/nf_conntrack_max")?;

        Ok(vec![ConntrackRecord {
            conntrack_count,
            conntrack_max,
        }])
    }
}

impl<F: FileSystem> ProtoCountersSource for ProcfsStatSource<F> {
    fn proto_counters(
        &self,
        ctx: &ScrapeContext,
        protocols: &[&str],
    ) -> Result<Vec<ProtoCountersRecord>, StatError> {
        let (path, content) = self.read(ctx, "net/snmp")?;
        let tables = parse_net_snmp(&content).map_err(|e| parse_failure(path, e))?;

        Ok(tables
            .into_iter()
            .filter(|table| {
                protocols.is_empty()
                    || protocols
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(&table.protocol))
            })
            .map(|table| ProtoCountersRecord {
                protocol: table.protocol.to_lowercase(),
                stats: table.counters.into_iter().collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::mock::scenarios::{BOOT_TIME, NET_DEV};

    fn source(fs: MockFs) -> ProcfsStatSource<MockFs> {
        ProcfsStatSource::new(fs, "/proc")
    }

    #[test]
    fn test_boot_time() {
        let ctx = ScrapeContext::new();
        assert_eq!(source(MockFs::typical_host()).boot_time(&ctx).unwrap(), BOOT_TIME);
    }

    #[test]
    fn test_boot_time_missing_stat_file() {
        let ctx = ScrapeContext::new();
        let err = source(MockFs::new()).boot_time(&ctx).unwrap_err();
        match err {
            StatError::Io { path, source } => {
                assert_eq!(path, "/proc/stat");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_io_counters_per_interface() {
        let ctx = ScrapeContext::new();
        let records = source(MockFs::typical_host()).io_counters(&ctx, true).unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["lo", "eth0", "eth1"]);

        assert_eq!(
            records[1],
            IoCountersRecord {
                name: "eth0".into(),
                bytes_sent: 1000,
                bytes_recv: 2000,
                packets_sent: 100,
                packets_recv: 200,
                errin: 2,
                errout: 0,
                dropin: 0,
                dropout: 1,
            }
        );
    }

    #[test]
    fn test_io_counters_aggregate() {
        let ctx = ScrapeContext::new();
        let records = source(MockFs::typical_host()).io_counters(&ctx, false).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, AGGREGATE_INTERFACE);
        assert_eq!(records[0].packets_sent, 789 + 100 + 4321);
        assert_eq!(records[0].dropout, 1 + 5);
    }

    #[test]
    fn test_host_proc_override() {
        let mut fs = MockFs::new();
        fs.add_file("/hostfs/proc/net/dev", NET_DEV);
        let ctx = ScrapeContext::new()
            .with_env(EnvOverrides::new().with(EnvOverrides::HOST_PROC, "/hostfs/proc"));

        let records = source(fs).io_counters(&ctx, true).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_connections_tcp_reads_both_families() {
        let ctx = ScrapeContext::new();
        let connections = source(MockFs::typical_host())
            .connections(&ctx, ConnectionKind::Tcp)
            .unwrap();

        assert_eq!(connections.len(), 5);
        let listening = connections.iter().filter(|c| c.status == "LISTEN").count();
        assert_eq!(listening, 2);
        assert!(connections.iter().any(|c| c.local_addr.is_ipv6()));
    }

    #[test]
    fn test_connections_without_ipv6() {
        let ctx = ScrapeContext::new();
        let src = source(MockFs::host_without_ipv6());

        assert_eq!(src.connections(&ctx, ConnectionKind::Tcp).unwrap().len(), 4);
        assert!(src.connections(&ctx, ConnectionKind::Tcp6).is_err());
    }

    #[test]
    fn test_conntrack() {
        let ctx = ScrapeContext::new();
        let records = source(MockFs::typical_host()).conntrack(&ctx).unwrap();
        assert_eq!(
            records,
            [ConntrackRecord {
                conntrack_count: 42,
                conntrack_max: 262_144,
            }]
        );
    }

    #[test]
    fn test_conntrack_unsupported() {
        let ctx = ScrapeContext::new();
        let err = source(MockFs::host_without_conntrack())
            .conntrack(&ctx)
            .unwrap_err();
        assert!(matches!(err, StatError::Unsupported(_)));
    }

    #[test]
    fn test_proto_counters_udp_only() {
        let ctx = ScrapeContext::new();
        let records = source(MockFs::typical_host())
            .proto_counters(&ctx, &["udp"])
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].protocol, "udp");
        assert_eq!(records[0].stat("OutDatagrams"), 4000);
        assert_eq!(records[0].stat("InDatagrams"), 5000);
        assert_eq!(records[0].stat("SndbufErrors"), 2);
        assert_eq!(records[0].stat("RcvbufErrors"), 1);
        assert_eq!(records[0].stat("InErrors"), 3);
        assert_eq!(records[0].stat("NoPorts"), 12);
    }

    #[test]
    fn test_proto_counters_unknown_protocol_is_empty() {
        let ctx = ScrapeContext::new();
        let records = source(MockFs::typical_host())
            .proto_counters(&ctx, &["sctp"])
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_cancelled_context_skips_read() {
        let ctx = ScrapeContext::new();
        ctx.cancel();
        let err = source(MockFs::typical_host()).io_counters(&ctx, true).unwrap_err();
        assert!(matches!(err, StatError::Cancelled));
    }

    #[test]
    fn test_host_name() {
        let ctx = ScrapeContext::new();
        assert_eq!(source(MockFs::typical_host()).host_name(&ctx).unwrap(), "web-01");
    }
}
