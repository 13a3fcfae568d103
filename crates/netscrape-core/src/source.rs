//! Stat source capabilities and the raw records they return.
//!
//! Each operating-system query is its own trait so the scraper can be wired
//! to the `/proc` implementation in production and to closures in tests.
//! Closures with the matching signature implement the traits directly.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::collector::procfs::ProcfsStatSource;
use crate::collector::traits::FileSystem;
use crate::context::ScrapeContext;

/// Error returned by a single stat source query.
#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("{0} is not supported on this host")]
    Unsupported(String),
    #[error("query cancelled")]
    Cancelled,
    #[error("query deadline exceeded")]
    DeadlineExceeded,
    #[error("{0}")]
    Other(String),
}

/// Cumulative counters of one network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoCountersRecord {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

/// Which sockets a connections query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// TCP over IPv4 and IPv6.
    Tcp,
    Tcp4,
    Tcp6,
}

impl ConnectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Tcp => "tcp",
            ConnectionKind::Tcp4 => "tcp4",
            ConnectionKind::Tcp6 => "tcp6",
        }
    }
}

/// One observed socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
    /// State label, e.g. `ESTABLISHED`.
    pub status: String,
}

/// Connection-tracking table statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConntrackRecord {
    pub conntrack_count: u64,
    pub conntrack_max: u64,
}

/// Counters of one protocol keyed by their kernel names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtoCountersRecord {
    /// Lowercase protocol name (`udp`, `tcp`, ...).
    pub protocol: String,
    pub stats: HashMap<String, i64>,
}

impl ProtoCountersRecord {
    /// Returns a counter, zero when the kernel does not report it.
    pub fn stat(&self, name: &str) -> i64 {
        self.stats.get(name).copied().unwrap_or(0)
    }
}

/// Host boot time in seconds since the Unix epoch.
pub trait BootTimeSource: Send + Sync {
    fn boot_time(&self, ctx: &ScrapeContext) -> Result<u64, StatError>;
}

/// Network IO counters, per interface or aggregated into one `all` record.
pub trait IoCountersSource: Send + Sync {
    fn io_counters(
        &self,
        ctx: &ScrapeContext,
        per_interface: bool,
    ) -> Result<Vec<IoCountersRecord>, StatError>;
}

pub trait ConnectionsSource: Send + Sync {
    fn connections(
        &self,
        ctx: &ScrapeContext,
        kind: ConnectionKind,
    ) -> Result<Vec<ConnectionRecord>, StatError>;
}

pub trait ConntrackSource: Send + Sync {
    fn conntrack(&self, ctx: &ScrapeContext) -> Result<Vec<ConntrackRecord>, StatError>;
}

/// Protocol counters; an empty `protocols` slice selects every protocol.
pub trait ProtoCountersSource: Send + Sync {
    fn proto_counters(
        &self,
        ctx: &ScrapeContext,
        protocols: &[&str],
    ) -> Result<Vec<ProtoCountersRecord>, StatError>;
}

impl<F> BootTimeSource for F
where
    F: Fn(&ScrapeContext) -> Result<u64, StatError> + Send + Sync,
{
    fn boot_time(&self, ctx: &ScrapeContext) -> Result<u64, StatError> {
        self(ctx)
    }
}

impl<F> IoCountersSource for F
where
    F: Fn(&ScrapeContext, bool) -> Result<Vec<IoCountersRecord>, StatError> + Send + Sync,
{
    fn io_counters(
        &self,
        ctx: &ScrapeContext,
        per_interface: bool,
    ) -> Result<Vec<IoCountersRecord>, StatError> {
        self(ctx, per_interface)
    }
}

impl<F> ConnectionsSource for F
where
    F: Fn(&ScrapeContext, ConnectionKind) -> Result<Vec<ConnectionRecord>, StatError>
        + Send
        + Sync,
{
    fn connections(
        &self,
        ctx: &ScrapeContext,
        kind: ConnectionKind,
    ) -> Result<Vec<ConnectionRecord>, StatError> {
        self(ctx, kind)
    }
}

impl<F> ConntrackSource for F
where
    F: Fn(&ScrapeContext) -> Result<Vec<ConntrackRecord>, StatError> + Send + Sync,
{
    fn conntrack(&self, ctx: &ScrapeContext) -> Result<Vec<ConntrackRecord>, StatError> {
        self(ctx)
    }
}

impl<F> ProtoCountersSource for F
where
    F: Fn(&ScrapeContext, &[&str]) -> Result<Vec<ProtoCountersRecord>, StatError> + Send + Sync,
{
    fn proto_counters(
        &self,
        ctx: &ScrapeContext,
        protocols: &[&str],
    ) -> Result<Vec<ProtoCountersRecord>, StatError> {
        self(ctx, protocols)
    }
}

/// The five capabilities a [`NetworkScraper`] is constructed with.
///
/// [`NetworkScraper`]: crate::scraper::NetworkScraper
#[derive(Clone)]
pub struct StatSources {
    pub boot_time: Arc<dyn BootTimeSource>,
    pub io_counters: Arc<dyn IoCountersSource>,
    pub connections: Arc<dyn ConnectionsSource>,
    pub conntrack: Arc<dyn ConntrackSource>,
    pub proto_counters: Arc<dyn ProtoCountersSource>,
}

impl StatSources {
    /// Wires every capability to one `/proc` reader.
    pub fn procfs<F>(fs: F, proc_path: impl Into<String>) -> Self
    where
        F: FileSystem + 'static,
    {
        Self::from_procfs(Arc::new(ProcfsStatSource::new(fs, proc_path)))
    }

    pub fn from_procfs<F>(source: Arc<ProcfsStatSource<F>>) -> Self
    where
        F: FileSystem + 'static,
    {
        Self {
            boot_time: source.clone(),
            io_counters: source.clone(),
            connections: source.clone(),
            conntrack: source.clone(),
            proto_counters: source,
        }
    }

    pub fn with_boot_time(mut self, source: impl BootTimeSource + 'static) -> Self {
        self.boot_time = Arc::new(source);
        self
    }

    pub fn with_io_counters(mut self, source: impl IoCountersSource + 'static) -> Self {
        self.io_counters = Arc::new(source);
        self
    }

    pub fn with_connections(mut self, source: impl ConnectionsSource + 'static) -> Self {
        self.connections = Arc::new(source);
        self
    }

    pub fn with_conntrack(mut self, source: impl ConntrackSource + 'static) -> Self {
        self.conntrack = Arc::new(source);
        self
    }

    pub fn with_proto_counters(mut self, source: impl ProtoCountersSource + 'static) -> Self {
        self.proto_counters = Arc::new(source);
        self
    }
}

impl std::fmt::Debug for StatSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatSources").finish_non_exhaustive()
    }
}
