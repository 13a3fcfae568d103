//! Host network statistics collection.
//!
//! This module provides the `/proc` implementation of the stat source
//! capabilities, with support for mocking for testing off Linux.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ProcfsStatSource                      │
//! │  boot time    ─ /proc/stat (btime)                       │
//! │  io counters  ─ /proc/net/dev                            │
//! │  connections  ─ /proc/net/tcp, /proc/net/tcp6            │
//! │  conntrack    ─ /proc/sys/net/netfilter/nf_conntrack_*   │
//! │  protocols    ─ /proc/net/snmp                           │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │
//!                       ┌──────▼──────┐
//!                       │  FileSystem │ (trait)
//!                       └──────┬──────┘
//!                ┌─────────────┼─────────────┐
//!         ┌──────▼──────┐ ┌────▼──────┐ ┌────▼────────┐
//!         │   RealFs    │ │  MockFs   │ │  Scenarios  │
//!         │  (Linux)    │ │ (Testing) │ │ (Fixtures)  │
//!         └─────────────┘ └───────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use netscrape_core::collector::MockFs;
//! use netscrape_core::context::ScrapeContext;
//! use netscrape_core::source::{IoCountersSource, StatSources};
//!
//! let sources = StatSources::procfs(MockFs::typical_host(), "/proc");
//! let records = sources.io_counters.io_counters(&ScrapeContext::new(), true).unwrap();
//! assert_eq!(records.len(), 3);
//! ```

pub mod mock;
pub mod procfs;
pub mod traits;

pub use mock::MockFs;
pub use procfs::ProcfsStatSource;
pub use traits::{FileSystem, RealFs};
