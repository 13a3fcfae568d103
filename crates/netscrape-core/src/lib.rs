//! netscrape-core - host network metrics scraper.
//!
//! Provides:
//! - `collector` - `/proc` readers behind a mockable filesystem
//! - `source` - per-query stat source capabilities and their records
//! - `context` - cancellation, deadline and env overrides for one scrape
//! - `config` - metric enable flags, interface rules, env overrides
//! - `filter` - compiled include/exclude interface filter
//! - `metadata` - metric catalog, metrics builder and snapshot model
//! - `scraper` - the network scraper and its partial-failure reporting

pub mod collector;
pub mod config;
pub mod context;
pub mod filter;
pub mod metadata;
pub mod scraper;
pub mod source;

pub use config::ScraperConfig;
pub use scraper::{NetworkScraper, ScrapeOutcome};
pub use source::StatSources;
