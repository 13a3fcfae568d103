//! Stat source for the Linux `/proc` filesystem.
//!
//! `parser` holds the pure file-format parsers, `network` maps them onto the
//! stat source capabilities.

mod network;
pub mod parser;

pub use network::{AGGREGATE_INTERFACE, ProcfsStatSource};
pub use parser::ParseError;
