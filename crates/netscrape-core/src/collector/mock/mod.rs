//! Mock filesystem and host scenarios.

mod filesystem;
pub mod scenarios;

pub use filesystem::MockFs;
