//! Filesystem access behind a trait so the `/proc` stat source can run
//! against the real host or an in-memory fixture.

use std::io;
use std::path::Path;

/// Read-only view of the filesystem used by [`ProcfsStatSource`].
///
/// [`ProcfsStatSource`]: crate::collector::procfs::ProcfsStatSource
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
