//! Advisory pipeline lock: one recovery run per installation root.
//!
//! Cleanup and install both mutate the same tree destructively; two
//! interleaved runs would shred it. The lock is a `create_new` marker file at
//! the root, released on drop. A second invocation is rejected up front
//! rather than allowed to interleave.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, WprError};

/// Lock file name at the installation root.
pub const LOCK_FILE_NAME: &str = ".wp-rescue.lock";

/// Held advisory lock. Dropping it removes the lock file.
#[derive(Debug)]
pub struct PipelineLock {
    path: PathBuf,
}

impl PipelineLock {
    /// Acquire the lock for `root`, failing if another run holds it.
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // PID inside is diagnostic only; staleness is the operator's call.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(WprError::LockHeld { path }),
            Err(e) => Err(WprError::io(&path, e)),
        }
    }

    /// Path of the lock file, for diagnostics.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PipelineLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
