//! Component F: exclusive file lock.
//!
//! A job instance corresponds 1:1 to a lock file; instantiating a second job
//! over the same fingerprint fails with [`EngineError::AnotherInstanceProcessing`].
//! No automatic staleness detection — an orphaned lock from a crash requires
//! manual removal, same tradeoff the source makes.

use crate::errors::{EngineError, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;

pub struct JobLock {
    path: PathBuf,
}

impl JobLock {
    /// Create `<fingerprint>.lock` with exclusive-create semantics.
    pub fn acquire(fingerprint: &str) -> Result<Self> {
        let path = crate::paths::lock_path(fingerprint)?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(EngineError::AnotherInstanceProcessing)
            }
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}
