//! Per-job registry of temporary artifacts.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tokio::fs;
use tracing::{debug, warn};

/// Append-only list of paths to delete when the job ends.
///
/// `cleanup` drains the list, so every registered path is deleted at most
/// once even if cleanup is invoked again (for example after a panic).
#[derive(Debug, Default)]
pub struct TempRegistry {
    paths: Mutex<Vec<PathBuf>>,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    /// Registered but never created
    pub missing: usize,
    pub failed: usize,
}

impl TempRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        // A panic while holding the lock cannot leave the Vec inconsistent.
        self.paths.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a file or directory for deletion.
    pub fn register(&self, path: impl Into<PathBuf>) {
        self.lock().push(path.into());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the registered paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Delete everything registered so far. Failures are logged, never raised.
    pub async fn cleanup(&self) -> CleanupReport {
        let paths = std::mem::take(&mut *self.lock());
        let mut report = CleanupReport::default();

        // Reverse order so files go before the directories holding them.
        for path in paths.iter().rev() {
            match remove_path(path).await {
                Ok(true) => report.removed += 1,
                Ok(false) => report.missing += 1,
                Err(e) => {
                    warn!("Failed to remove temp artifact {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            removed = report.removed,
            missing = report.missing,
            failed = report.failed,
            "Temp cleanup finished"
        );
        report
    }
}

async fn remove_path(path: &Path) -> std::io::Result<bool> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).await?;
    } else {
        fs::remove_file(path).await?;
    }
    Ok(true)
}
