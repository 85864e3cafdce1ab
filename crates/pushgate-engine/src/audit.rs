//! Append-only JSON Lines audit log of justified overrides.
//!
//! Records are only ever appended: the file is opened in append mode, never
//! truncated or rewritten. Writers in this process are serialized by a mutex;
//! writers in other processes by an exclusive `fd-lock` write lock.

use fd_lock::RwLock;
use pushgate_utils::error::AuditError;
use pushgate_utils::types::AuditRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const LOCK_ATTEMPTS: u32 = 20;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line, flushed and synced before returning.
    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_string(record).map_err(|e| AuditError::Serialize(e.to_string()))?;
        line.push('\n');

        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_error(&e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(&e))?;

        let mut lock = RwLock::new(file);
        for attempt in 1..=LOCK_ATTEMPTS {
            if let Ok(mut guard) = lock.try_write() {
                guard
                    .write_all(line.as_bytes())
                    .map_err(|e| self.write_error(&e))?;
                guard.flush().map_err(|e| self.write_error(&e))?;
                guard.sync_all().map_err(|e| self.write_error(&e))?;

                tracing::info!(
                    path = %self.path.display(),
                    failure = %record.failure.id,
                    location = %record.failure.location,
                    "override recorded"
                );
                return Ok(());
            }
            tracing::debug!(attempt, path = %self.path.display(), "audit log locked, retrying");
            std::thread::sleep(LOCK_RETRY_DELAY);
        }

        Err(AuditError::Locked {
            path: self.path.display().to_string(),
        })
    }

    /// Every record in the log, oldest first. A missing log is empty.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.write_error(&e)),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| AuditError::Serialize(e.to_string())))
            .collect()
    }

    fn write_error(&self, error: &std::io::Error) -> AuditError {
        AuditError::Write {
            path: self.path.display().to_string(),
            reason: error.to_string(),
        }
    }
}
