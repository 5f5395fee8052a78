//! File-based audit sink.
//!
//! Appends one JSON object per line. The file is opened in append mode and
//! never rewritten.
//!
//! # Thread safety
//!
//! A `tokio::sync::Mutex` around the file handle serializes writes so lines
//! from concurrent requests never interleave.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

use crate::audit::{AuditEvent, AuditSink};
use crate::error::AuditError;

/// Audit sink that writes JSON lines to a file.
pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<Option<File>>,
}

impl FileAuditSink {
    /// Create a sink writing to `path`. The file is created lazily on the
    /// first append.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(None),
        }
    }

    async fn writer(&self) -> Result<MutexGuard<'_, Option<File>>, AuditError> {
        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| self.failure(format!("open '{}': {e}", self.path.display())))?;
            *guard = Some(file);
        }
        Ok(guard)
    }

    fn failure(&self, reason: String) -> AuditError {
        AuditError::SinkFailure {
            name: self.name().to_owned(),
            reason,
        }
    }
}

#[async_trait::async_trait]
impl AuditSink for FileAuditSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(event).map_err(|e| AuditError::Serialization {
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        let mut guard = self.writer().await?;
        let file = guard
            .as_mut()
            .ok_or_else(|| self.failure("file handle missing after open".to_owned()))?;

        file.write_all(&line)
            .await
            .map_err(|e| self.failure(format!("write: {e}")))?;
        file.flush()
            .await
            .map_err(|e| self.failure(format!("flush: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
