//! Audit trail for consent and credential operations.
//!
//! Audit is write-behind observability, not a correctness dependency: an
//! event is recorded only after the operation it describes has succeeded,
//! and a sink failure is logged and swallowed. It never changes the outcome
//! of the request that produced the event.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::AuditError;

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl AuditEvent {
    /// An event stamped with the current time.
    #[must_use]
    pub fn now(action: &str, actor: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.to_owned(),
            actor: actor.to_owned(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }
}

/// An append-only destination for audit events.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    /// The sink's name (for error reporting).
    fn name(&self) -> &str;

    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be persisted.
    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Fans events out to every registered sink, best-effort.
#[derive(Default)]
pub struct AuditTrail {
    sinks: RwLock<Vec<Arc<dyn AuditSink>>>,
}

impl AuditTrail {
    /// Create a trail with no sinks. Events are dropped until one is added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub async fn add_sink(&self, sink: Arc<dyn AuditSink>) {
        self.sinks.write().await.push(sink);
    }

    /// Append `event` to every sink. Failures are logged, never returned.
    pub async fn record(&self, event: AuditEvent) {
        let sinks = self.sinks.read().await;
        for sink in sinks.iter() {
            if let Err(e) = sink.append(&event).await {
                warn!(
                    sink = sink.name(),
                    action = %event.action,
                    error = %e,
                    "audit append failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail").finish_non_exhaustive()
    }
}

/// Keeps events in memory. Intended for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event appended so far.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditSink for MemoryAuditSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
