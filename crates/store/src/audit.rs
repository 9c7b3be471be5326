use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub invoice_name: Option<String>,
    pub tx_id: Option<String>,
    pub identifier: Option<String>,
    pub digest: Option<String>,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            invoice_name: None,
            tx_id: None,
            identifier: None,
            digest: None,
            error: None,
        }
    }

    pub fn for_invoice(event_type: &str, name: &str, tx_id: &str) -> Self {
        let mut event = Self::new(event_type);
        event.invoice_name = Some(name.to_string());
        event.tx_id = Some(tx_id.to_string());
        event
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn with_digest(mut self, digest: &str) -> Self {
        self.digest = Some(digest.to_string());
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Append-only JSON-lines trail of invoice state changes.
#[derive(Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl AuditLog {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            lock: Arc::default(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Failures are logged, never returned: auditing must not block invoice
    /// processing.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(&event) {
            tracing::warn!(event_type=%event.event_type, error=%e, "audit event not written");
        }
    }

    fn write(&self, event: &AuditEvent) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(event)?;
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", json)?;
        tracing::debug!(event_type=%event.event_type, "audit event written");
        Ok(())
    }
}
