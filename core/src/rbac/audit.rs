//! Audit logging for access-control decisions

use crate::rbac::permission::Permission;
use crate::rbac::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
    /// Event kind: "login", "logout", "navigation" or "matrix_toggle"
    pub event: String,
    /// Acting user id, when a session is involved
    pub user_id: Option<String>,
    /// Role the decision was made against
    pub role: Option<String>,
    /// Subject of the event (page name, permission token, user id)
    pub subject: String,
    /// Outcome: "allowed", "denied", "granted" or "revoked"
    pub outcome: String,
    /// Optional detail, e.g. the permission a denial was missing
    pub detail: Option<String>,
}

/// Audit logger for access-control events
///
/// Entries are pushed onto an unbounded channel; `process_audit_logs`
/// drains them in a background task. A logger whose receiver is gone
/// degrades to a debug log and never errors back to callers.
#[derive(Clone)]
pub struct AuditLogger {
    sender: mpsc::UnboundedSender<AuditLogEntry>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditLogEntry>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Record a login attempt
    pub fn log_login(&self, user_id: &str, role: Option<Role>, allowed: bool, detail: Option<String>) {
        self.push(AuditLogEntry {
            timestamp: Utc::now(),
            event: "login".to_string(),
            user_id: Some(user_id.to_string()),
            role: role.map(|r| r.as_str().to_string()),
            subject: user_id.to_string(),
            outcome: outcome_str(allowed).to_string(),
            detail,
        });
    }

    /// Record a logout
    pub fn log_logout(&self, user_id: &str, role: Role) {
        self.push(AuditLogEntry {
            timestamp: Utc::now(),
            event: "logout".to_string(),
            user_id: Some(user_id.to_string()),
            role: Some(role.as_str().to_string()),
            subject: user_id.to_string(),
            outcome: "allowed".to_string(),
            detail: None,
        });
    }

    /// Record a navigation attempt and its outcome
    pub fn log_navigation(
        &self,
        user_id: Option<&str>,
        role: Option<Role>,
        page: &str,
        allowed: bool,
        detail: Option<String>,
    ) {
        self.push(AuditLogEntry {
            timestamp: Utc::now(),
            event: "navigation".to_string(),
            user_id: user_id.map(|u| u.to_string()),
            role: role.map(|r| r.as_str().to_string()),
            subject: page.to_string(),
            outcome: outcome_str(allowed).to_string(),
            detail,
        });
    }

    /// Record a permission matrix toggle
    pub fn log_toggle(&self, role: Role, permission: &Permission, granted: bool) {
        self.push(AuditLogEntry {
            timestamp: Utc::now(),
            event: "matrix_toggle".to_string(),
            user_id: None,
            role: Some(role.as_str().to_string()),
            subject: permission.as_str().to_string(),
            outcome: if granted { "granted" } else { "revoked" }.to_string(),
            detail: None,
        });
    }

    fn push(&self, entry: AuditLogEntry) {
        if let Err(e) = self.sender.send(entry) {
            debug!("Audit receiver gone, dropping entry: {}", e);
        }
    }
}

fn outcome_str(allowed: bool) -> &'static str {
    if allowed { "allowed" } else { "denied" }
}

impl Default for AuditLogger {
    fn default() -> Self {
        let (sender, _) = mpsc::unbounded_channel();
        Self { sender }
    }
}

/// Background task to process audit logs
pub async fn process_audit_logs(mut receiver: mpsc::UnboundedReceiver<AuditLogEntry>) {
    while let Some(entry) = receiver.recv().await {
        match serde_json::to_string(&entry) {
            Ok(line) => tracing::info!(target: "tradedeck::audit", "{}", line),
            Err(e) => error!("Failed to serialize audit entry: {}", e),
        }
    }
}
