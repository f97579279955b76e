//! Permission matrix store
//!
//! The matrix maps each role to the ordered list of permission tokens it
//! currently holds. It is process-wide mutable configuration: seeded from
//! the built-in default table (plus any config overrides), edited at
//! runtime through [`PermissionMatrix::toggle`], and read by every
//! permission check. There is no persistence; a restart returns the
//! matrix to its defaults.

use crate::rbac::audit::AuditLogger;
use crate::rbac::permission::Permission;
use crate::rbac::role::Role;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A point-in-time view of one role's permissions, tagged with the matrix
/// revision it was taken at.
#[derive(Debug, Clone)]
pub struct RoleSnapshot {
    pub permissions: HashSet<Permission>,
    pub revision: u64,
}

struct MatrixState {
    entries: HashMap<Role, Vec<Permission>>,
    revision: u64,
}

/// Shared handle to the role-to-permission matrix
///
/// Cheap to clone; all clones see the same state. Mutation goes through
/// `toggle` and `set_role_permissions` only, and every successful
/// mutation bumps the revision counter so session resolvers can detect
/// staleness before answering a permission query.
#[derive(Clone)]
pub struct PermissionMatrix {
    inner: Arc<RwLock<MatrixState>>,
    audit: AuditLogger,
}

impl PermissionMatrix {
    /// Create a matrix seeded with the default table
    pub fn new(audit: AuditLogger) -> Self {
        Self::with_entries(default_entries(), audit)
    }

    /// Create a matrix with explicit entries
    pub fn with_entries(entries: HashMap<Role, Vec<Permission>>, audit: AuditLogger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MatrixState {
                entries,
                revision: 0,
            })),
            audit,
        }
    }

    /// Get the ordered permission list for a role.
    ///
    /// A role with no entry yields an empty list. That is a configuration
    /// gap, not an error: the user proceeds with zero permissions.
    pub async fn get(&self, role: Role) -> Vec<Permission> {
        let state = self.inner.read().await;
        match state.entries.get(&role) {
            Some(perms) => perms.clone(),
            None => {
                warn!("No matrix entry for role '{}', treating as empty", role);
                Vec::new()
            }
        }
    }

    /// Check whether a role currently holds a permission
    pub async fn contains(&self, role: Role, permission: &Permission) -> bool {
        let state = self.inner.read().await;
        state
            .entries
            .get(&role)
            .is_some_and(|perms| perms.contains(permission))
    }

    /// Toggle a permission for a role: remove it if present, append it
    /// otherwise. Returns whether the role holds the permission after the
    /// call. Other roles are never touched, and two identical toggles
    /// restore the original membership.
    pub async fn toggle(&self, role: Role, permission: Permission) -> bool {
        let granted = {
            let mut state = self.inner.write().await;
            let perms = state.entries.entry(role).or_default();
            let granted = if perms.contains(&permission) {
                perms.retain(|p| p != &permission);
                false
            } else {
                perms.push(permission.clone());
                true
            };
            state.revision += 1;
            debug!(
                "Matrix toggle: role={} permission={} granted={} revision={}",
                role, permission, granted, state.revision
            );
            granted
        };
        self.audit.log_toggle(role, &permission, granted);
        granted
    }

    /// Replace a role's permission list wholesale (config override path)
    pub async fn set_role_permissions(&self, role: Role, permissions: Vec<Permission>) {
        let mut state = self.inner.write().await;
        state.entries.insert(role, permissions);
        state.revision += 1;
    }

    /// Current matrix revision; bumped on every mutation
    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    /// Materialize a role's permission set together with the revision it
    /// was read at, for session snapshots.
    pub async fn snapshot(&self, role: Role) -> RoleSnapshot {
        let state = self.inner.read().await;
        let permissions = match state.entries.get(&role) {
            Some(perms) => perms.iter().cloned().collect(),
            None => {
                warn!("No matrix entry for role '{}', treating as empty", role);
                HashSet::new()
            }
        };
        RoleSnapshot {
            permissions,
            revision: state.revision,
        }
    }
}

fn perms(tokens: &[&str]) -> Vec<Permission> {
    tokens
        .iter()
        .filter_map(|t| Permission::parse(*t).ok())
        .collect()
}

/// Built-in default permission table for the trade platform
pub fn default_entries() -> HashMap<Role, Vec<Permission>> {
    let mut entries = HashMap::new();
    entries.insert(
        Role::Exporter,
        perms(&[
            "order:view",
            "order:manage",
            "shipment:view",
            "shipment:manage",
            "supplier:view",
            "dispute:view",
            "dispute:manage",
            "wallet:view",
            "wallet:manage",
            "chat:view",
            "notification:view",
        ]),
    );
    entries.insert(
        Role::Buyer,
        perms(&[
            "order:view",
            "order:manage",
            "shipment:view",
            "supplier:view",
            "supplier:manage",
            "dispute:view",
            "dispute:manage",
            "wallet:view",
            "wallet:manage",
            "chat:view",
            "notification:view",
        ]),
    );
    entries.insert(
        Role::Logistics,
        perms(&[
            "order:view",
            "shipment:view",
            "shipment:manage",
            "chat:view",
            "notification:view",
        ]),
    );
    entries.insert(
        Role::Agent,
        perms(&[
            "order:view",
            "shipment:view",
            "supplier:view",
            "dispute:view",
            "chat:view",
            "notification:view",
        ]),
    );
    entries.insert(
        Role::Admin,
        perms(&[
            "order:view",
            "order:manage",
            "shipment:view",
            "shipment:manage",
            "supplier:view",
            "supplier:manage",
            "dispute:view",
            "dispute:manage",
            "wallet:view",
            "wallet:manage",
            "chat:view",
            "notification:view",
            "admin:user:manage",
            "admin:role:manage",
        ]),
    );
    entries.insert(
        Role::GuestExporter,
        perms(&["order:view", "shipment:view", "notification:view"]),
    );
    entries.insert(
        Role::GuestBuyer,
        perms(&["order:view", "supplier:view", "notification:view"]),
    );
    entries
}
