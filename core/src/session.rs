//! Session resolution and lifecycle
//!
//! The resolver owns the current authenticated session: it materializes a
//! permission snapshot from the matrix at login, re-derives it when the
//! matrix changes, and answers every `has_permission` query. Permission
//! edits made while a user is logged in take effect without a re-login.

use crate::error::{AuthError, Result};
use crate::rbac::{AuditLogger, Permission, PermissionMatrix, Role};
use crate::users::{User, UserDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// An authenticated session: the user plus a resolved permission snapshot
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    /// Permission set materialized from the matrix for the user's role
    pub permissions: HashSet<Permission>,
    /// Matrix revision the snapshot was derived from
    pub revision: u64,
    pub created_at: DateTime<Utc>,
}

/// External credential check performed during login.
///
/// The platform has no real authentication; the default implementation
/// models the upstream provider's latency with a single suspension point.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn authenticate(&self, user_id: &str) -> Result<()>;
}

/// Mock credential provider with a configurable delay
pub struct MockProvider {
    delay: Duration,
}

impl MockProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl CredentialProvider for MockProvider {
    async fn authenticate(&self, _user_id: &str) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct RememberedUser {
    user_id: String,
}

/// Persisted "remembered user id" used for silent re-login on startup.
///
/// The only durable state in the system. Read failures of any kind
/// degrade to "nobody remembered".
#[derive(Clone)]
pub struct RememberedUserStore {
    path: PathBuf,
}

impl RememberedUserStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the default data directory
    pub fn default_location() -> Self {
        Self::new(crate::config::get_data_dir().join("remembered_user.json"))
    }

    /// Load the remembered user id, if any
    pub async fn load(&self) -> Option<String> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read remembered user file: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<RememberedUser>(&contents) {
            Ok(remembered) => Some(remembered.user_id),
            Err(e) => {
                warn!("Corrupt remembered user file, ignoring: {}", e);
                None
            }
        }
    }

    /// Persist a user id
    pub async fn remember(&self, user_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&RememberedUser {
            user_id: user_id.to_string(),
        })?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Forget the remembered user id
    pub async fn clear(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to clear remembered user file: {}", e);
            }
        }
    }
}

struct ResolverState {
    session: Option<Session>,
    /// Bumped by every login attempt, registration and logout. A login
    /// that resolves against a stale generation is discarded instead of
    /// installed, so logout never resurrects and the latest attempt wins.
    generation: u64,
}

/// Shared handle to the session resolver
#[derive(Clone)]
pub struct SessionResolver {
    directory: UserDirectory,
    matrix: PermissionMatrix,
    provider: Arc<dyn CredentialProvider>,
    audit: AuditLogger,
    store: RememberedUserStore,
    state: Arc<RwLock<ResolverState>>,
}

impl SessionResolver {
    pub fn new(directory: UserDirectory, matrix: PermissionMatrix, audit: AuditLogger) -> Self {
        Self {
            directory,
            matrix,
            provider: Arc::new(MockProvider::default()),
            audit,
            store: RememberedUserStore::default_location(),
            state: Arc::new(RwLock::new(ResolverState {
                session: None,
                generation: 0,
            })),
        }
    }

    /// Replace the credential provider
    pub fn with_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Replace the remembered-user store
    pub fn with_store(mut self, store: RememberedUserStore) -> Self {
        self.store = store;
        self
    }

    /// Log a user in and materialize their permission snapshot.
    ///
    /// Fails with `UserNotFound` for unknown ids, leaving the resolver
    /// unauthenticated. With `remember` set, the id is persisted for
    /// silent re-login on the next startup.
    pub async fn login(&self, user_id: &str, remember: bool) -> Result<Session> {
        let ticket = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.generation
        };

        self.provider.authenticate(user_id).await?;

        let user = match self.directory.get(user_id).await {
            Some(user) => user,
            None => {
                self.audit
                    .log_login(user_id, None, false, Some("user not found".to_string()));
                return Err(AuthError::UserNotFound(user_id.to_string()).into());
            }
        };

        let snapshot = self.matrix.snapshot(user.role).await;
        let session = Session {
            user,
            permissions: snapshot.permissions,
            revision: snapshot.revision,
            created_at: Utc::now(),
        };

        {
            let mut state = self.state.write().await;
            if state.generation != ticket {
                debug!("Discarding login for '{}': superseded", user_id);
                return Err(AuthError::Superseded.into());
            }
            state.session = Some(session.clone());
        }

        info!(
            "Session opened: user={} role={} permissions={}",
            session.user.id,
            session.user.role,
            session.permissions.len()
        );
        self.audit
            .log_login(&session.user.id, Some(session.user.role), true, None);

        if remember {
            if let Err(e) = self.store.remember(&session.user.id).await {
                warn!("Failed to persist remembered user: {}", e);
            }
        }

        Ok(session)
    }

    /// Clear the session and the remembered id. Never fails.
    pub async fn logout(&self) {
        let closed = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.session.take()
        };
        if let Some(session) = closed {
            info!("Session closed: user={}", session.user.id);
            self.audit.log_logout(&session.user.id, session.user.role);
        }
        self.store.clear().await;
    }

    /// Create a new user and resolve a session for them in one step.
    ///
    /// A role with no matrix entry resolves to zero permissions (the
    /// matrix warns about the gap); registration itself never fails for
    /// that reason.
    pub async fn register(&self, name: &str, email: &str, role: Role) -> Result<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidRegistration("name must not be empty".to_string()).into());
        }
        if !email.contains('@') {
            return Err(
                AuthError::InvalidRegistration(format!("invalid email: {}", email)).into(),
            );
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        };
        self.directory.insert(user.clone()).await?;

        let snapshot = self.matrix.snapshot(role).await;
        let session = Session {
            user,
            permissions: snapshot.permissions,
            revision: snapshot.revision,
            created_at: Utc::now(),
        };

        {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.session = Some(session.clone());
        }

        info!(
            "Registered user={} role={} permissions={}",
            session.user.id,
            role,
            session.permissions.len()
        );
        self.audit
            .log_login(&session.user.id, Some(role), true, Some("registration".to_string()));

        Ok(session)
    }

    /// Attempt a silent login from the remembered user id.
    ///
    /// Absent or corrupt storage means no auto-login; a remembered id
    /// that no longer resolves is cleared.
    pub async fn try_auto_login(&self) -> Option<Session> {
        let user_id = self.store.load().await?;
        match self.login(&user_id, false).await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Auto-login for remembered user '{}' failed: {}", user_id, e);
                self.store.clear().await;
                None
            }
        }
    }

    /// Whether the resolver currently holds a session
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    /// The current session, if any
    pub async fn current(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    /// Whether the active session holds the permission.
    ///
    /// Unauthenticated resolvers answer `false`. If the matrix moved
    /// since the snapshot was taken, the session is re-resolved first, so
    /// matrix edits propagate to live sessions without explicit wiring.
    pub async fn has_permission(&self, permission: &Permission) -> bool {
        self.refresh_if_stale().await;
        let state = self.state.read().await;
        state
            .session
            .as_ref()
            .is_some_and(|s| s.permissions.contains(permission))
    }

    /// Re-derive the active session's permission set from the current
    /// matrix. The stored set is only replaced when membership actually
    /// changed; the revision tag always advances so the comparison is not
    /// repeated on every query.
    pub async fn on_matrix_changed(&self) {
        let role = {
            let state = self.state.read().await;
            match &state.session {
                Some(session) => session.user.role,
                None => return,
            }
        };

        let snapshot = self.matrix.snapshot(role).await;

        let mut state = self.state.write().await;
        let Some(session) = state.session.as_mut() else {
            return;
        };
        // The session may have been swapped while the snapshot was taken
        if session.user.role != role {
            return;
        }
        session.revision = snapshot.revision;
        if session.permissions != snapshot.permissions {
            debug!(
                "Re-resolved session for user={}: {} permissions",
                session.user.id,
                snapshot.permissions.len()
            );
            session.permissions = snapshot.permissions;
        }
    }

    async fn refresh_if_stale(&self) {
        let current = self.matrix.revision().await;
        let stale = {
            let state = self.state.read().await;
            state
                .session
                .as_ref()
                .is_some_and(|s| s.revision != current)
        };
        if stale {
            self.on_matrix_changed().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn perm(token: &str) -> Permission {
        Permission::parse(token).unwrap()
    }

    fn test_resolver(temp: &TempDir) -> SessionResolver {
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        SessionResolver::new(UserDirectory::new(), matrix, audit)
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")))
    }

    #[tokio::test]
    async fn test_login_materializes_snapshot() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let session = resolver.login("exp-001", false).await.unwrap();
        assert_eq!(session.user.role, Role::Exporter);
        assert!(session.permissions.contains(&perm("order:manage")));
        assert!(!session.permissions.contains(&perm("admin:role:manage")));
        assert!(resolver.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let err = resolver.login("unknown-id-123", false).await.unwrap_err();
        assert!(err.to_string().contains("User not found"));
        assert!(!resolver.is_authenticated().await);
        assert!(!resolver.has_permission(&perm("order:view")).await);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        resolver.login("buy-001", true).await.unwrap();
        resolver.logout().await;

        assert!(!resolver.is_authenticated().await);
        assert!(!resolver.has_permission(&perm("order:view")).await);
        assert!(resolver.try_auto_login().await.is_none());
    }

    #[tokio::test]
    async fn test_remembered_user_round_trip() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        resolver.login("agt-001", true).await.unwrap();

        // A fresh resolver sharing the store picks the session up silently
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let fresh = SessionResolver::new(UserDirectory::new(), matrix, audit)
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));
        let session = fresh.try_auto_login().await.unwrap();
        assert_eq!(session.user.id, "agt-001");
    }

    #[tokio::test]
    async fn test_corrupt_remembered_file_degrades() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("remembered.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = RememberedUserStore::new(path);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_remembered_id_is_cleared() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("remembered.json");
        let store = RememberedUserStore::new(path.clone());
        store.remember("gone-user").await.unwrap();

        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let resolver = SessionResolver::new(UserDirectory::new(), matrix, audit)
            .with_store(RememberedUserStore::new(path.clone()));

        assert!(resolver.try_auto_login().await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_matrix_toggle_propagates_live() {
        let temp = TempDir::new().unwrap();
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let resolver = SessionResolver::new(UserDirectory::new(), matrix.clone(), audit)
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));

        resolver.login("agt-001", false).await.unwrap();
        let p = perm("admin:user:manage");
        assert!(!resolver.has_permission(&p).await);

        matrix.toggle(Role::Agent, p.clone()).await;
        assert!(resolver.has_permission(&p).await);

        matrix.toggle(Role::Agent, p.clone()).await;
        assert!(!resolver.has_permission(&p).await);
    }

    #[tokio::test]
    async fn test_on_matrix_changed_explicit() {
        let temp = TempDir::new().unwrap();
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let resolver = SessionResolver::new(UserDirectory::new(), matrix.clone(), audit)
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));

        resolver.login("log-001", false).await.unwrap();
        matrix.toggle(Role::Logistics, perm("wallet:view")).await;
        resolver.on_matrix_changed().await;

        let session = resolver.current().await.unwrap();
        assert!(session.permissions.contains(&perm("wallet:view")));
        assert_eq!(session.revision, matrix.revision().await);
    }

    #[tokio::test]
    async fn test_register_resolves_immediately() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let session = resolver
            .register("Nadia Haddad", "nadia@levanttrade.com", Role::Buyer)
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Buyer);
        assert!(session.permissions.contains(&perm("supplier:manage")));
        assert!(resolver.is_authenticated().await);
        assert!(resolver.has_permission(&perm("order:view")).await);
    }

    #[tokio::test]
    async fn test_register_with_unconfigured_role() {
        let temp = TempDir::new().unwrap();
        let audit = AuditLogger::default();
        let matrix =
            PermissionMatrix::with_entries(std::collections::HashMap::new(), audit.clone());
        let resolver = SessionResolver::new(UserDirectory::empty(), matrix, audit)
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));

        let session = resolver
            .register("Zero Perms", "zero@example.com", Role::Agent)
            .await
            .unwrap();
        assert!(session.permissions.is_empty());
        assert!(!resolver.has_permission(&perm("order:view")).await);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        assert!(resolver.register("", "a@b.com", Role::Buyer).await.is_err());
        assert!(resolver
            .register("Name", "not-an-email", Role::Buyer)
            .await
            .is_err());
        assert!(!resolver.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_discards_inflight_login() {
        let temp = TempDir::new().unwrap();
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let resolver = SessionResolver::new(UserDirectory::new(), matrix, audit)
            .with_provider(Arc::new(MockProvider::from_millis(50)))
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));

        let slow = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.login("exp-001", false).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        resolver.logout().await;

        let result = slow.await.unwrap();
        assert!(matches!(
            result,
            Err(crate::error::TradedeckError::Auth(AuthError::Superseded))
        ));
        assert!(!resolver.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_latest_login_wins() {
        let temp = TempDir::new().unwrap();
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let resolver = SessionResolver::new(UserDirectory::new(), matrix, audit)
            .with_provider(Arc::new(MockProvider::from_millis(50)))
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));

        let first = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.login("exp-001", false).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = resolver.login("buy-001", false).await;

        // The slower first attempt resolves after the second and must not
        // overwrite it
        let first = first.await.unwrap();
        assert!(second.is_ok());
        assert!(matches!(
            first,
            Err(crate::error::TradedeckError::Auth(AuthError::Superseded))
        ));
        let current = resolver.current().await.unwrap();
        assert_eq!(current.user.id, "buy-001");
    }
}
