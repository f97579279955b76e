//! Page gate: navigation enforcement
//!
//! The gate owns the current page and is the only mutation path for it.
//! Renderers call `can_navigate` to suppress disallowed controls and
//! `navigate` to move; a denied attempt leaves the current page untouched
//! and is audited, never raised as an error.

use crate::pages::Page;
use crate::rbac::{AuditLogger, Permission};
use crate::session::SessionResolver;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The current page changed
    Moved(Page),
    /// The requested page was already current
    AlreadyThere(Page),
    /// The session lacks the page's required permission
    Denied { page: Page, missing: Permission },
    /// No session is active
    Unauthenticated,
}

impl NavigationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            NavigationOutcome::Moved(_) | NavigationOutcome::AlreadyThere(_)
        )
    }
}

/// Shared handle to the page gate
#[derive(Clone)]
pub struct PageGate {
    resolver: SessionResolver,
    audit: AuditLogger,
    current: Arc<RwLock<Option<Page>>>,
    landing: Page,
}

impl PageGate {
    pub fn new(resolver: SessionResolver, audit: AuditLogger) -> Self {
        Self::with_landing(resolver, audit, Page::Dashboard)
    }

    /// Create a gate with a custom post-login landing page
    pub fn with_landing(resolver: SessionResolver, audit: AuditLogger, landing: Page) -> Self {
        Self {
            resolver,
            audit,
            current: Arc::new(RwLock::new(None)),
            landing,
        }
    }

    /// Whether a navigation to `page` would succeed.
    ///
    /// Pages without a requirement are open to every authenticated role;
    /// everything is closed to unauthenticated callers.
    pub async fn can_navigate(&self, page: Page) -> bool {
        if !self.resolver.is_authenticated().await {
            return false;
        }
        match page.required_permission() {
            None => true,
            Some(permission) => self.resolver.has_permission(&permission).await,
        }
    }

    /// Attempt to move to `page`.
    ///
    /// The current page changes iff the attempt is allowed. Every attempt
    /// is audited with its outcome.
    pub async fn navigate(&self, page: Page) -> NavigationOutcome {
        let session = self.resolver.current().await;
        let Some(session) = session else {
            self.audit.log_navigation(
                None,
                None,
                page.as_str(),
                false,
                Some("unauthenticated".to_string()),
            );
            return NavigationOutcome::Unauthenticated;
        };

        if let Some(missing) = self.missing_permission(page).await {
            debug!(
                "Navigation denied: user={} page={} missing={}",
                session.user.id, page, missing
            );
            self.audit.log_navigation(
                Some(&session.user.id),
                Some(session.user.role),
                page.as_str(),
                false,
                Some(format!("missing {}", missing)),
            );
            return NavigationOutcome::Denied { page, missing };
        }

        let outcome = {
            let mut current = self.current.write().await;
            if *current == Some(page) {
                NavigationOutcome::AlreadyThere(page)
            } else {
                *current = Some(page);
                NavigationOutcome::Moved(page)
            }
        };
        self.audit.log_navigation(
            Some(&session.user.id),
            Some(session.user.role),
            page.as_str(),
            true,
            None,
        );
        outcome
    }

    /// Move to the configured landing page (call after login)
    pub async fn enter_default(&self) -> NavigationOutcome {
        self.navigate(self.landing).await
    }

    /// Discard the current page (call after logout)
    pub async fn reset(&self) {
        *self.current.write().await = None;
    }

    /// The active page, if any
    pub async fn current_page(&self) -> Option<Page> {
        *self.current.read().await
    }

    /// All pages the active session may navigate to
    pub async fn allowed_pages(&self) -> Vec<Page> {
        let mut allowed = Vec::new();
        for page in Page::ALL {
            if self.can_navigate(page).await {
                allowed.push(page);
            }
        }
        allowed
    }

    async fn missing_permission(&self, page: Page) -> Option<Permission> {
        let permission = page.required_permission()?;
        if self.resolver.has_permission(&permission).await {
            None
        } else {
            Some(permission)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::PermissionMatrix;
    use crate::session::RememberedUserStore;
    use crate::users::UserDirectory;
    use tempfile::TempDir;

    fn test_gate(temp: &TempDir) -> (PageGate, SessionResolver, PermissionMatrix) {
        let audit = AuditLogger::default();
        let matrix = PermissionMatrix::new(audit.clone());
        let resolver = SessionResolver::new(UserDirectory::new(), matrix.clone(), audit.clone())
            .with_store(RememberedUserStore::new(temp.path().join("remembered.json")));
        let gate = PageGate::new(resolver.clone(), audit);
        (gate, resolver, matrix)
    }

    #[tokio::test]
    async fn test_unauthenticated_denied_everywhere() {
        let temp = TempDir::new().unwrap();
        let (gate, _resolver, _matrix) = test_gate(&temp);

        for page in Page::ALL {
            assert!(!gate.can_navigate(page).await);
        }
        assert_eq!(
            gate.navigate(Page::Dashboard).await,
            NavigationOutcome::Unauthenticated
        );
        assert_eq!(gate.current_page().await, None);
    }

    #[tokio::test]
    async fn test_landing_after_login() {
        let temp = TempDir::new().unwrap();
        let (gate, resolver, _matrix) = test_gate(&temp);

        resolver.login("exp-001", false).await.unwrap();
        assert_eq!(
            gate.enter_default().await,
            NavigationOutcome::Moved(Page::Dashboard)
        );
        assert_eq!(gate.current_page().await, Some(Page::Dashboard));
    }

    #[tokio::test]
    async fn test_denied_navigation_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let (gate, resolver, _matrix) = test_gate(&temp);

        resolver.login("buy-001", false).await.unwrap();
        gate.enter_default().await;

        let outcome = gate.navigate(Page::RoleManagement).await;
        assert_eq!(
            outcome,
            NavigationOutcome::Denied {
                page: Page::RoleManagement,
                missing: Permission::parse("admin:role:manage").unwrap(),
            }
        );
        assert_eq!(gate.current_page().await, Some(Page::Dashboard));
    }

    #[tokio::test]
    async fn test_allowed_navigation_moves() {
        let temp = TempDir::new().unwrap();
        let (gate, resolver, _matrix) = test_gate(&temp);

        resolver.login("buy-001", false).await.unwrap();
        gate.enter_default().await;

        assert_eq!(
            gate.navigate(Page::Orders).await,
            NavigationOutcome::Moved(Page::Orders)
        );
        assert_eq!(gate.current_page().await, Some(Page::Orders));
        assert_eq!(
            gate.navigate(Page::Orders).await,
            NavigationOutcome::AlreadyThere(Page::Orders)
        );
    }

    #[tokio::test]
    async fn test_gate_follows_matrix_edits() {
        let temp = TempDir::new().unwrap();
        let (gate, resolver, matrix) = test_gate(&temp);

        resolver.login("agt-001", false).await.unwrap();
        gate.enter_default().await;
        assert!(!gate.can_navigate(Page::UserManagement).await);

        matrix
            .toggle(
                crate::rbac::Role::Agent,
                Permission::parse("admin:user:manage").unwrap(),
            )
            .await;

        assert!(gate.can_navigate(Page::UserManagement).await);
        assert_eq!(
            gate.navigate(Page::UserManagement).await,
            NavigationOutcome::Moved(Page::UserManagement)
        );
    }

    #[tokio::test]
    async fn test_reset_on_logout() {
        let temp = TempDir::new().unwrap();
        let (gate, resolver, _matrix) = test_gate(&temp);

        resolver.login("adm-001", false).await.unwrap();
        gate.enter_default().await;
        assert!(gate.current_page().await.is_some());

        resolver.logout().await;
        gate.reset().await;
        assert_eq!(gate.current_page().await, None);
        assert_eq!(
            gate.navigate(Page::Dashboard).await,
            NavigationOutcome::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_allowed_pages_by_role() {
        let temp = TempDir::new().unwrap();
        let (gate, resolver, _matrix) = test_gate(&temp);

        resolver.login("adm-001", false).await.unwrap();
        assert_eq!(gate.allowed_pages().await.len(), Page::ALL.len());

        resolver.login("gby-001", false).await.unwrap();
        let allowed = gate.allowed_pages().await;
        assert!(allowed.contains(&Page::Dashboard));
        assert!(allowed.contains(&Page::Suppliers));
        assert!(!allowed.contains(&Page::Wallet));
        assert!(!allowed.contains(&Page::RoleManagement));
    }
}
