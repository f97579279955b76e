//! In-memory user directory
//!
//! The platform runs against mock data: a seeded fixture of one account
//! per role, plus whatever registration adds during the process lifetime.

use crate::error::AuthError;
use crate::rbac::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A platform user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Immutable once assigned; determines the matrix row consulted at login
    pub role: Role,
}

/// Shared handle to the user directory
#[derive(Clone)]
pub struct UserDirectory {
    inner: Arc<RwLock<HashMap<String, User>>>,
}

impl UserDirectory {
    /// Create a directory seeded with the mock fixture
    pub fn new() -> Self {
        let users = seed_users()
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(users)),
        }
    }

    /// Create an empty directory
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Look up a user by id
    pub async fn get(&self, id: &str) -> Option<User> {
        self.inner.read().await.get(id).cloned()
    }

    /// Insert a new user record, rejecting duplicate ids
    pub async fn insert(&self, user: User) -> Result<(), AuthError> {
        let mut users = self.inner.write().await;
        if users.contains_key(&user.id) {
            return Err(AuthError::DuplicateUser(user.id));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    /// All users, sorted by id
    pub async fn all(&self) -> Vec<User> {
        let mut users: Vec<User> = self.inner.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock account fixture, one per role
fn seed_users() -> Vec<User> {
    fn user(id: &str, name: &str, email: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        }
    }

    vec![
        user("exp-001", "Amara Osei", "amara@sahelexports.com", Role::Exporter),
        user("buy-001", "Lena Fischer", "lena@nordictrade.eu", Role::Buyer),
        user("log-001", "Rajan Patel", "rajan@bluewavefreight.com", Role::Logistics),
        user("agt-001", "Tunde Bello", "tunde@westbridge.co", Role::Agent),
        user("adm-001", "Platform Admin", "admin@tradedeck.io", Role::Admin),
        user("gex-001", "Guest Exporter", "guest-exporter@tradedeck.io", Role::GuestExporter),
        user("gby-001", "Guest Buyer", "guest-buyer@tradedeck.io", Role::GuestBuyer),
    ]
}
