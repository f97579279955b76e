//! Dashboard pages and their permission requirements

use crate::rbac::Permission;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Navigable dashboard pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Dashboard,
    Orders,
    Shipments,
    Suppliers,
    Disputes,
    Wallet,
    Chat,
    Notifications,
    Profile,
    UserManagement,
    RoleManagement,
}

impl Page {
    pub const ALL: [Page; 11] = [
        Page::Dashboard,
        Page::Orders,
        Page::Shipments,
        Page::Suppliers,
        Page::Disputes,
        Page::Wallet,
        Page::Chat,
        Page::Notifications,
        Page::Profile,
        Page::UserManagement,
        Page::RoleManagement,
    ];

    /// Parse page from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dashboard" => Some(Page::Dashboard),
            "orders" => Some(Page::Orders),
            "shipments" => Some(Page::Shipments),
            "suppliers" => Some(Page::Suppliers),
            "disputes" => Some(Page::Disputes),
            "wallet" => Some(Page::Wallet),
            "chat" => Some(Page::Chat),
            "notifications" => Some(Page::Notifications),
            "profile" => Some(Page::Profile),
            "user_management" | "usermanagement" => Some(Page::UserManagement),
            "role_management" | "rolemanagement" => Some(Page::RoleManagement),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Orders => "orders",
            Page::Shipments => "shipments",
            Page::Suppliers => "suppliers",
            Page::Disputes => "disputes",
            Page::Wallet => "wallet",
            Page::Chat => "chat",
            Page::Notifications => "notifications",
            Page::Profile => "profile",
            Page::UserManagement => "user_management",
            Page::RoleManagement => "role_management",
        }
    }

    /// Human-readable page title
    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Orders => "Orders",
            Page::Shipments => "Shipments",
            Page::Suppliers => "Suppliers",
            Page::Disputes => "Disputes",
            Page::Wallet => "Wallet",
            Page::Chat => "Chat",
            Page::Notifications => "Notifications",
            Page::Profile => "Profile",
            Page::UserManagement => "User Management",
            Page::RoleManagement => "Role Management",
        }
    }

    /// The single permission required to view this page, or `None` for
    /// pages public to every authenticated role.
    pub fn required_permission(&self) -> Option<Permission> {
        let token = match self {
            Page::Dashboard | Page::Profile => return None,
            Page::Orders => "order:view",
            Page::Shipments => "shipment:view",
            Page::Suppliers => "supplier:view",
            Page::Disputes => "dispute:view",
            Page::Wallet => "wallet:view",
            Page::Chat => "chat:view",
            Page::Notifications => "notification:view",
            Page::UserManagement => "admin:user:manage",
            Page::RoleManagement => "admin:role:manage",
        };
        Permission::parse(token).ok()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
