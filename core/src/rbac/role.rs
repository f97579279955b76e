//! Role definitions and conversions

use serde::{Deserialize, Serialize};
use std::fmt;

/// User roles on the trade platform.
///
/// Roles are flat categories, not privilege levels: what a role can do is
/// decided entirely by its row in the permission matrix, and permissions
/// are granted or withheld independently per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Exporter - sells goods and manages outbound shipments
    Exporter,
    /// Buyer - purchases goods and manages suppliers
    Buyer,
    /// Logistics - carrier handling shipment execution
    Logistics,
    /// Agent - intermediary with read-mostly access
    Agent,
    /// Admin - platform operator, manages users and roles
    Admin,
    /// Guest exporter - unverified exporter account
    GuestExporter,
    /// Guest buyer - unverified buyer account
    GuestBuyer,
}

impl Role {
    /// Every role variant, for matrix maintenance and iteration
    pub const ALL: [Role; 7] = [
        Role::Exporter,
        Role::Buyer,
        Role::Logistics,
        Role::Agent,
        Role::Admin,
        Role::GuestExporter,
        Role::GuestBuyer,
    ];

    /// Parse role from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exporter" => Some(Role::Exporter),
            "buyer" => Some(Role::Buyer),
            "logistics" => Some(Role::Logistics),
            "agent" => Some(Role::Agent),
            "admin" => Some(Role::Admin),
            "guest_exporter" | "guestexporter" => Some(Role::GuestExporter),
            "guest_buyer" | "guestbuyer" => Some(Role::GuestBuyer),
            _ => None,
        }
    }

    /// Get role name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Exporter => "exporter",
            Role::Buyer => "buyer",
            Role::Logistics => "logistics",
            Role::Agent => "agent",
            Role::Admin => "admin",
            Role::GuestExporter => "guest_exporter",
            Role::GuestBuyer => "guest_buyer",
        }
    }

    /// Whether this is one of the unverified guest variants
    pub fn is_guest(&self) -> bool {
        matches!(self, Role::GuestExporter | Role::GuestBuyer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
