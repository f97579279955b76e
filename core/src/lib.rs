//! TradeDeck Core Library
//!
//! Access-control core for the TradeDeck trade-platform dashboard: the
//! role-to-permission matrix, session resolution with live permission
//! propagation, and page-gated navigation. Rendering and per-page CRUD
//! surfaces are external collaborators that consume the decisions made
//! here.

pub mod config;
pub mod error;
pub mod gate;
pub mod pages;
pub mod rbac;
pub mod session;
pub mod users;

// Re-exports for convenience
pub use config::{
    default_config, get_config_dir, get_config_path, get_data_dir, load_config, load_config_from,
    save_config, AuthConfig, Config, MatrixOverrides, PlatformConfig,
};
pub use error::*;
pub use gate::{NavigationOutcome, PageGate};
pub use pages::Page;
pub use rbac::{
    process_audit_logs, AuditLogEntry, AuditLogger, Permission, PermissionMatrix, Role,
    RoleSnapshot,
};
pub use session::{
    CredentialProvider, MockProvider, RememberedUserStore, Session, SessionResolver,
};
pub use users::{User, UserDirectory};
