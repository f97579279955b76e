//! Configuration system for TradeDeck
//!
//! Configuration is a JSON file under the dotdir, with every field
//! optional and defaulted. The matrix overrides replace whole rows of the
//! built-in default permission table at startup.

use crate::error::{ConfigError, Result};
use crate::pages::Page;
use crate::rbac::{Permission, PermissionMatrix, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;

/// Platform-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Landing page entered after login
    #[serde(default = "default_page")]
    pub default_page: Page,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            default_page: default_page(),
        }
    }
}

fn default_page() -> Page {
    Page::Dashboard
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Simulated external provider latency in milliseconds
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,
    /// Whether logins persist the remembered user id unless told otherwise
    #[serde(default)]
    pub remember_by_default: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_delay_ms: default_login_delay_ms(),
            remember_by_default: false,
        }
    }
}

fn default_login_delay_ms() -> u64 {
    150
}

/// Per-role overrides of the default permission table
///
/// Keys are role names, values are full permission lists replacing that
/// role's default row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatrixOverrides {
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
}

impl MatrixOverrides {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Resolve role names and permission tokens, or report the first
    /// offending entry.
    fn resolve(&self) -> std::result::Result<Vec<(Role, Vec<Permission>)>, String> {
        let mut resolved = Vec::new();
        for (role_name, tokens) in &self.roles {
            let role = Role::from_str(role_name)
                .ok_or_else(|| format!("Unknown role in matrix overrides: {}", role_name))?;
            let mut permissions = Vec::new();
            for token in tokens {
                let permission = Permission::parse(token.clone()).map_err(|_| {
                    format!(
                        "Invalid permission token '{}' for role '{}'",
                        token, role_name
                    )
                })?;
                permissions.push(permission);
            }
            resolved.push((role, permissions));
        }
        Ok(resolved)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.resolve().map(|_| ())
    }

    /// Apply the overrides to a matrix
    pub async fn apply(&self, matrix: &PermissionMatrix) -> Result<()> {
        let resolved = self.resolve().map_err(ConfigError::Invalid)?;
        for (role, permissions) in resolved {
            matrix.set_role_permissions(role, permissions).await;
        }
        Ok(())
    }
}

/// Root configuration for TradeDeck
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Platform settings
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Authentication settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Permission matrix overrides
    #[serde(default)]
    pub matrix: MatrixOverrides,
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.matrix.validate()
    }
}

/// Get the default config directory
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tradedeck")
}

/// Get the config file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Get the data directory
pub fn get_data_dir() -> PathBuf {
    get_config_dir()
}

/// Load configuration from file
pub async fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()).await
}

/// Load configuration from an explicit path
pub async fn load_config_from(config_path: &PathBuf) -> Result<Config> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound(config_path.clone()).into());
    }

    let contents = fs::read_to_string(config_path).await?;

    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("Failed to parse config JSON: {}", e)))?;

    config.validate().map_err(ConfigError::Invalid)?;

    Ok(config)
}

/// Save configuration to file
pub async fn save_config(config: &Config) -> Result<()> {
    let config_path = get_config_path();

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, json).await?;

    Ok(())
}

/// Create a default configuration
pub fn default_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::AuditLogger;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.platform.default_page, Page::Dashboard);
        assert_eq!(config.auth.login_delay_ms, 150);
        assert!(!config.auth.remember_by_default);
        assert!(config.matrix.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_validation() {
        let mut overrides = MatrixOverrides::default();
        overrides
            .roles
            .insert("agent".to_string(), vec!["order:view".to_string()]);
        assert!(overrides.validate().is_ok());

        overrides
            .roles
            .insert("pirate".to_string(), vec!["order:view".to_string()]);
        assert!(overrides.validate().unwrap_err().contains("pirate"));
    }

    #[test]
    fn test_overrides_reject_bad_tokens() {
        let mut overrides = MatrixOverrides::default();
        overrides
            .roles
            .insert("buyer".to_string(), vec!["orders".to_string()]);
        assert!(overrides.validate().unwrap_err().contains("orders"));
    }

    #[tokio::test]
    async fn test_overrides_apply() {
        let mut overrides = MatrixOverrides::default();
        overrides
            .roles
            .insert("guest_buyer".to_string(), vec!["chat:view".to_string()]);

        let matrix = PermissionMatrix::new(AuditLogger::default());
        overrides.apply(&matrix).await.unwrap();

        let perms = matrix.get(Role::GuestBuyer).await;
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].as_str(), "chat:view");
        // Untouched roles keep their defaults
        assert!(!matrix.get(Role::Buyer).await.is_empty());
    }

    #[test]
    fn test_config_parse_round_trip() {
        let json = r#"{
            "platform": { "default_page": "orders" },
            "auth": { "login_delay_ms": 5 },
            "matrix": { "roles": { "agent": ["order:view", "chat:view"] } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.platform.default_page, Page::Orders);
        assert_eq!(config.auth.login_delay_ms, 5);
        assert!(config.validate().is_ok());

        let back = serde_json::to_string(&config).unwrap();
        let reparsed: Config = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed.platform.default_page, Page::Orders);
    }
}
