//! Error types for TradeDeck

use std::path::PathBuf;
use thiserror::Error;

/// Result type for TradeDeck operations
pub type Result<T> = std::result::Result<T, TradedeckError>;

/// Main error type for TradeDeck
#[derive(Error, Debug)]
pub enum TradedeckError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Authentication and registration errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Permission matrix errors
    #[error("Permission matrix error: {0}")]
    Matrix(#[from] MatrixError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Authentication and registration errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Login superseded by a newer attempt")]
    Superseded,
}

/// Permission matrix errors
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Invalid permission token: {0}")]
    InvalidPermission(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

impl From<anyhow::Error> for TradedeckError {
    fn from(err: anyhow::Error) -> Self {
        TradedeckError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for TradedeckError {
    fn from(err: serde_json::Error) -> Self {
        TradedeckError::Other(format!("JSON error: {}", err))
    }
}
