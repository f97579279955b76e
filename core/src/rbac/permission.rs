//! Permission tokens

use crate::error::MatrixError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque `<resource>:<action>` capability token, e.g. `order:manage`
/// or `admin:role:manage`.
///
/// Tokens are compared as whole strings: there are no wildcards and no
/// inheritance between tokens. The resource part may itself contain
/// colons; the action is everything after the last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Parse a permission token, rejecting anything without a
    /// `<resource>:<action>` shape.
    pub fn parse(token: impl Into<String>) -> Result<Self, MatrixError> {
        let token = token.into();
        match token.rsplit_once(':') {
            Some((resource, action)) if !resource.is_empty() && !action.is_empty() => {
                Ok(Self(token))
            }
            _ => Err(MatrixError::InvalidPermission(token)),
        }
    }

    /// The full token string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource part (everything before the last colon)
    pub fn resource(&self) -> &str {
        self.0.rsplit_once(':').map(|(r, _)| r).unwrap_or(&self.0)
    }

    /// The action part (everything after the last colon)
    pub fn action(&self) -> &str {
        self.0.rsplit_once(':').map(|(_, a)| a).unwrap_or("")
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
