//! Caller identity and staff permissions carried in JWT claims

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Staff capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    /// Check out, return, reserve and renew copies
    #[serde(rename = "can_mark_returned")]
    MarkReturned,
    /// See every active loan, not only one's own
    #[serde(rename = "can_view_all_loans")]
    ViewAllLoans,
    /// Create, update and delete catalog entries
    #[serde(rename = "can_edit_catalog")]
    EditCatalog,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::MarkReturned => "can_mark_returned",
            Permission::ViewAllLoans => "can_view_all_loans",
            Permission::EditCatalog => "can_edit_catalog",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username
    pub sub: String,
    pub user_id: i32,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(
        user_id: i32,
        username: impl Into<String>,
        permissions: Vec<Permission>,
        ttl_hours: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: username.into(),
            user_id,
            permissions,
            iat: now.timestamp(),
            exp: (now + Duration::hours(ttl_hours as i64)).timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Missing permission {}",
                permission
            )))
        }
    }

    // Authorization checks
    pub fn require_mark_returned(&self) -> Result<(), AppError> {
        self.require(Permission::MarkReturned)
    }

    pub fn require_view_all_loans(&self) -> Result<(), AppError> {
        self.require(Permission::ViewAllLoans)
    }

    pub fn require_edit_catalog(&self) -> Result<(), AppError> {
        self.require(Permission::EditCatalog)
    }
}
