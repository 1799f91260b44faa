//! Roles, permissions and JWT claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's role, as issued in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control.
    Owner,
    /// Administrator.
    Admin,
    /// Finance staff.
    Accountant,
    /// Read-only access.
    Viewer,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "accountant" => Ok(Self::Accountant),
            "viewer" => Ok(Self::Viewer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Accountant => "accountant",
            Self::Viewer => "viewer",
        };
        f.write_str(s)
    }
}

/// Module-level permissions checked by API handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read finance data (budgets, GLM accumulators).
    FinanceRead,
    /// Post and consolidate budgets.
    FinanceWrite,
}

impl Permission {
    /// Short code used in error messages.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::FinanceRead => "FINANCE-1",
            Self::FinanceWrite => "FINANCE-3",
        }
    }
}

impl Role {
    /// Returns true if this role carries `permission`.
    #[must_use]
    pub const fn grants(self, permission: Permission) -> bool {
        match permission {
            Permission::FinanceRead => true,
            Permission::FinanceWrite => {
                matches!(self, Self::Owner | Self::Admin | Self::Accountant)
            }
        }
    }
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// User's role.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, role: Role, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Parses the role claim. Unknown roles yield `None`.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    /// Returns true if the token's role carries `permission`.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role().is_some_and(|role| role.grants(permission))
    }
}
