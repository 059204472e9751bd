//! User roles and the capabilities they grant.

use serde::{Deserialize, Serialize};

/// Permission tier attached to a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// What a role is allowed to see.
///
/// Consumers check capabilities rather than role names, so introducing a
/// role only touches [`Role::capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// May see the cost measure in metrics output.
    pub view_cost: bool,
}

impl Role {
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Admin => Capabilities { view_cost: true },
            Self::User => Capabilities { view_cost: false },
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Parse a role name as stored in the users table.
    ///
    /// Names must match exactly; only surrounding whitespace is ignored.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
