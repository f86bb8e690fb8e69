use core::str::FromStr;

use serde::{Deserialize, Serialize};

use vitrine_core::DomainError;

/// Admin-profile access level.
///
/// `SuperAdmin` bypasses the permission grid entirely; the other levels are
/// descriptive metadata as far as the gate is concerned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    ReadOnly,
    Moderator,
    Admin,
    SuperAdmin,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 4] = [
        AccessLevel::ReadOnly,
        AccessLevel::Moderator,
        AccessLevel::Admin,
        AccessLevel::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::ReadOnly => "read_only",
            AccessLevel::Moderator => "moderator",
            AccessLevel::Admin => "admin",
            AccessLevel::SuperAdmin => "super_admin",
        }
    }
}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read_only" => Ok(AccessLevel::ReadOnly),
            "moderator" => Ok(AccessLevel::Moderator),
            "admin" => Ok(AccessLevel::Admin),
            "super_admin" => Ok(AccessLevel::SuperAdmin),
            other => Err(DomainError::validation(format!(
                "unknown access level '{other}'"
            ))),
        }
    }
}
