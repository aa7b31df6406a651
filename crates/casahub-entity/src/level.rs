//! Permission level enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access levels granted on a property.
///
/// Levels are ordered by privilege: Owner > Manager > Family > Friend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Full control over the property and everyone on it.
    Owner,
    /// Can manage bookings, guests, and photos.
    Manager,
    /// Household member with read/write access to shared content.
    Family,
    /// Invited guest with limited access.
    Friend,
}

impl PermissionLevel {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::Owner => 4,
            Self::Manager => 3,
            Self::Family => 2,
            Self::Friend => 1,
        }
    }

    /// Check if this level has at least the given level's privileges.
    pub fn has_at_least(&self, other: &PermissionLevel) -> bool {
        self.privilege_level() >= other.privilege_level()
    }

    /// Check if this level is the property owner.
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Family => "family",
            Self::Friend => "friend",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = casahub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "family" => Ok(Self::Family),
            "friend" => Ok(Self::Friend),
            _ => Err(casahub_core::AppError::validation(format!(
                "Invalid permission level: '{s}'. Expected one of: owner, manager, family, friend"
            ))),
        }
    }
}
