//! Managed property entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casahub_core::types::{PropertyId, UserId};

/// A managed property owned by an identity.
///
/// The owned-property list is always replaced wholesale after any
/// mutation; individual records are never patched in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Unique property identifier.
    pub id: PropertyId,
    /// Display name of the property.
    pub name: String,
    /// Identity that owns this property.
    pub owner_id: UserId,
    /// Street address, if recorded.
    pub address: Option<String>,
    /// When the record was created. Listings are returned newest-first.
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    /// Display name of the property.
    pub name: String,
    /// Identity that will own the property.
    pub owner_id: UserId,
    /// Street address, if known.
    pub address: Option<String>,
}
