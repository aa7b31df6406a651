//! Identity and profile entities.

use serde::{Deserialize, Serialize};

use casahub_core::types::UserId;

use crate::level::PermissionLevel;

/// The authenticated user, derived 1:1 from the current session.
///
/// Present exactly while signed in; absent otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier assigned by the identity provider.
    pub id: UserId,
    /// Email address the account was registered with.
    pub email: String,
    /// Provider-defined metadata attached to the account.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Auxiliary user data keyed by identity id.
///
/// Loaded asynchronously after a session appears; may remain absent on
/// load failure without affecting authentication state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Identity this profile belongs to.
    pub id: UserId,
    /// Name shown in the UI.
    pub display_name: String,
    /// Avatar image location, if one was uploaded.
    pub avatar_url: Option<String>,
    /// Access level granted to this user.
    pub level: PermissionLevel,
}

/// Partial profile update forwarded to the provider's `update_user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileChanges {
    /// New display name, if changing.
    pub display_name: Option<String>,
    /// New avatar location, if changing.
    pub avatar_url: Option<String>,
}
