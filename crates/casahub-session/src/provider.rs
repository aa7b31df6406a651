//! Identity provider seam.
//!
//! The backend that actually issues sessions is out of scope; this module
//! defines the traits it must implement and the event type it pushes into
//! the session store. [`SessionStore::on_provider_event`] is the sole
//! point permitted to mutate store state in reaction to provider events.
//!
//! [`SessionStore::on_provider_event`]: crate::store::SessionStore::on_provider_event

use async_trait::async_trait;

use casahub_core::error::AuthError;
use casahub_core::result::AppResult;
use casahub_core::types::UserId;
use casahub_entity::session::Session;
use casahub_entity::user::{Identity, Profile, ProfileChanges};

/// A session together with the identity the provider derived it for.
///
/// The identity is carried alongside the session so the store can replace
/// both atomically; it is never loaded in a separate round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    /// The credential bundle.
    pub session: Session,
    /// The identity authenticated by the session.
    pub identity: Identity,
}

/// Authentication state change pushed by the provider.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// The user signed in; carries the new session.
    SignedIn(AuthSession),
    /// The provider rotated the tokens; carries the replacement session.
    TokenRefreshed(AuthSession),
    /// The session ended (sign-out or revocation).
    SignedOut,
}

/// Scope of a sign-out request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    /// End only the current session.
    Local,
    /// End every session for this identity.
    Global,
}

/// Interface to the external identity/storage provider.
///
/// Every method is an async boundary after which arbitrary delay and
/// arbitrary completion reordering relative to newer calls must be
/// assumed. The provider does not support cancellation; callers bound
/// hung calls with timeouts instead.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Fetch the persisted session, if any (startup bootstrap).
    async fn get_session(&self) -> AppResult<Option<AuthSession>>;

    /// Authenticate with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Register a new account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> AppResult<AuthSession>;

    /// End the session with the given scope.
    async fn sign_out(&self, scope: SignOutScope) -> AppResult<()>;

    /// Apply a partial profile update and return the stored profile.
    async fn update_user(&self, user_id: UserId, changes: &ProfileChanges) -> AppResult<Profile>;

    /// Fetch the profile associated with an identity.
    async fn fetch_profile(&self, user_id: UserId) -> AppResult<Profile>;
}

/// Last-resort recovery hook.
///
/// Invoked by the liveness monitor when the session has expired and a
/// refresh failed: local state can no longer be trusted, so the host
/// application must tear everything down and start over (in a browser
/// shell this is a hard page reload).
pub trait Escalation: Send + Sync + 'static {
    /// Discard all local state and restart the application.
    fn hard_reload(&self);
}
