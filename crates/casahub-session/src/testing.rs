//! Scriptable provider mocks shared by the store and liveness tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Semaphore;

use casahub_core::error::{AppError, AuthError};
use casahub_core::result::AppResult;
use casahub_core::types::UserId;
use casahub_entity::level::PermissionLevel;
use casahub_entity::session::Session;
use casahub_entity::user::{Identity, Profile, ProfileChanges};

use crate::provider::{AuthProvider, AuthSession, Escalation, SignOutScope};

/// Builds a session for the given identity expiring in `expires_in_secs`.
pub(crate) fn auth_session_for(user_id: UserId, expires_in_secs: i64) -> AuthSession {
    AuthSession {
        session: Session {
            access_token: format!("access-{}", UserId::new()),
            refresh_token: "refresh-token".into(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            user_id,
        },
        identity: Identity {
            id: user_id,
            email: "host@example.com".into(),
            metadata: serde_json::Value::Null,
        },
    }
}

/// Builds a session for a fresh identity expiring in `expires_in_secs`.
pub(crate) fn auth_session(expires_in_secs: i64) -> AuthSession {
    auth_session_for(UserId::new(), expires_in_secs)
}

/// Builds a profile for the given identity at the given level.
pub(crate) fn profile_for(user_id: UserId, level: PermissionLevel) -> Profile {
    Profile {
        id: user_id,
        display_name: "Sam Host".into(),
        avatar_url: None,
        level,
    }
}

/// Scriptable [`AuthProvider`].
///
/// Each method returns a clone of its scripted result and counts its
/// calls. A method with a gate parks on the semaphore before returning,
/// letting tests hold a call in flight and control resolution order.
pub(crate) struct MockAuthProvider {
    pub bootstrap: Mutex<AppResult<Option<AuthSession>>>,
    pub sign_in_result: Mutex<Result<AuthSession, AuthError>>,
    pub sign_up_result: Mutex<Result<AuthSession, AuthError>>,
    pub refresh_result: Mutex<AppResult<AuthSession>>,
    pub profile_result: Mutex<AppResult<Profile>>,
    pub update_result: Mutex<AppResult<Profile>>,
    pub sign_out_result: Mutex<AppResult<()>>,
    pub get_session_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    get_session_gate: Option<Arc<Semaphore>>,
    refresh_gate: Option<Arc<Semaphore>>,
    profile_gate: Option<Arc<Semaphore>>,
    update_gate: Option<Arc<Semaphore>>,
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self {
            bootstrap: Mutex::new(Ok(None)),
            sign_in_result: Mutex::new(Err(AuthError::InvalidCredentials)),
            sign_up_result: Mutex::new(Err(AuthError::EmailTaken)),
            refresh_result: Mutex::new(Err(AppError::provider("refresh not scripted"))),
            profile_result: Mutex::new(Err(AppError::provider("profile not scripted"))),
            update_result: Mutex::new(Err(AppError::provider("update not scripted"))),
            sign_out_result: Mutex::new(Ok(())),
            get_session_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            get_session_gate: None,
            refresh_gate: None,
            profile_gate: None,
            update_gate: None,
        }
    }
}

impl MockAuthProvider {
    pub fn with_get_session_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.get_session_gate = Some(gate);
        self
    }

    pub fn with_refresh_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    pub fn with_profile_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.profile_gate = Some(gate);
        self
    }

    pub fn with_update_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.update_gate = Some(gate);
        self
    }
}

async fn park(gate: &Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        gate.acquire().await.expect("gate closed").forget();
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn get_session(&self) -> AppResult<Option<AuthSession>> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        park(&self.get_session_gate).await;
        self.bootstrap.lock().unwrap().clone()
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.sign_in_result.lock().unwrap().clone()
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<AuthSession, AuthError> {
        self.sign_up_result.lock().unwrap().clone()
    }

    async fn refresh_session(&self, _refresh_token: &str) -> AppResult<AuthSession> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        park(&self.refresh_gate).await;
        self.refresh_result.lock().unwrap().clone()
    }

    async fn sign_out(&self, _scope: SignOutScope) -> AppResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_out_result.lock().unwrap().clone()
    }

    async fn update_user(&self, _user_id: UserId, _changes: &ProfileChanges) -> AppResult<Profile> {
        park(&self.update_gate).await;
        self.update_result.lock().unwrap().clone()
    }

    async fn fetch_profile(&self, _user_id: UserId) -> AppResult<Profile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        park(&self.profile_gate).await;
        self.profile_result.lock().unwrap().clone()
    }
}

/// Counts hard reloads instead of performing them.
#[derive(Default)]
pub(crate) struct MockEscalation {
    pub reloads: AtomicUsize,
}

impl Escalation for MockEscalation {
    fn hard_reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}
