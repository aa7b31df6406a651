//! The session store: owner of the single current session.
//!
//! All session, identity, and profile state lives behind one
//! [`tokio::sync::watch`] cell. Consumers subscribe and read; only the
//! store mutates. Concurrency is handled by discarding stale results,
//! not by mutual exclusion: every provider call is an async boundary
//! after which the world may have moved on, so results are applied only
//! when the auth generation they were started under is still current.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, warn};

use casahub_core::config::session::SessionConfig;
use casahub_core::error::{AppError, AuthError};
use casahub_core::result::AppResult;
use casahub_entity::level::PermissionLevel;
use casahub_entity::session::Session;
use casahub_entity::user::{Identity, Profile, ProfileChanges};

use crate::provider::{AuthEvent, AuthProvider, AuthSession, SignOutScope};

/// Read-only view of the store's state, published through a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// The current session, if signed in.
    pub session: Option<Session>,
    /// The authenticated identity, derived 1:1 from the session.
    pub identity: Option<Identity>,
    /// Auxiliary profile data; may be absent even while signed in.
    pub profile: Option<Profile>,
    /// True while `initialize` or a credentialed sign-in/sign-up is
    /// running. Background refreshes never set this.
    pub loading: bool,
    /// True once the one-time bootstrap has completed. Never reset,
    /// not even by sign-out.
    pub initialized: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            session: None,
            identity: None,
            profile: None,
            loading: true,
            initialized: false,
        }
    }
}

/// One-time initialization latch.
///
/// Deliberately distinct from any authenticated flag: `Done` means the
/// bootstrap ran, not that anyone is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    NotStarted,
    InProgress,
    Done,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<AuthSession, AppError>>>;

/// Memo entry for a collapsed refresh attempt.
struct RefreshSlot {
    /// Distinguishes attempts so a finished one only clears its own entry.
    epoch: u64,
    /// Auth generation the attempt was started under. An entry from an
    /// older generation is dead: joining it would let a caller arriving
    /// after a sign-out or re-sign-in apply a superseded session.
    generation: u64,
    /// The in-flight provider call, shared by every concurrent caller.
    fut: RefreshFuture,
}

/// Owner of the current session, identity, and profile.
///
/// Instantiated once at the application root and injected into
/// consumers; there are no ambient globals.
pub struct SessionStore {
    /// The external identity provider.
    provider: Arc<dyn AuthProvider>,
    /// Session store settings.
    config: SessionConfig,
    /// The single mutable cell; consumers subscribe via [`Self::subscribe`].
    state: watch::Sender<SessionSnapshot>,
    /// Tri-state idempotency latch for `initialize`.
    init: Mutex<InitState>,
    /// Wakes initializers parked behind an in-progress bootstrap.
    init_notify: Notify,
    /// The in-flight refresh. There is only one session, so the memo
    /// key is constant; staleness is tracked by auth generation instead.
    refresh_slot: Mutex<Option<RefreshSlot>>,
    /// Distinguishes refresh attempts so a finished one only clears
    /// its own slot entry.
    refresh_epoch: AtomicU64,
    /// Bumped on every session replacement or clear; results started
    /// under an older generation are discarded on arrival. Shared with
    /// spawned profile loads.
    auth_generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionStore {
    /// Creates a new session store around the given provider.
    pub fn new(provider: Arc<dyn AuthProvider>, config: SessionConfig) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Arc::new(Self {
            provider,
            config,
            state,
            init: Mutex::new(InitState::NotStarted),
            init_notify: Notify::new(),
            refresh_slot: Mutex::new(None),
            refresh_epoch: AtomicU64::new(0),
            auth_generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns a clone of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// One-time session bootstrap.
    ///
    /// Idempotent: N concurrent or duplicate calls perform exactly one
    /// underlying `get_session` fetch, and every caller returns only
    /// after the bootstrap has completed. Provider errors degrade to
    /// anonymous rather than failing.
    pub async fn initialize(&self) {
        loop {
            let notified = self.init_notify.notified();
            {
                let mut init = self.init.lock().expect("init latch poisoned");
                match *init {
                    InitState::Done => return,
                    InitState::NotStarted => {
                        *init = InitState::InProgress;
                        break;
                    }
                    InitState::InProgress => {}
                }
            }
            notified.await;
        }

        debug!("bootstrapping session from provider");
        match self.provider.get_session().await {
            Ok(Some(auth)) => {
                info!(user_id = %auth.identity.id, "restored persisted session");
                self.apply_auth(auth);
            }
            Ok(None) => debug!("no persisted session; starting anonymous"),
            Err(e) => warn!(error = %e, "session bootstrap failed; continuing anonymous"),
        }

        self.state.send_modify(|s| {
            s.loading = false;
            s.initialized = true;
        });
        *self.init.lock().expect("init latch poisoned") = InitState::Done;
        self.init_notify.notify_waiters();
    }

    /// Handles a state change pushed by the provider.
    ///
    /// This is the sole point permitted to mutate store state in
    /// reaction to provider events.
    pub fn on_provider_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(auth) | AuthEvent::TokenRefreshed(auth) => self.apply_auth(auth),
            AuthEvent::SignedOut => self.clear_auth(),
        }
    }

    /// Authenticates with email and password.
    ///
    /// Expected failures (bad password, unknown account) come back as
    /// `Err` values; only [`AuthError::Configuration`] is fatal.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.state.send_modify(|s| s.loading = true);
        let result = self.provider.sign_in_with_password(email, password).await;
        match &result {
            Ok(auth) => {
                info!(user_id = %auth.identity.id, "sign-in succeeded");
                self.apply_auth(auth.clone());
            }
            Err(e) if e.is_fatal() => error!(error = %e, "identity provider misconfigured"),
            Err(e) => debug!(error = %e, "sign-in rejected"),
        }
        self.state.send_modify(|s| s.loading = false);
        result
    }

    /// Registers a new account and signs it in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.state.send_modify(|s| s.loading = true);
        let result = self.provider.sign_up(email, password).await;
        match &result {
            Ok(auth) => {
                info!(user_id = %auth.identity.id, "sign-up succeeded");
                self.apply_auth(auth.clone());
            }
            Err(e) if e.is_fatal() => error!(error = %e, "identity provider misconfigured"),
            Err(e) => debug!(error = %e, "sign-up rejected"),
        }
        self.state.send_modify(|s| s.loading = false);
        result
    }

    /// Signs out.
    ///
    /// Local state is authoritative for UI gating, so it is cleared
    /// first; a failing remote call is logged and otherwise ignored.
    pub async fn sign_out(&self) {
        self.clear_auth();
        if let Err(e) = self.provider.sign_out(SignOutScope::Local).await {
            warn!(error = %e, "remote sign-out failed; local state already cleared");
        }
        info!("signed out");
    }

    /// Exchanges the current refresh token for a new session.
    ///
    /// Concurrent calls collapse into one in-flight provider call; every
    /// caller observes the identical resulting session. An attempt
    /// outlived by a sign-out or re-sign-in is never joined by later
    /// callers and its result is discarded on arrival. The provider
    /// does not support cancellation, so the call is bounded by
    /// `refresh_timeout_seconds` instead.
    pub async fn refresh(&self) -> AppResult<AuthSession> {
        let started_generation = self.auth_generation.load(Ordering::SeqCst);

        let (epoch, fut) = {
            let mut slot = self.refresh_slot.lock().expect("refresh slot poisoned");
            match slot.as_ref() {
                Some(entry) if entry.generation == started_generation => {
                    (entry.epoch, entry.fut.clone())
                }
                _ => {
                    let refresh_token = self
                        .state
                        .borrow()
                        .session
                        .as_ref()
                        .map(|s| s.refresh_token.clone())
                        .ok_or_else(|| AppError::session("no current session to refresh"))?;
                    let provider = Arc::clone(&self.provider);
                    let timeout = Duration::from_secs(self.config.refresh_timeout_seconds);
                    let epoch = self.refresh_epoch.fetch_add(1, Ordering::SeqCst) + 1;
                    let fut: RefreshFuture = async move {
                        match tokio::time::timeout(timeout, provider.refresh_session(&refresh_token))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(AppError::timeout("token refresh timed out")),
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(RefreshSlot {
                        epoch,
                        generation: started_generation,
                        fut: fut.clone(),
                    });
                    (epoch, fut)
                }
            }
        };

        let result = fut.await;

        {
            let mut slot = self.refresh_slot.lock().expect("refresh slot poisoned");
            if matches!(slot.as_ref(), Some(entry) if entry.epoch == epoch) {
                *slot = None;
            }
        }

        match result {
            Ok(auth) => {
                if self.auth_generation.load(Ordering::SeqCst) == started_generation {
                    self.apply_auth(auth.clone());
                } else {
                    debug!("discarding refresh result superseded by a newer auth transition");
                }
                Ok(auth)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                Err(e)
            }
        }
    }

    /// Checks the current profile's level against a requirement.
    ///
    /// True iff there is no requirement, or the signed-in profile's
    /// level is at least the required one. Pure comparison; no I/O.
    pub fn has_permission(&self, required: Option<PermissionLevel>) -> bool {
        let Some(required) = required else { return true };
        self.state
            .borrow()
            .profile
            .as_ref()
            .is_some_and(|p| p.level.has_at_least(&required))
    }

    /// Applies a partial profile update through the provider.
    ///
    /// The caller gets the stored profile back either way, but it is
    /// only written into the snapshot while the identity it belongs to
    /// is still signed in.
    pub async fn update_profile(&self, changes: &ProfileChanges) -> AppResult<Profile> {
        let started_generation = self.auth_generation.load(Ordering::SeqCst);
        let user_id = self
            .state
            .borrow()
            .identity
            .as_ref()
            .map(|i| i.id)
            .ok_or_else(|| AppError::authentication("not signed in"))?;
        let profile = self.provider.update_user(user_id, changes).await?;
        if self.auth_generation.load(Ordering::SeqCst) == started_generation {
            self.state.send_modify(|s| s.profile = Some(profile.clone()));
        } else {
            debug!(user_id = %user_id, "discarding profile update superseded by a newer auth transition");
        }
        Ok(profile)
    }

    /// Replaces session and identity atomically and schedules a profile
    /// reload. A no-op when the identical session is already current, so
    /// collapsed refresh callers do not re-trigger profile loads.
    fn apply_auth(&self, auth: AuthSession) {
        {
            let current = self.state.borrow();
            if current.session.as_ref() == Some(&auth.session) {
                return;
            }
        }
        let generation = self.auth_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let user_id = auth.identity.id;
        self.state.send_modify(|s| {
            s.session = Some(auth.session);
            s.identity = Some(auth.identity);
        });
        self.spawn_profile_load(user_id, generation);
    }

    /// Clears session, identity, and profile. `initialized` is left
    /// untouched: it records that boot ran, not that anyone is signed in.
    fn clear_auth(&self) {
        self.auth_generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.session = None;
            s.identity = None;
            s.profile = None;
        });
    }

    /// Loads the profile in the background. Failures are non-fatal and
    /// results from a superseded auth generation are discarded.
    fn spawn_profile_load(&self, user_id: casahub_core::types::UserId, generation: u64) {
        let provider = Arc::clone(&self.provider);
        let state = self.state.clone();
        let auth_generation = Arc::clone(&self.auth_generation);
        tokio::spawn(async move {
            match provider.fetch_profile(user_id).await {
                Ok(profile) => {
                    if auth_generation.load(Ordering::SeqCst) != generation {
                        debug!(user_id = %user_id, "discarding stale profile load");
                        return;
                    }
                    state.send_modify(|s| s.profile = Some(profile));
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "profile load failed; profile unavailable");
                }
            }
        });
    }
}
