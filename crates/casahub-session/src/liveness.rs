//! Session liveness monitoring.
//!
//! A watchdog with three triggers — a periodic timer, page-visibility
//! transitions, and network reconnects — all funneled through the
//! session store's collapsing [`refresh`]: overlapping triggers join the
//! in-flight attempt instead of queueing another. The checks themselves
//! are synchronous comparisons; only the underlying refresh call carries
//! timeout and error handling. When the session is expired and the
//! refresh fails, the monitor escalates to [`Escalation::hard_reload`]
//! exactly once — local state can no longer be trusted.
//!
//! [`refresh`]: SessionStore::refresh

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use casahub_core::config::liveness::LivenessConfig;

use crate::clock;
use crate::provider::Escalation;
use crate::store::SessionStore;

/// External event feeding the monitor, forwarded by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    /// The tab or window changed visibility.
    VisibilityChanged {
        /// Whether the tab is now visible.
        visible: bool,
    },
    /// The network came back after an interruption.
    ConnectivityRestored,
}

/// Keeps the session alive across backgrounding and network loss.
pub struct LivenessMonitor {
    /// The session store whose session is watched and refreshed.
    store: Arc<SessionStore>,
    /// Last-resort recovery hook.
    escalation: Arc<dyn Escalation>,
    /// Monitor settings.
    config: LivenessConfig,
    /// Broadcast fired after a post-reconnect refresh, telling data
    /// layers to revalidate. The monitor only signals; it never loads.
    revalidate: broadcast::Sender<()>,
    /// Whether the tab is currently visible.
    visible: AtomicBool,
    /// When the last expiry check ran, on the runtime clock.
    last_check: Mutex<Instant>,
    /// Latched once a hard reload has been requested, so the
    /// escalation fires exactly once.
    escalated: AtomicBool,
}

impl std::fmt::Debug for LivenessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessMonitor")
            .field("config", &self.config)
            .finish()
    }
}

impl LivenessMonitor {
    /// Creates a new monitor around the given store.
    pub fn new(
        store: Arc<SessionStore>,
        escalation: Arc<dyn Escalation>,
        config: LivenessConfig,
    ) -> Arc<Self> {
        let (revalidate, _) = broadcast::channel(16);
        Arc::new(Self {
            store,
            escalation,
            config,
            revalidate,
            visible: AtomicBool::new(true),
            last_check: Mutex::new(Instant::now()),
            escalated: AtomicBool::new(false),
        })
    }

    /// Subscribes to the downstream revalidation signal.
    pub fn revalidation_signal(&self) -> broadcast::Receiver<()> {
        self.revalidate.subscribe()
    }

    /// Runs the monitor until the signal channel closes.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::Receiver<LivenessSignal>) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.tick_interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; consume it so the
        // first real check lands one full interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick().await,
                signal = signals.recv() => match signal {
                    Some(LivenessSignal::VisibilityChanged { visible }) => {
                        self.on_visibility(visible).await;
                    }
                    Some(LivenessSignal::ConnectivityRestored) => {
                        self.on_connectivity_restored().await;
                    }
                    None => {
                        debug!("liveness signal channel closed; monitor stopping");
                        break;
                    }
                },
            }
        }
    }

    /// Periodic expiry check.
    async fn on_tick(&self) {
        self.touch();
        let Some(session) = self.store.snapshot().session else {
            return;
        };
        let remaining = clock::seconds_to_expiry(&session, Utc::now());
        if remaining <= 0 {
            warn!(remaining, "session expired; attempting recovery");
            self.refresh_or_escalate().await;
        } else if remaining < self.config.warn_window_seconds as i64 {
            debug!(remaining, "session expiring soon; proactive refresh");
            if let Err(e) = self.store.refresh().await {
                warn!(error = %e, "proactive refresh failed; will retry next tick");
            }
        }
    }

    /// Hidden→visible transition: the timer may have been throttled
    /// while backgrounded, so force a refresh if the last check is
    /// older than the stale window.
    async fn on_visibility(&self, visible: bool) {
        let was_visible = self.visible.swap(visible, Ordering::SeqCst);
        if !visible || was_visible {
            return;
        }
        let stale = {
            let last_check = self.last_check.lock().expect("last_check lock poisoned");
            last_check.elapsed() >= Duration::from_secs(self.config.stale_window_seconds)
        };
        if !stale {
            return;
        }
        info!("tab visible after stale window; forcing refresh");
        self.touch();
        self.refresh_or_escalate().await;
    }

    /// Network restored: best-effort refresh, then tell data layers to
    /// revalidate. Ignored while hidden; the visibility trigger covers
    /// the eventual foregrounding.
    async fn on_connectivity_restored(&self) {
        if !self.visible.load(Ordering::SeqCst) {
            return;
        }
        info!("connectivity restored; refreshing session");
        self.touch();
        if self.store.snapshot().session.is_some() {
            if let Err(e) = self.store.refresh().await {
                warn!(error = %e, "post-reconnect refresh failed");
            }
        }
        let _ = self.revalidate.send(());
    }

    /// Refresh, escalating to a hard reload on failure.
    async fn refresh_or_escalate(&self) {
        if self.escalated.load(Ordering::SeqCst) {
            return;
        }
        if self.store.snapshot().session.is_none() {
            return;
        }
        match self.store.refresh().await {
            Ok(_) => info!("session recovered by refresh"),
            Err(e) => {
                if !self.escalated.swap(true, Ordering::SeqCst) {
                    error!(error = %e, "session unrecoverable; escalating to full reload");
                    self.escalation.hard_reload();
                }
            }
        }
    }

    fn touch(&self) {
        *self.last_check.lock().expect("last_check lock poisoned") = Instant::now();
    }
}
