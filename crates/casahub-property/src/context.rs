//! The owned-property context.
//!
//! Owns the list of properties belonging to the signed-in identity and
//! the single active selection. Loads are keyed by owner id: a request
//! for a key already in flight coalesces into it, a request for the last
//! successfully completed key is a cache-of-one no-op, and anything else
//! starts a fresh load that supersedes whatever was running. The list is
//! always replaced wholesale; no reader ever observes a partial update.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use casahub_core::result::AppResult;
use casahub_core::types::UserId;
use casahub_entity::property::{NewProperty, Property};

use crate::guard::OperationSlot;
use crate::repository::PropertyRepository;

/// Read-only view of the context's state, published through a watch
/// channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySnapshot {
    /// The active selection, if any.
    pub current: Option<Property>,
    /// Properties owned by the last loaded identity, newest-first.
    pub owned: Vec<Property>,
    /// True while a load is in flight.
    pub loading: bool,
    /// Message from the most recent failed load, if any.
    pub error: Option<String>,
    /// True once any load has completed, successfully or not.
    pub has_initialized: bool,
}

/// Load bookkeeping.
///
/// Started and completed keys are tracked separately so a rapid owner
/// change starts a new load while the superseded one's result is
/// discarded on arrival.
#[derive(Debug, Default)]
struct LoadKeys {
    /// Owner of the most recently started load.
    started: Option<UserId>,
    /// Owner of the last load that completed successfully.
    completed: Option<UserId>,
    /// Whether a load is currently in flight.
    in_flight: bool,
}

/// Owner of the owned-property set and the active selection.
pub struct PropertyContext {
    /// The backend property table.
    repo: Arc<dyn PropertyRepository>,
    /// The single mutable cell; consumers subscribe via [`Self::subscribe`].
    state: watch::Sender<PropertySnapshot>,
    /// Supersession slot for loads; there is one logical key at a time.
    slot: OperationSlot,
    /// Coalescing and cache-of-one bookkeeping.
    keys: Mutex<LoadKeys>,
}

impl std::fmt::Debug for PropertyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyContext").finish()
    }
}

impl PropertyContext {
    /// Creates a new context around the given repository.
    pub fn new(repo: Arc<dyn PropertyRepository>) -> Arc<Self> {
        let (state, _) = watch::channel(PropertySnapshot::default());
        Arc::new(Self {
            repo,
            state,
            slot: OperationSlot::new(),
            keys: Mutex::new(LoadKeys::default()),
        })
    }

    /// Returns a clone of the current state.
    pub fn snapshot(&self) -> PropertySnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<PropertySnapshot> {
        self.state.subscribe()
    }

    /// Loads the properties owned by `owner_id`.
    ///
    /// No-op when a load for the same key is already in flight, or when
    /// the key matches the last successfully completed load.
    pub async fn load_owned(&self, owner_id: UserId) -> AppResult<()> {
        self.load_owned_inner(owner_id, false).await
    }

    /// Sets the active selection explicitly. Never triggers a reload.
    pub fn set_active(&self, property: Option<Property>) {
        self.state.send_modify(|s| s.current = property);
    }

    /// Creates a property, then reloads the owner's list unconditionally.
    pub async fn create(&self, property: &NewProperty) -> AppResult<Property> {
        let created = self.repo.insert(property).await?;
        info!(property_id = %created.id, "property created; reloading owned set");
        if let Err(e) = self.load_owned_inner(property.owner_id, true).await {
            warn!(error = %e, "post-create reload failed");
        }
        Ok(created)
    }

    /// Updates a property, then reloads the owner's list unconditionally.
    pub async fn update(&self, property: &Property) -> AppResult<Property> {
        let updated = self.repo.update(property).await?;
        info!(property_id = %updated.id, "property updated; reloading owned set");
        if let Err(e) = self.load_owned_inner(property.owner_id, true).await {
            warn!(error = %e, "post-update reload failed");
        }
        Ok(updated)
    }

    /// Deletes a property, then reloads the owner's list unconditionally.
    ///
    /// If the deleted property was the active selection, the reload
    /// clears it and auto-select picks the first remaining record.
    pub async fn delete(&self, property: &Property) -> AppResult<()> {
        self.repo.delete(property.id).await?;
        info!(property_id = %property.id, "property deleted; reloading owned set");
        if let Err(e) = self.load_owned_inner(property.owner_id, true).await {
            warn!(error = %e, "post-delete reload failed");
        }
        Ok(())
    }

    /// Drops all state immediately (the owner signed out).
    ///
    /// Does not wait for any in-flight load; its result is invalidated
    /// and will be discarded on arrival.
    pub fn clear(&self) {
        {
            let mut keys = self.keys.lock().expect("load keys lock poisoned");
            keys.started = None;
            keys.completed = None;
            keys.in_flight = false;
        }
        self.slot.invalidate();
        self.state.send_modify(|s| {
            s.owned.clear();
            s.current = None;
            s.loading = false;
            s.error = None;
        });
        debug!("property context cleared");
    }

    async fn load_owned_inner(&self, owner_id: UserId, force: bool) -> AppResult<()> {
        let (generation, token) = {
            let mut keys = self.keys.lock().expect("load keys lock poisoned");
            if !force {
                if keys.in_flight && keys.started == Some(owner_id) {
                    debug!(owner_id = %owner_id, "load already in flight; coalescing");
                    return Ok(());
                }
                if !keys.in_flight && keys.completed == Some(owner_id) {
                    debug!(owner_id = %owner_id, "owner unchanged since last load; skipping");
                    return Ok(());
                }
            }
            keys.started = Some(owner_id);
            keys.in_flight = true;
            self.slot.begin()
        };

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(owner_id = %owner_id, generation = %generation, "owned-property load cancelled");
                return Ok(());
            }
            result = self.repo.list_by_owner(owner_id) => result,
        };

        if !self.slot.is_current(generation) {
            debug!(owner_id = %owner_id, generation = %generation, "discarding superseded load result");
            return Ok(());
        }

        match result {
            Ok(owned) => {
                {
                    let mut keys = self.keys.lock().expect("load keys lock poisoned");
                    keys.completed = Some(owner_id);
                    keys.in_flight = false;
                }
                self.state.send_modify(|s| {
                    s.owned = owned;
                    s.loading = false;
                    s.has_initialized = true;
                    // Wholesale replacement may have removed the active
                    // record; auto-select fires only when nothing is
                    // active, so later refreshes never move the selection.
                    if let Some(current) = &s.current {
                        if !s.owned.iter().any(|p| p.id == current.id) {
                            s.current = None;
                        }
                    }
                    if s.current.is_none() {
                        s.current = s.owned.first().cloned();
                    }
                });
                Ok(())
            }
            Err(e) => {
                {
                    let mut keys = self.keys.lock().expect("load keys lock poisoned");
                    keys.completed = None;
                    keys.in_flight = false;
                }
                warn!(owner_id = %owner_id, error = %e, "owned-property load failed");
                self.state.send_modify(|s| {
                    s.owned.clear();
                    s.current = None;
                    s.loading = false;
                    s.has_initialized = true;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::Semaphore;

    use casahub_core::error::AppError;
    use casahub_core::types::PropertyId;

    use super::*;

    fn prop(owner_id: UserId, name: &str, created_days_ago: i64) -> Property {
        Property {
            id: PropertyId::new(),
            name: name.into(),
            owner_id,
            address: None,
            created_at: Utc::now() - Duration::days(created_days_ago),
        }
    }

    /// Runs other ready tasks on the current-thread runtime until they
    /// park, so spawned loads reach their next await point.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[derive(Default)]
    struct MockRepo {
        lists: Mutex<HashMap<UserId, AppResult<Vec<Property>>>>,
        gates: Mutex<HashMap<UserId, Arc<Semaphore>>>,
        list_calls: AtomicUsize,
    }

    impl MockRepo {
        fn script_list(&self, owner_id: UserId, result: AppResult<Vec<Property>>) {
            self.lists.lock().unwrap().insert(owner_id, result);
        }

        fn gate(&self, owner_id: UserId) -> Arc<Semaphore> {
            let gate = Arc::new(Semaphore::new(0));
            self.gates.lock().unwrap().insert(owner_id, gate.clone());
            gate
        }
    }

    #[async_trait]
    impl PropertyRepository for MockRepo {
        async fn list_by_owner(&self, owner_id: UserId) -> AppResult<Vec<Property>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().get(&owner_id).cloned();
            if let Some(gate) = gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            self.lists
                .lock()
                .unwrap()
                .get(&owner_id)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn insert(&self, property: &NewProperty) -> AppResult<Property> {
            Ok(Property {
                id: PropertyId::new(),
                name: property.name.clone(),
                owner_id: property.owner_id,
                address: property.address.clone(),
                created_at: Utc::now(),
            })
        }

        async fn update(&self, property: &Property) -> AppResult<Property> {
            Ok(property.clone())
        }

        async fn delete(&self, _id: PropertyId) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_loads_for_same_owner_coalesce() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let gate = repo.gate(owner);
        repo.script_list(owner, Ok(vec![prop(owner, "Casa Sol", 1)]));
        let context = PropertyContext::new(repo.clone());

        let c1 = Arc::clone(&context);
        let t1 = tokio::spawn(async move { c1.load_owned(owner).await });
        let c2 = Arc::clone(&context);
        let t2 = tokio::spawn(async move { c2.load_owned(owner).await });
        settle().await;
        gate.add_permits(2);
        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();

        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.snapshot().owned.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_of_one_skips_repeat_load() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        repo.script_list(owner, Ok(vec![prop(owner, "Casa Sol", 1)]));
        let context = PropertyContext::new(repo.clone());

        context.load_owned(owner).await.unwrap();
        context.load_owned(owner).await.unwrap();

        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_result_never_overwrites_newer_load() {
        let repo = Arc::new(MockRepo::default());
        let owner_a = UserId::new();
        let owner_b = UserId::new();
        let gate_a = repo.gate(owner_a);
        repo.script_list(owner_a, Ok(vec![prop(owner_a, "Casa A", 1)]));
        repo.script_list(owner_b, Ok(vec![prop(owner_b, "Casa B", 1)]));
        let context = PropertyContext::new(repo.clone());

        let c1 = Arc::clone(&context);
        let t1 = tokio::spawn(async move { c1.load_owned(owner_a).await });
        settle().await;
        // B starts before A resolves and supersedes it.
        context.load_owned(owner_b).await.unwrap();
        // A resolves after B completed.
        gate_a.add_permits(1);
        t1.await.unwrap().unwrap();
        settle().await;

        let snapshot = context.snapshot();
        assert_eq!(snapshot.owned.len(), 1);
        assert_eq!(snapshot.owned[0].owner_id, owner_b);
        assert_eq!(snapshot.current.as_ref().map(|p| p.owner_id), Some(owner_b));
    }

    #[tokio::test]
    async fn test_auto_select_fires_once() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let p1 = prop(owner, "Casa Nueva", 1);
        let p2 = prop(owner, "Casa Vieja", 30);
        repo.script_list(owner, Ok(vec![p1.clone(), p2.clone()]));
        let context = PropertyContext::new(repo.clone());

        context.load_owned(owner).await.unwrap();
        assert_eq!(context.snapshot().current, Some(p1.clone()));

        // A newer record appears after a create; the selection stays put.
        let p3 = prop(owner, "Casa Recién", 0);
        repo.script_list(owner, Ok(vec![p3, p1.clone(), p2]));
        context
            .create(&NewProperty {
                name: "Casa Recién".into(),
                owner_id: owner,
                address: None,
            })
            .await
            .unwrap();
        assert_eq!(context.snapshot().current, Some(p1));
        assert_eq!(context.snapshot().owned.len(), 3);
    }

    #[tokio::test]
    async fn test_newest_first_load_selects_newest() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let prop_b = prop(owner, "PropB", 30);
        let prop_a = prop(owner, "PropA", 60);
        // Newest-first ordering from the backend.
        repo.script_list(owner, Ok(vec![prop_b.clone(), prop_a]));
        let context = PropertyContext::new(repo);

        context.load_owned(owner).await.unwrap();
        assert_eq!(context.snapshot().current, Some(prop_b));
    }

    #[tokio::test]
    async fn test_delete_active_clears_and_reselects() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let p1 = prop(owner, "Casa Sol", 1);
        let p2 = prop(owner, "Casa Luna", 2);
        repo.script_list(owner, Ok(vec![p1.clone(), p2.clone()]));
        let context = PropertyContext::new(repo.clone());

        context.load_owned(owner).await.unwrap();
        assert_eq!(context.snapshot().current, Some(p1.clone()));

        repo.script_list(owner, Ok(vec![p2.clone()]));
        context.delete(&p1).await.unwrap();

        let snapshot = context.snapshot();
        assert_eq!(snapshot.current, Some(p2));
        assert_eq!(snapshot.owned.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_last_property_leaves_no_selection() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let p1 = prop(owner, "Casa Sol", 1);
        repo.script_list(owner, Ok(vec![p1.clone()]));
        let context = PropertyContext::new(repo.clone());

        context.load_owned(owner).await.unwrap();
        repo.script_list(owner, Ok(Vec::new()));
        context.delete(&p1).await.unwrap();

        let snapshot = context.snapshot();
        assert_eq!(snapshot.current, None);
        assert!(snapshot.owned.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_force_reload_past_cache_of_one() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        repo.script_list(owner, Ok(vec![prop(owner, "Casa Sol", 1)]));
        let context = PropertyContext::new(repo.clone());

        context.load_owned(owner).await.unwrap();
        context
            .create(&NewProperty {
                name: "Casa Luna".into(),
                owner_id: owner,
                address: None,
            })
            .await
            .unwrap();

        // One initial load plus one forced post-create reload.
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_active_never_reloads() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let p1 = prop(owner, "Casa Sol", 1);
        let p2 = prop(owner, "Casa Luna", 2);
        repo.script_list(owner, Ok(vec![p1, p2.clone()]));
        let context = PropertyContext::new(repo.clone());

        context.load_owned(owner).await.unwrap();
        context.set_active(Some(p2.clone()));

        assert_eq!(context.snapshot().current, Some(p2));
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_drops_state_without_waiting_for_load() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        let gate = repo.gate(owner);
        repo.script_list(owner, Ok(vec![prop(owner, "Casa Sol", 1)]));
        let context = PropertyContext::new(repo.clone());

        let c1 = Arc::clone(&context);
        let task = tokio::spawn(async move { c1.load_owned(owner).await });
        settle().await;

        context.clear();
        let snapshot = context.snapshot();
        assert!(snapshot.owned.is_empty());
        assert_eq!(snapshot.current, None);
        assert!(!snapshot.loading);

        // The invalidated load resolves afterwards and must not apply.
        gate.add_permits(1);
        task.await.unwrap().unwrap();
        settle().await;
        assert!(context.snapshot().owned.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_degrades_and_allows_retry() {
        let repo = Arc::new(MockRepo::default());
        let owner = UserId::new();
        repo.script_list(owner, Err(AppError::provider("table unavailable")));
        let context = PropertyContext::new(repo.clone());

        let err = context.load_owned(owner).await.unwrap_err();
        let snapshot = context.snapshot();
        assert!(snapshot.owned.is_empty());
        assert!(snapshot.has_initialized);
        assert_eq!(snapshot.error, Some(err.to_string()));

        // A failed load does not count as completed; the retry runs.
        let p1 = prop(owner, "Casa Sol", 1);
        repo.script_list(owner, Ok(vec![p1.clone()]));
        context.load_owned(owner).await.unwrap();
        assert_eq!(context.snapshot().current, Some(p1));
        assert_eq!(context.snapshot().error, None);
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }
}
