//! One front-end surface: cache, mutation queue and inbox.
//!
//! # Responsibility
//! - Hydrate the observer cache and keep it patched from the inbox.
//! - Run every mutation as: compute next state, store commit, broadcast.
//! - Recover every `SyncError` at this boundary.
//!
//! # Invariants
//! - Mutations of one surface run one at a time, in arrival order.
//! - The store write is the commit point; nothing is broadcast or cached
//!   for a write the store rejected.
//! - Referendum limits and statuses live in the store, shared by every
//!   surface on it. The surface checks early; the store enforces on write.
//! - `hydrate` failures leave the cache empty and `NotLoaded`, and
//!   mutations that need the cache report `StoreUnavailable` until a
//!   hydrate succeeds.

use crate::cache::observer::{
    ApplyOutcome, CacheSnapshot, LoadState, ObserverCache, ScopeTarget,
};
use crate::model::action::CATEGORY_OPEN_GOV;
use crate::model::defaults::{default_account_tasks, default_chain_tasks};
use crate::model::referendum::ReferendumStatus;
use crate::model::task::{
    key_of, same_task, AccountRef, IntervalSetting, SubscriptionTask, TaskKey, TaskStatus,
};
use crate::repo::task_store::{StoreError, TaskStore, UpdateOutcome};
use crate::rules::cardinality::{addable_actions, check_can_enable};
use crate::rules::grouping::{
    category_toggle_state, group_toggle, os_notify_control_enabled, referendum_toggle,
    referendum_toggle_state,
};
use crate::rules::toggle::{change_cadence, toggle_os_notify, toggle_status};
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::event::{BroadcastEvent, SurfaceId, SurfaceKind};
use crate::sync::oneshot::{run_one_shot, OneShotChecker, ProcessingSet};
use crate::sync::queue::MutationQueue;
use crate::sync::transport::EventTransport;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, Mutex as AsyncMutex};

const DEFAULT_ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-surface tunables.
#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub one_shot_timeout: Duration,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            one_shot_timeout: DEFAULT_ONE_SHOT_TIMEOUT,
        }
    }
}

/// What a mutation did.
#[derive(Debug)]
pub enum MutationOutcome {
    /// Stored values after the commit, already broadcast.
    Committed(Vec<SubscriptionTask>),
    /// Removed values, already broadcast as deletes.
    Removed(Vec<SubscriptionTask>),
    /// Nothing to write: tasks were already in the requested state.
    Unchanged,
    /// Recoverable logic error reported as a no-op.
    Skipped(SyncError),
}

impl MutationOutcome {
    pub fn committed(&self) -> &[SubscriptionTask] {
        match self {
            Self::Committed(tasks) | Self::Removed(tasks) => tasks,
            _ => &[],
        }
    }
}

pub struct Surface {
    id: SurfaceId,
    kind: SurfaceKind,
    store: Arc<dyn TaskStore>,
    transport: Arc<dyn EventTransport>,
    one_shot: Option<Arc<dyn OneShotChecker>>,
    cache: RwLock<ObserverCache>,
    inbox: AsyncMutex<broadcast::Receiver<BroadcastEvent>>,
    queue: MutationQueue,
    online: AtomicBool,
    processing: ProcessingSet,
    options: SurfaceOptions,
}

impl Surface {
    /// Creates a surface and opens its inbox right away, so events emitted
    /// while the first hydrate is in flight are buffered rather than lost.
    pub fn new(
        kind: SurfaceKind,
        targets: Vec<ScopeTarget>,
        store: Arc<dyn TaskStore>,
        transport: Arc<dyn EventTransport>,
        options: SurfaceOptions,
    ) -> Self {
        let inbox = transport.subscribe();
        Self {
            id: SurfaceId::new(),
            kind,
            store,
            transport,
            one_shot: None,
            cache: RwLock::new(ObserverCache::new(targets)),
            inbox: AsyncMutex::new(inbox),
            queue: MutationQueue::new(),
            online: AtomicBool::new(true),
            processing: ProcessingSet::default(),
            options,
        }
    }

    pub fn with_one_shot_checker(mut self, checker: Arc<dyn OneShotChecker>) -> Self {
        self.one_shot = Some(checker);
        self
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Whether the offline indicator should be hidden.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn load_state(&self) -> LoadState {
        self.cache.read().state()
    }

    /// Queue slots released so far, hydrates included.
    pub fn completed_mutations(&self) -> u64 {
        self.queue.completed()
    }

    // ---- cache reads -------------------------------------------------

    pub fn find(&self, key: &TaskKey) -> Option<SubscriptionTask> {
        self.cache.read().find(key).cloned()
    }

    pub fn bucket(&self, bucket: &str) -> Vec<SubscriptionTask> {
        self.cache.read().bucket(bucket).to_vec()
    }

    pub fn chain_tasks(&self, chain_id: &str) -> Vec<SubscriptionTask> {
        self.cache.read().chain_tasks(chain_id).to_vec()
    }

    pub fn account_tasks(&self, account: &AccountRef) -> Vec<SubscriptionTask> {
        self.cache.read().account_tasks(account).to_vec()
    }

    pub fn referendum_tasks(&self, chain_id: &str, referendum_id: u32) -> Vec<SubscriptionTask> {
        self.cache
            .read()
            .referendum_tasks(chain_id, referendum_id)
            .to_vec()
    }

    /// Category switch state for one cached bucket.
    pub fn category_state(&self, bucket: &str, category: &str) -> bool {
        let tasks: Vec<SubscriptionTask> = self
            .bucket(bucket)
            .into_iter()
            .filter(|task| task.category == category)
            .collect();
        category_toggle_state(&tasks)
    }

    /// "All subscriptions of this referendum" switch state.
    pub fn referendum_state(&self, chain_id: &str, referendum_id: u32) -> bool {
        referendum_toggle_state(referendum_id, &self.referendum_tasks(chain_id, referendum_id))
    }

    pub fn is_processing(&self, key: &TaskKey) -> bool {
        self.processing.is_processing(key)
    }

    // ---- lifecycle ---------------------------------------------------

    /// Rebuilds the cache from the store.
    ///
    /// # Errors
    /// - On any store failure the cache is emptied and the error returned;
    ///   `StoreUnavailable` also switches the surface offline.
    pub async fn hydrate(&self) -> SyncResult<()> {
        let _permit = self.queue.acquire().await;
        self.hydrate_locked().await
    }

    async fn hydrate_locked(&self) -> SyncResult<()> {
        let targets = self.cache.read().targets().to_vec();
        let loaded: Result<CacheSnapshot, StoreError> =
            ObserverCache::load(&targets, self.store.as_ref()).await;
        match loaded {
            Ok(snapshot) => {
                self.cache.write().install(snapshot);
                self.online.store(true, Ordering::SeqCst);
                info!(
                    "event=surface_hydrate module=sync status=ok surface={} kind={} targets={}",
                    self.id,
                    self.kind.as_str(),
                    targets.len()
                );
                Ok(())
            }
            Err(err) => {
                self.cache.write().reset();
                Err(self.store_failure("hydrate", err))
            }
        }
    }

    /// Records a connectivity change; the offline->online edge re-hydrates
    /// a cache that is not loaded or may have missed events.
    pub async fn set_online(&self, online: bool) -> SyncResult<()> {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online == online {
            return Ok(());
        }
        info!(
            "event=surface_connectivity module=sync status=ok surface={} online={}",
            self.id, online
        );
        if online && self.load_state() != LoadState::Loaded {
            return self.hydrate().await;
        }
        if !online {
            self.cache.write().mark_stale();
        }
        Ok(())
    }

    /// Applies every event waiting in the inbox without blocking.
    ///
    /// Returns the number of events that changed the cache. A lagged inbox
    /// means events were dropped, so the cache is re-hydrated.
    pub async fn drain_inbox(&self) -> SyncResult<usize> {
        let mut applied = 0;
        let mut lagged = false;
        {
            let mut inbox = self.inbox.lock().await;
            loop {
                match inbox.try_recv() {
                    Ok(event) => {
                        if self.accept(&event) {
                            applied += 1;
                        }
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(
                            "event=surface_inbox module=sync status=lagged surface={} skipped={}",
                            self.id, skipped
                        );
                        lagged = true;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        if lagged {
            self.cache.write().mark_stale();
            self.hydrate().await?;
        }
        Ok(applied)
    }

    /// Applies inbox events as they arrive until the transport closes.
    ///
    /// Use either this or `drain_inbox`, not both.
    pub async fn run_inbox(&self) {
        loop {
            let received = {
                let mut inbox = self.inbox.lock().await;
                inbox.recv().await
            };
            match received {
                Ok(event) => {
                    self.accept(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "event=surface_inbox module=sync status=lagged surface={} skipped={}",
                        self.id, skipped
                    );
                    self.cache.write().mark_stale();
                    if let Err(err) = self.hydrate().await {
                        warn!(
                            "event=surface_inbox module=sync status=error surface={} error_code={} error={}",
                            self.id,
                            err.code(),
                            err
                        );
                    }
                }
                Err(RecvError::Closed) => {
                    info!(
                        "event=surface_inbox module=sync status=closed surface={}",
                        self.id
                    );
                    return;
                }
            }
        }
    }

    fn accept(&self, event: &BroadcastEvent) -> bool {
        if event.origin == self.id {
            return false;
        }
        let outcome = self.cache.write().apply(event);
        debug!(
            "event=surface_apply module=sync status={:?} surface={} key={} op={:?}",
            outcome, self.id, event.key, event.op
        );
        outcome == ApplyOutcome::Applied
    }

    // ---- mutations ---------------------------------------------------

    /// Flips one cached task between enable and disable.
    pub async fn toggle_status(&self, key: &TaskKey) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let Some(current) = self.find(key) else {
            return self.missing_key(key);
        };
        let next = toggle_status(&current);
        self.check_referendum_capacity(std::slice::from_ref(&next))
            .await?;
        self.commit_updates(vec![next]).await
    }

    /// Sets the native notification flag of an enabled task.
    ///
    /// # Errors
    /// - `ControlDisabled` while the task is disabled.
    pub async fn set_os_notify(&self, key: &TaskKey, flag: bool) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let Some(current) = self.find(key) else {
            return self.missing_key(key);
        };
        if !os_notify_control_enabled(&current) {
            return Err(SyncError::ControlDisabled {
                key: key.clone(),
                control: "os_notifications",
            });
        }
        let next = toggle_os_notify(&current, flag);
        if next == current {
            return Ok(MutationOutcome::Unchanged);
        }
        self.commit_updates(vec![next]).await
    }

    /// Changes the cadence of an interval task; unknown cadences are no-ops.
    pub async fn change_cadence(
        &self,
        key: &TaskKey,
        setting: &IntervalSetting,
    ) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let Some(current) = self.find(key) else {
            return self.missing_key(key);
        };
        let next = change_cadence(&current, setting);
        if next == current {
            debug!(
                "event=surface_mutation module=sync status=unchanged surface={} key={} reason=cadence_rejected_or_same",
                self.id, key
            );
            return Ok(MutationOutcome::Unchanged);
        }
        self.commit_updates(vec![next]).await
    }

    /// Category switch over one cached bucket.
    pub async fn group_toggle(
        &self,
        bucket: &str,
        category: &str,
        turn_on: bool,
    ) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let batch = group_toggle(category, turn_on, &self.bucket(bucket));
        if batch.is_empty() {
            return Ok(MutationOutcome::Unchanged);
        }
        self.check_referendum_capacity(&batch).await?;
        self.commit_updates(batch).await
    }

    /// "All subscriptions of this referendum" switch, computed from the store.
    pub async fn referendum_toggle(
        &self,
        chain_id: &str,
        referendum_id: u32,
        turn_on: bool,
    ) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let tasks = self
            .store
            .get_all_for_referenda(chain_id, Some(referendum_id))
            .await
            .map_err(|err| self.store_failure("referendum_toggle", err))?;
        let batch = referendum_toggle(referendum_id, turn_on, &tasks);
        if batch.is_empty() {
            return Ok(MutationOutcome::Unchanged);
        }
        self.check_referendum_capacity(&batch).await?;
        self.commit_updates(batch).await
    }

    /// Inserts (or updates in place) one task.
    pub async fn add_task(&self, task: SubscriptionTask) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        self.add_task_locked(task).await
    }

    /// Enables one interval action for a referendum, within its limit.
    pub async fn subscribe_referendum(
        &self,
        chain_id: &str,
        referendum_id: u32,
        action: &str,
        setting: Option<IntervalSetting>,
    ) -> SyncResult<MutationOutcome> {
        let task = SubscriptionTask::new(chain_id, action, CATEGORY_OPEN_GOV)
            .with_referendum(
                referendum_id,
                setting.unwrap_or_else(IntervalSetting::default_for_referendum),
            )
            .with_status(TaskStatus::Enable);
        let _permit = self.queue.acquire().await;
        self.add_task_locked(task).await
    }

    /// Inserts the disabled default rows an account is missing.
    pub async fn ensure_account_defaults(
        &self,
        account: &AccountRef,
    ) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let existing = self
            .store
            .get_all_for_account(account)
            .await
            .map_err(|err| self.store_failure("ensure_account_defaults", err))?;
        let missing = missing_defaults(default_account_tasks(account), &existing);
        self.insert_all_locked(missing).await
    }

    /// Inserts the disabled default chain rows that are missing.
    pub async fn ensure_chain_defaults(&self, chain_id: &str) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let existing = self
            .store
            .get_all(chain_id)
            .await
            .map_err(|err| self.store_failure("ensure_chain_defaults", err))?;
        let missing = missing_defaults(default_chain_tasks(chain_id), &existing);
        self.insert_all_locked(missing).await
    }

    /// Deletes every task of one referendum.
    pub async fn remove_referendum(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let removed = self
            .store
            .remove_all_for_referendum(chain_id, referendum_id)
            .await
            .map_err(|err| self.store_failure("remove_referendum", err))?;
        self.publish_removals(removed).await
    }

    /// Deletes every task of an account that is being removed.
    pub async fn remove_account(&self, account: &AccountRef) -> SyncResult<MutationOutcome> {
        let _permit = self.queue.acquire().await;
        let removed = self
            .store
            .remove_all_for_account(account)
            .await
            .map_err(|err| self.store_failure("remove_account", err))?;
        self.publish_removals(removed).await
    }

    /// Records a referendum status in the store and returns the actions
    /// that became addable. Nothing is subscribed automatically.
    pub async fn set_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
        status: ReferendumStatus,
    ) -> SyncResult<Vec<&'static str>> {
        let previous = self.referendum_status(chain_id, referendum_id).await?;
        self.store
            .set_referendum_status(chain_id, referendum_id, status)
            .await
            .map_err(|err| self.store_failure("set_referendum_status", err))?;
        let tasks = self
            .store
            .get_all_for_referenda(chain_id, Some(referendum_id))
            .await
            .map_err(|err| self.store_failure("set_referendum_status", err))?;
        let addable = addable_actions(referendum_id, status, &tasks);
        if previous.is_pre_decision() && !status.is_pre_decision() {
            info!(
                "event=referendum_status module=sync status=ok surface={} referendum={} phase={} addable={}",
                self.id,
                referendum_id,
                status,
                addable.len()
            );
        }
        Ok(addable)
    }

    /// Last status recorded by any surface; unknown referenda get the
    /// strictest limit.
    pub async fn referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> SyncResult<ReferendumStatus> {
        self.store
            .get_referendum_status(chain_id, referendum_id)
            .await
            .map_err(|err| self.store_failure("referendum_status", err))
    }

    /// Immediate check-and-notify for a task without persisting anything.
    ///
    /// # Errors
    /// - `OneShotTimeout` when the backend does not answer in time.
    /// - `ControlDisabled` when a one-shot for the task is already running.
    pub async fn one_shot(&self, task: &SubscriptionTask) -> SyncResult<Value> {
        let Some(checker) = self.one_shot.clone() else {
            return Err(SyncError::Unexpected(
                "no one-shot checker configured".to_string(),
            ));
        };
        let key = key_of(task);
        let Some(_processing) = self.processing.begin(key.clone()) else {
            return Err(SyncError::ControlDisabled {
                key,
                control: "one_shot",
            });
        };
        let result = run_one_shot(checker.as_ref(), task, self.options.one_shot_timeout).await;
        if let Err(err) = &result {
            warn!(
                "event=one_shot module=sync status=error surface={} key={} error_code={} error={}",
                self.id,
                key,
                err.code(),
                err
            );
        }
        result
    }

    // ---- internals ---------------------------------------------------

    async fn add_task_locked(&self, task: SubscriptionTask) -> SyncResult<MutationOutcome> {
        task.validate().map_err(SyncError::InvalidTask)?;
        self.check_referendum_capacity(std::slice::from_ref(&task))
            .await?;
        self.insert_all_locked(vec![task]).await
    }

    async fn insert_all_locked(
        &self,
        tasks: Vec<SubscriptionTask>,
    ) -> SyncResult<MutationOutcome> {
        if tasks.is_empty() {
            return Ok(MutationOutcome::Unchanged);
        }
        let mut committed = Vec::with_capacity(tasks.len());
        for task in tasks {
            let stored = match &task.account {
                Some(account) => self.store.insert_for_account(account, &task).await,
                None => self.store.insert(&task).await,
            }
            .map_err(|err| self.store_failure("insert", err))?;
            self.publish(BroadcastEvent::upsert(self.id, stored.clone()))
                .await?;
            committed.push(stored);
        }
        Ok(MutationOutcome::Committed(committed))
    }

    async fn commit_updates(
        &self,
        batch: Vec<SubscriptionTask>,
    ) -> SyncResult<MutationOutcome> {
        let mut committed = Vec::with_capacity(batch.len());
        for next in batch {
            match self.store.update(&next).await {
                Ok(UpdateOutcome::Updated(stored)) => {
                    self.publish(BroadcastEvent::upsert(self.id, stored.clone()))
                        .await?;
                    committed.push(stored);
                }
                Ok(UpdateOutcome::UnknownKey(key)) => {
                    if committed.is_empty() {
                        return Ok(self.unknown_key(&key));
                    }
                    self.unknown_key(&key);
                }
                Err(err) => {
                    let err = self.store_failure("update", err);
                    if let SyncError::VersionConflict { key, .. } = &err {
                        self.refresh_key(key).await;
                    }
                    return Err(err);
                }
            }
        }
        Ok(MutationOutcome::Committed(committed))
    }

    async fn publish_removals(
        &self,
        removed: Vec<SubscriptionTask>,
    ) -> SyncResult<MutationOutcome> {
        for task in &removed {
            self.publish(BroadcastEvent::delete(self.id, task.clone()))
                .await?;
        }
        info!(
            "event=surface_mutation module=sync status=ok surface={} op=delete count={}",
            self.id,
            removed.len()
        );
        Ok(MutationOutcome::Removed(removed))
    }

    /// Applies locally, then hands the event to the transport.
    async fn publish(&self, event: BroadcastEvent) -> SyncResult<()> {
        self.cache.write().apply(&event);
        debug!(
            "event=surface_publish module=sync status=start surface={} key={} op={:?} version={}",
            self.id, event.key, event.op, event.task.version
        );
        self.transport.send(event).await.map_err(|err| {
            error!(
                "event=surface_publish module=sync status=error surface={} error_code=transport_error error={}",
                self.id, err
            );
            SyncError::from(err)
        })
    }

    /// Rejects a batch that would exceed any referendum's limit.
    async fn check_referendum_capacity(&self, batch: &[SubscriptionTask]) -> SyncResult<()> {
        let mut working: BTreeMap<(String, u32), Vec<SubscriptionTask>> = BTreeMap::new();
        for task in batch.iter().filter(|task| task.is_enabled()) {
            let Some(referendum_id) = task.referendum_id else {
                continue;
            };
            let scope = (task.chain_id.clone(), referendum_id);
            if !working.contains_key(&scope) {
                let stored = self
                    .store
                    .get_all_for_referenda(&task.chain_id, Some(referendum_id))
                    .await
                    .map_err(|err| self.store_failure("cardinality_check", err))?;
                working.insert(scope.clone(), stored);
            }
            let status = self.referendum_status(&task.chain_id, referendum_id).await?;
            let tasks = working.entry(scope).or_default();
            if let Err(violation) = check_can_enable(referendum_id, status, tasks, &task.action) {
                warn!(
                    "event=surface_mutation module=sync status=rejected surface={} error_code=cardinality_violation error={}",
                    self.id, violation
                );
                return Err(violation.into());
            }
            tasks.retain(|existing| !same_task(existing, task));
            tasks.push(task.clone());
        }
        Ok(())
    }

    async fn refresh_key(&self, key: &TaskKey) {
        match self.store.get(key).await {
            Ok(Some(task)) => {
                self.cache
                    .write()
                    .apply(&BroadcastEvent::upsert(self.id, task));
            }
            Ok(None) => {}
            Err(err) => {
                self.store_failure("refresh_key", err);
            }
        }
    }

    /// A key the cache does not hold. Without a loaded cache that says
    /// nothing about the store, so it is reported as unavailability.
    fn missing_key(&self, key: &TaskKey) -> SyncResult<MutationOutcome> {
        if self.load_state() == LoadState::NotLoaded {
            warn!(
                "event=surface_mutation module=sync status=rejected surface={} error_code=store_unavailable reason=cache_not_loaded key={}",
                self.id, key
            );
            return Err(SyncError::StoreUnavailable("cache not loaded".to_string()));
        }
        Ok(self.unknown_key(key))
    }

    fn unknown_key(&self, key: &TaskKey) -> MutationOutcome {
        let err = SyncError::UnknownTaskKey(key.clone());
        warn!(
            "event=surface_mutation module=sync status=skipped surface={} error_code={} key={}",
            self.id,
            err.code(),
            key
        );
        MutationOutcome::Skipped(err)
    }

    /// Logs a store failure and applies its surface-level side effects.
    fn store_failure(&self, operation: &'static str, err: StoreError) -> SyncError {
        let err = SyncError::from(err);
        match &err {
            SyncError::StoreUnavailable(_) => {
                if self.online.swap(false, Ordering::SeqCst) {
                    warn!(
                        "event=surface_connectivity module=sync status=offline surface={} operation={}",
                        self.id, operation
                    );
                }
                self.cache.write().mark_stale();
            }
            SyncError::VersionConflict { .. }
            | SyncError::InvalidTask(_)
            | SyncError::CardinalityViolation(_) => {
                warn!(
                    "event=surface_mutation module=sync status=rejected surface={} operation={} error_code={} error={}",
                    self.id,
                    operation,
                    err.code(),
                    err
                );
            }
            _ => {
                error!(
                    "event=surface_mutation module=sync status=error surface={} operation={} error_code={} error={}",
                    self.id,
                    operation,
                    err.code(),
                    err
                );
            }
        }
        err
    }
}

fn missing_defaults(
    defaults: Vec<SubscriptionTask>,
    existing: &[SubscriptionTask],
) -> Vec<SubscriptionTask> {
    defaults
        .into_iter()
        .filter(|task| !existing.iter().any(|stored| same_task(stored, task)))
        .collect()
}
