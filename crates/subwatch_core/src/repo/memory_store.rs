//! In-process task store for hosts without a file system.
//!
//! Mirrors the SQLite adapter's semantics exactly, including version
//! assignment and hook firing. `set_available(false)` makes every call
//! fail with `StoreError::Unavailable`, which is how a backend that is not
//! ready yet looks from a surface.
//!
//! Lock order is `tasks` then `referenda`.

use crate::model::referendum::ReferendumStatus;
use crate::model::task::{key_of, AccountRef, SubscriptionTask, TaskKey};
use crate::repo::task_store::{
    check_referendum_limit, fire_transition_hooks, FeedHooks, StoreError, StoreResult,
    TaskStore, UpdateOutcome,
};
use async_trait::async_trait;
use log::warn;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub struct MemoryTaskStore {
    tasks: RwLock<BTreeMap<TaskKey, SubscriptionTask>>,
    referenda: RwLock<BTreeMap<(String, u32), ReferendumStatus>>,
    hooks: Arc<dyn FeedHooks>,
    available: AtomicBool,
    sequence: AtomicU64,
}

impl MemoryTaskStore {
    pub fn new(hooks: Arc<dyn FeedHooks>) -> Self {
        Self {
            tasks: RwLock::new(BTreeMap::new()),
            referenda: RwLock::new(BTreeMap::new()),
            hooks,
            available: AtomicBool::new(true),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    fn allocate_version(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn status_of(&self, chain_id: &str, referendum_id: u32) -> ReferendumStatus {
        self.referenda
            .read()
            .get(&(chain_id.to_string(), referendum_id))
            .copied()
            .unwrap_or_default()
    }

    /// Caller holds the `tasks` write lock.
    fn check_limit(
        &self,
        tasks: &BTreeMap<TaskKey, SubscriptionTask>,
        task: &SubscriptionTask,
    ) -> StoreResult<()> {
        let Some(referendum_id) = task.referendum_id else {
            return Ok(());
        };
        let siblings: Vec<SubscriptionTask> = tasks
            .values()
            .filter(|other| {
                other.chain_id == task.chain_id && other.referendum_id == Some(referendum_id)
            })
            .cloned()
            .collect();
        let status = self.status_of(&task.chain_id, referendum_id);
        check_referendum_limit(task, status, &siblings)
    }

    fn filtered(
        &self,
        predicate: impl Fn(&SubscriptionTask) -> bool,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.ensure_available()?;
        Ok(self
            .tasks
            .read()
            .values()
            .filter(|task| predicate(task))
            .cloned()
            .collect())
    }

    fn remove_matching(
        &self,
        predicate: impl Fn(&SubscriptionTask) -> bool,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.ensure_available()?;
        let removed = {
            let mut tasks = self.tasks.write();
            let keys: Vec<TaskKey> = tasks
                .iter()
                .filter(|(_, task)| predicate(task))
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter()
                .filter_map(|key| tasks.remove(key))
                .collect::<Vec<_>>()
        };
        for task in &removed {
            fire_transition_hooks(self.hooks.as_ref(), Some(task), None);
        }
        Ok(removed)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    fn backend_id(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &TaskKey) -> StoreResult<Option<SubscriptionTask>> {
        self.ensure_available()?;
        Ok(self.tasks.read().get(key).cloned())
    }

    async fn get_all(&self, chain_id: &str) -> StoreResult<Vec<SubscriptionTask>> {
        self.filtered(|task| task.chain_id == chain_id && task.is_chain_scoped())
    }

    async fn get_all_for_account(
        &self,
        account: &AccountRef,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.filtered(|task| {
            task.account
                .as_ref()
                .is_some_and(|owner| owner.same_account(account))
        })
    }

    async fn get_all_for_referenda(
        &self,
        chain_id: &str,
        referendum_id: Option<u32>,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.filtered(|task| {
            task.chain_id == chain_id
                && task.referendum_id.is_some()
                && (referendum_id.is_none() || task.referendum_id == referendum_id)
        })
    }

    async fn get_active_count(&self) -> StoreResult<u64> {
        self.ensure_available()?;
        let count = self
            .tasks
            .read()
            .values()
            .filter(|task| task.is_enabled())
            .count();
        Ok(count as u64)
    }

    async fn get_all_enabled(&self) -> StoreResult<Vec<SubscriptionTask>> {
        self.filtered(SubscriptionTask::is_enabled)
    }

    async fn get_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> StoreResult<ReferendumStatus> {
        self.ensure_available()?;
        Ok(self.status_of(chain_id, referendum_id))
    }

    async fn set_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
        status: ReferendumStatus,
    ) -> StoreResult<()> {
        self.ensure_available()?;
        self.referenda
            .write()
            .insert((chain_id.to_string(), referendum_id), status);
        Ok(())
    }

    async fn insert(&self, task: &SubscriptionTask) -> StoreResult<SubscriptionTask> {
        self.ensure_available()?;
        task.validate()?;
        let key = key_of(task);
        let (previous, stored) = {
            let mut tasks = self.tasks.write();
            self.check_limit(&tasks, task)?;
            let previous = tasks.get(&key).cloned();
            let mut stored = task.clone();
            stored.version = self.allocate_version();
            tasks.insert(key, stored.clone());
            (previous, stored)
        };
        fire_transition_hooks(self.hooks.as_ref(), previous.as_ref(), Some(&stored));
        Ok(stored)
    }

    async fn remove(&self, task: &SubscriptionTask) -> StoreResult<Option<SubscriptionTask>> {
        let key = key_of(task);
        let removed = self.remove_matching(|candidate| key_of(candidate) == key)?;
        Ok(removed.into_iter().next())
    }

    async fn remove_all_for_account(
        &self,
        account: &AccountRef,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.remove_matching(|task| {
            task.account
                .as_ref()
                .is_some_and(|owner| owner.same_account(account))
        })
    }

    async fn remove_all_for_referendum(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> StoreResult<Vec<SubscriptionTask>> {
        self.remove_matching(|task| {
            task.chain_id == chain_id && task.referendum_id == Some(referendum_id)
        })
    }

    async fn update(&self, task: &SubscriptionTask) -> StoreResult<UpdateOutcome> {
        self.ensure_available()?;
        task.validate()?;
        let key = key_of(task);
        let (previous, stored) = {
            let mut tasks = self.tasks.write();
            let Some(previous) = tasks.get(&key).cloned() else {
                warn!(
                    "event=store_update module=repo status=skipped backend=memory reason=unknown_key key={}",
                    key
                );
                return Ok(UpdateOutcome::UnknownKey(key));
            };
            if previous.version != task.version {
                return Err(StoreError::VersionConflict {
                    key,
                    expected: task.version,
                    actual: previous.version,
                });
            }
            self.check_limit(&tasks, task)?;
            let mut stored = task.clone();
            stored.version = self.allocate_version();
            tasks.insert(key, stored.clone());
            (previous, stored)
        };
        fire_transition_hooks(self.hooks.as_ref(), Some(&previous), Some(&stored));
        Ok(UpdateOutcome::Updated(stored))
    }
}
