//! Observer cache keyed by chain, account or referendum bucket.

use crate::model::task::{key_of, same_task, AccountRef, SubscriptionTask, TaskKey};
use crate::repo::task_store::{StoreResult, TaskStore};
use crate::sync::event::{BroadcastEvent, EventOp};
use std::collections::BTreeMap;

/// Deleted keys remembered per cache. Older tombstones collapse into a
/// single version floor.
pub const MAX_TOMBSTONES: usize = 1024;

/// One slice of store state a surface observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeTarget {
    /// Chain-scoped tasks of one chain, bucketed by chain id.
    Chain(String),
    /// Tasks of one account, bucketed by `chain|address`.
    Account(AccountRef),
    /// Referendum tasks of one chain, bucketed per referendum.
    Referenda(String),
}

impl ScopeTarget {
    fn bucket_for(&self, task: &SubscriptionTask) -> Option<String> {
        match self {
            Self::Chain(chain_id) => {
                (task.is_chain_scoped() && &task.chain_id == chain_id).then(|| chain_id.clone())
            }
            Self::Account(account) => task
                .account
                .as_ref()
                .filter(|owner| owner.same_account(account))
                .map(|_| account.scope_key()),
            Self::Referenda(chain_id) => match task.referendum_id {
                Some(id) if &task.chain_id == chain_id => Some(referendum_bucket(chain_id, id)),
                _ => None,
            },
        }
    }

    async fn load(&self, store: &dyn TaskStore) -> StoreResult<Vec<SubscriptionTask>> {
        match self {
            Self::Chain(chain_id) => store.get_all(chain_id).await,
            Self::Account(account) => store.get_all_for_account(account).await,
            Self::Referenda(chain_id) => store.get_all_for_referenda(chain_id, None).await,
        }
    }
}

/// Bucket key for one referendum on one chain.
pub fn referendum_bucket(chain_id: &str, referendum_id: u32) -> String {
    format!("{chain_id}|{referendum_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Never hydrated, or the last hydrate failed.
    NotLoaded,
    Loaded,
    /// Loaded once, but events may have been missed.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Same value already cached.
    Unchanged,
    /// Out of scope, not loaded, or older than what is cached.
    Ignored,
}

/// Snapshot produced by a successful load, installed atomically.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    buckets: BTreeMap<String, Vec<SubscriptionTask>>,
}

/// Non-authoritative mirror of the tasks one surface renders.
#[derive(Debug, Clone)]
pub struct ObserverCache {
    targets: Vec<ScopeTarget>,
    buckets: BTreeMap<String, Vec<SubscriptionTask>>,
    tombstones: BTreeMap<TaskKey, u64>,
    /// Highest version among evicted tombstones. Upserts of uncached keys
    /// at or below it are treated as tombstoned.
    tombstone_floor: u64,
    state: LoadState,
}

impl ObserverCache {
    pub fn new(targets: Vec<ScopeTarget>) -> Self {
        Self {
            targets,
            buckets: BTreeMap::new(),
            tombstones: BTreeMap::new(),
            tombstone_floor: 0,
            state: LoadState::NotLoaded,
        }
    }

    pub fn targets(&self) -> &[ScopeTarget] {
        &self.targets
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state != LoadState::NotLoaded
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Queries the store for every target without touching the cache.
    pub async fn load(
        targets: &[ScopeTarget],
        store: &dyn TaskStore,
    ) -> StoreResult<CacheSnapshot> {
        let mut snapshot = CacheSnapshot::default();
        for target in targets {
            if let ScopeTarget::Chain(chain_id) = target {
                snapshot.buckets.entry(chain_id.clone()).or_default();
            }
            if let ScopeTarget::Account(account) = target {
                snapshot.buckets.entry(account.scope_key()).or_default();
            }
            for task in target.load(store).await? {
                if let Some(bucket) = target.bucket_for(&task) {
                    snapshot.buckets.entry(bucket).or_default().push(task);
                }
            }
        }
        Ok(snapshot)
    }

    /// Replaces the whole cache with a loaded snapshot.
    pub fn install(&mut self, snapshot: CacheSnapshot) {
        self.buckets = snapshot.buckets;
        self.tombstones.clear();
        self.tombstone_floor = 0;
        self.state = LoadState::Loaded;
    }

    /// Drops all content; the surface must render "not yet loaded".
    pub fn reset(&mut self) {
        self.buckets.clear();
        self.tombstones.clear();
        self.tombstone_floor = 0;
        self.state = LoadState::NotLoaded;
    }

    pub fn mark_stale(&mut self) {
        if self.state == LoadState::Loaded {
            self.state = LoadState::Stale;
        }
    }

    /// Loads from the store and installs the result, or resets on failure.
    pub async fn hydrate(&mut self, store: &dyn TaskStore) -> StoreResult<()> {
        match Self::load(&self.targets, store).await {
            Ok(snapshot) => {
                self.install(snapshot);
                Ok(())
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    /// Patches the one bucket an event touches.
    pub fn apply(&mut self, event: &BroadcastEvent) -> ApplyOutcome {
        if !self.is_loaded() {
            return ApplyOutcome::Ignored;
        }
        let Some(bucket) = self.bucket_for(&event.task) else {
            return ApplyOutcome::Ignored;
        };
        let incoming = &event.task;
        if self
            .tombstones
            .get(&event.key)
            .is_some_and(|removed_at| incoming.version <= *removed_at)
            && event.op == EventOp::Upsert
        {
            return ApplyOutcome::Ignored;
        }

        let current = self.buckets.get(&bucket).cloned().unwrap_or_default();
        let cached = current.iter().find(|task| same_task(task, incoming));
        if cached.is_some_and(|cached| cached.version > incoming.version) {
            return ApplyOutcome::Ignored;
        }
        if event.op == EventOp::Upsert
            && cached.is_none()
            && !self.tombstones.contains_key(&event.key)
            && incoming.version <= self.tombstone_floor
        {
            return ApplyOutcome::Ignored;
        }

        let next: Vec<SubscriptionTask> = match event.op {
            EventOp::Upsert => {
                if cached == Some(incoming) {
                    return ApplyOutcome::Unchanged;
                }
                if cached.is_some() {
                    current
                        .iter()
                        .map(|task| {
                            if same_task(task, incoming) {
                                incoming.clone()
                            } else {
                                task.clone()
                            }
                        })
                        .collect()
                } else {
                    current
                        .iter()
                        .cloned()
                        .chain(std::iter::once(incoming.clone()))
                        .collect()
                }
            }
            EventOp::Delete => {
                let removed_at = self.tombstones.entry(event.key.clone()).or_insert(0);
                *removed_at = (*removed_at).max(incoming.version);
                self.prune_tombstones();
                if cached.is_none() {
                    return ApplyOutcome::Unchanged;
                }
                current
                    .iter()
                    .filter(|task| !same_task(task, incoming))
                    .cloned()
                    .collect()
            }
        };
        self.buckets.insert(bucket, next);
        ApplyOutcome::Applied
    }

    fn prune_tombstones(&mut self) {
        while self.tombstones.len() > MAX_TOMBSTONES {
            let Some((key, removed_at)) = self
                .tombstones
                .iter()
                .min_by_key(|(_, removed_at)| **removed_at)
                .map(|(key, removed_at)| (key.clone(), *removed_at))
            else {
                break;
            };
            self.tombstones.remove(&key);
            self.tombstone_floor = self.tombstone_floor.max(removed_at);
        }
    }

    /// Tasks in one bucket (chain id, account scope key or referendum bucket).
    pub fn bucket(&self, bucket: &str) -> &[SubscriptionTask] {
        self.buckets.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn chain_tasks(&self, chain_id: &str) -> &[SubscriptionTask] {
        self.bucket(chain_id)
    }

    pub fn account_tasks(&self, account: &AccountRef) -> &[SubscriptionTask] {
        self.bucket(&account.scope_key())
    }

    pub fn referendum_tasks(&self, chain_id: &str, referendum_id: u32) -> &[SubscriptionTask] {
        self.bucket(&referendum_bucket(chain_id, referendum_id))
    }

    /// Finds one cached task by key across all buckets.
    pub fn find(&self, key: &TaskKey) -> Option<&SubscriptionTask> {
        self.buckets
            .values()
            .flat_map(|tasks| tasks.iter())
            .find(|task| &key_of(task) == key)
    }

    /// Every cached task, bucket by bucket.
    pub fn all_tasks(&self) -> Vec<SubscriptionTask> {
        self.buckets.values().flatten().cloned().collect()
    }

    fn bucket_for(&self, task: &SubscriptionTask) -> Option<String> {
        self.targets
            .iter()
            .find_map(|target| target.bucket_for(task))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApplyOutcome, CacheSnapshot, LoadState, ObserverCache, ScopeTarget, MAX_TOMBSTONES,
    };
    use crate::model::task::{AccountRef, SubscriptionTask, TaskStatus};
    use crate::sync::event::{BroadcastEvent, SurfaceId};

    fn loaded_cache() -> ObserverCache {
        let mut cache = ObserverCache::new(vec![ScopeTarget::Chain("Polkadot".to_string())]);
        cache.install(CacheSnapshot::default());
        cache
    }

    fn versioned(version: u64, status: TaskStatus) -> SubscriptionTask {
        let mut task = SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain")
            .with_status(status);
        task.version = version;
        task
    }

    #[test]
    fn ignores_events_before_hydrate() {
        let mut cache = ObserverCache::new(vec![ScopeTarget::Chain("Polkadot".to_string())]);
        let event = BroadcastEvent::upsert(SurfaceId::new(), versioned(1, TaskStatus::Enable));
        assert_eq!(cache.apply(&event), ApplyOutcome::Ignored);
        assert_eq!(cache.state(), LoadState::NotLoaded);
    }

    #[test]
    fn converges_to_last_value_under_redelivery() {
        let mut cache = loaded_cache();
        let origin = SurfaceId::new();
        let first = BroadcastEvent::upsert(origin, versioned(1, TaskStatus::Enable));
        let second = BroadcastEvent::upsert(origin, versioned(2, TaskStatus::Disable));
        let third = BroadcastEvent::upsert(origin, versioned(3, TaskStatus::Enable));

        assert_eq!(cache.apply(&first), ApplyOutcome::Applied);
        assert_eq!(cache.apply(&second), ApplyOutcome::Applied);
        assert_eq!(cache.apply(&first), ApplyOutcome::Ignored);
        assert_eq!(cache.apply(&third), ApplyOutcome::Applied);
        assert_eq!(cache.apply(&second), ApplyOutcome::Ignored);
        assert_eq!(cache.apply(&third), ApplyOutcome::Unchanged);

        let tasks = cache.chain_tasks("Polkadot");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0], third.task);
    }

    #[test]
    fn delete_tombstone_blocks_resurrection() {
        let mut cache = loaded_cache();
        let origin = SurfaceId::new();
        let upsert = BroadcastEvent::upsert(origin, versioned(4, TaskStatus::Enable));
        let delete = BroadcastEvent::delete(origin, versioned(4, TaskStatus::Enable));

        cache.apply(&upsert);
        assert_eq!(cache.apply(&delete), ApplyOutcome::Applied);
        assert_eq!(cache.apply(&upsert), ApplyOutcome::Ignored);
        assert!(cache.chain_tasks("Polkadot").is_empty());

        let reinserted = BroadcastEvent::upsert(origin, versioned(9, TaskStatus::Disable));
        assert_eq!(cache.apply(&reinserted), ApplyOutcome::Applied);
    }

    #[test]
    fn tombstones_stay_bounded_and_still_block_old_upserts() {
        let mut cache = loaded_cache();
        let origin = SurfaceId::new();
        let deletes = MAX_TOMBSTONES as u64 + 50;
        for version in 1..=deletes {
            let mut task = SubscriptionTask::new(
                "Polkadot",
                format!("subscribe:chain:feed{version}"),
                "Chain",
            );
            task.version = version;
            cache.apply(&BroadcastEvent::delete(origin, task));
        }
        assert_eq!(cache.tombstone_count(), MAX_TOMBSTONES);

        let mut newest = SubscriptionTask::new(
            "Polkadot",
            format!("subscribe:chain:feed{deletes}"),
            "Chain",
        );
        newest.version = deletes - 1;
        assert_eq!(
            cache.apply(&BroadcastEvent::upsert(origin, newest)),
            ApplyOutcome::Ignored
        );

        let mut evicted = SubscriptionTask::new("Polkadot", "subscribe:chain:feed1", "Chain");
        evicted.version = 1;
        assert_eq!(
            cache.apply(&BroadcastEvent::upsert(origin, evicted.clone())),
            ApplyOutcome::Ignored
        );

        evicted.version = deletes + 1;
        assert_eq!(
            cache.apply(&BroadcastEvent::upsert(origin, evicted)),
            ApplyOutcome::Applied
        );
        assert!(cache.tombstone_count() <= MAX_TOMBSTONES);
    }

    #[test]
    fn out_of_scope_events_are_ignored() {
        let mut cache = loaded_cache();
        let account_task = SubscriptionTask::new("Polkadot", "subscribe:account:balance:free", "Balances")
            .with_account(AccountRef::new("Polkadot", "5Fabc"));
        let event = BroadcastEvent::upsert(SurfaceId::new(), account_task);
        assert_eq!(cache.apply(&event), ApplyOutcome::Ignored);
    }

    #[test]
    fn upsert_keeps_position_of_existing_task() {
        let mut cache = loaded_cache();
        let origin = SurfaceId::new();
        let mut other = SubscriptionTask::new("Polkadot", "subscribe:chain:currentBlock", "Chain");
        other.version = 2;
        cache.apply(&BroadcastEvent::upsert(origin, versioned(1, TaskStatus::Disable)));
        cache.apply(&BroadcastEvent::upsert(origin, other));
        cache.apply(&BroadcastEvent::upsert(origin, versioned(3, TaskStatus::Enable)));

        let tasks = cache.chain_tasks("Polkadot");
        assert_eq!(tasks[0].action, "subscribe:chain:timestamp");
        assert!(tasks[0].is_enabled());
    }
}
