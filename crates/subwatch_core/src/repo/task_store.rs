//! Task store adapter contract.
//!
//! # Responsibility
//! - Define the durable CRUD contract every host-specific store implements.
//! - Define the feed hooks fired after successful store mutations.
//!
//! # Invariants
//! - Every operation is keyed by the compound task key.
//! - `insert*` upserts: re-adding an existing key updates it in place.
//! - `update` is compare-and-swap on `version` and never creates rows.
//! - Versions come from one store-wide sequence and are never reused, even
//!   after a key is removed and inserted again.
//! - Hooks fire after the commit and only on enable/disable transitions.
//! - A write never leaves a referendum with more enabled actions than its
//!   stored status allows; the check and the write share one critical
//!   section.

use crate::db::DbError;
use crate::model::referendum::ReferendumStatus;
use crate::model::task::{AccountRef, SubscriptionTask, TaskKey, TaskValidationError};
use crate::rules::cardinality::{check_can_enable, CardinalityViolation};
use async_trait::async_trait;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by task store adapters.
#[derive(Debug)]
pub enum StoreError {
    /// Task shape rejected before persistence.
    Validation(TaskValidationError),
    /// Backend is not ready or the store is locked.
    Unavailable(String),
    /// Caller's version does not match the stored version.
    VersionConflict {
        key: TaskKey,
        expected: u64,
        actual: u64,
    },
    /// Enabling the task would exceed its referendum's limit.
    Cardinality(CardinalityViolation),
    /// Non-transient storage engine failure.
    Db(DbError),
    /// Persisted row cannot be converted to a valid task.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Unavailable(reason) => write!(f, "task store unavailable: {reason}"),
            Self::VersionConflict {
                key,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on `{key}`: expected {expected}, stored {actual}"
            ),
            Self::Cardinality(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Cardinality(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::Unavailable(value.to_string())
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Result of a compare-and-swap update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Stored value after the write, with its new version.
    Updated(SubscriptionTask),
    /// No row exists for the key; nothing was written.
    UnknownKey(TaskKey),
}

/// Hooks into the live chain-data feed, fired after a successful commit.
pub trait FeedHooks: Send + Sync {
    fn on_enable(&self, task: &SubscriptionTask);
    fn on_disable(&self, task: &SubscriptionTask);
}

/// Hooks implementation for hosts without a chain client.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFeedHooks;

impl FeedHooks for NoopFeedHooks {
    fn on_enable(&self, _task: &SubscriptionTask) {}
    fn on_disable(&self, _task: &SubscriptionTask) {}
}

/// Durable subscription task store.
///
/// Returned tasks are plain values; callers own their copies.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stable adapter id used in logs and capability negotiation.
    fn backend_id(&self) -> &'static str;

    async fn get(&self, key: &TaskKey) -> StoreResult<Option<SubscriptionTask>>;

    /// Chain-scoped tasks (no account, no referendum) for one chain.
    async fn get_all(&self, chain_id: &str) -> StoreResult<Vec<SubscriptionTask>>;

    async fn get_all_for_account(&self, account: &AccountRef)
        -> StoreResult<Vec<SubscriptionTask>>;

    /// Referendum-scoped tasks for one chain, optionally one referendum.
    async fn get_all_for_referenda(
        &self,
        chain_id: &str,
        referendum_id: Option<u32>,
    ) -> StoreResult<Vec<SubscriptionTask>>;

    /// Number of tasks with `status = enable`.
    async fn get_active_count(&self) -> StoreResult<u64>;

    /// Every enabled task, any scope. Used to seed feeds at startup.
    async fn get_all_enabled(&self) -> StoreResult<Vec<SubscriptionTask>>;

    /// Last recorded status; `Preparing` when none was recorded.
    async fn get_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> StoreResult<ReferendumStatus>;

    /// Records a status. Later writes are checked against it.
    async fn set_referendum_status(
        &self,
        chain_id: &str,
        referendum_id: u32,
        status: ReferendumStatus,
    ) -> StoreResult<()>;

    async fn insert(&self, task: &SubscriptionTask) -> StoreResult<SubscriptionTask>;

    async fn insert_for_account(
        &self,
        account: &AccountRef,
        task: &SubscriptionTask,
    ) -> StoreResult<SubscriptionTask> {
        let scoped = task.clone().with_account(account.clone());
        self.insert(&scoped).await
    }

    /// Removes one task; returns the removed value when the key existed.
    async fn remove(&self, task: &SubscriptionTask) -> StoreResult<Option<SubscriptionTask>>;

    async fn remove_for_account(
        &self,
        account: &AccountRef,
        task: &SubscriptionTask,
    ) -> StoreResult<Option<SubscriptionTask>> {
        let scoped = task.clone().with_account(account.clone());
        self.remove(&scoped).await
    }

    async fn remove_all_for_account(
        &self,
        account: &AccountRef,
    ) -> StoreResult<Vec<SubscriptionTask>>;

    async fn remove_all_for_referendum(
        &self,
        chain_id: &str,
        referendum_id: u32,
    ) -> StoreResult<Vec<SubscriptionTask>>;

    /// Compare-and-swap update of status, cadence or notification flag.
    ///
    /// `task.version` must equal the stored version.
    async fn update(&self, task: &SubscriptionTask) -> StoreResult<UpdateOutcome>;
}

/// Rejects an enabled referendum task the limit has no room for.
///
/// `siblings` are the stored tasks of the same referendum, read in the same
/// critical section as the write that follows.
pub(crate) fn check_referendum_limit(
    task: &SubscriptionTask,
    status: ReferendumStatus,
    siblings: &[SubscriptionTask],
) -> StoreResult<()> {
    match task.referendum_id {
        Some(referendum_id) if task.is_enabled() => {
            check_can_enable(referendum_id, status, siblings, &task.action)
                .map_err(StoreError::Cardinality)
        }
        _ => Ok(()),
    }
}

/// Fires the feed hook matching a committed state transition.
pub(crate) fn fire_transition_hooks(
    hooks: &dyn FeedHooks,
    before: Option<&SubscriptionTask>,
    after: Option<&SubscriptionTask>,
) {
    let was_enabled = before.is_some_and(SubscriptionTask::is_enabled);
    let is_enabled = after.is_some_and(SubscriptionTask::is_enabled);
    match (was_enabled, is_enabled, after, before) {
        (false, true, Some(task), _) => hooks.on_enable(task),
        (true, false, Some(task), _) => hooks.on_disable(task),
        (true, false, None, Some(task)) => hooks.on_disable(task),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::{fire_transition_hooks, FeedHooks};
    use crate::model::task::{SubscriptionTask, TaskStatus};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHooks {
        calls: Mutex<Vec<&'static str>>,
    }

    impl FeedHooks for RecordingHooks {
        fn on_enable(&self, _task: &SubscriptionTask) {
            self.calls.lock().push("enable");
        }

        fn on_disable(&self, _task: &SubscriptionTask) {
            self.calls.lock().push("disable");
        }
    }

    #[test]
    fn hooks_fire_only_on_transitions() {
        let hooks = RecordingHooks::default();
        let off = SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain");
        let on = off.clone().with_status(TaskStatus::Enable);

        fire_transition_hooks(&hooks, None, Some(&off));
        fire_transition_hooks(&hooks, Some(&off), Some(&on));
        fire_transition_hooks(&hooks, Some(&on), Some(&on));
        fire_transition_hooks(&hooks, Some(&on), None);
        fire_transition_hooks(&hooks, Some(&off), None);

        assert_eq!(*hooks.calls.lock(), vec!["enable", "disable"]);
    }
}
