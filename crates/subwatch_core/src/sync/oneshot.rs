//! One-shot check-and-notify requests.
//!
//! A one-shot never creates or modifies a persisted task. It is bounded by
//! a timeout and is never retried automatically.

use crate::model::task::{SubscriptionTask, TaskKey};
use crate::sync::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Backend entry point that runs one immediate check for a task.
#[async_trait]
pub trait OneShotChecker: Send + Sync {
    async fn check_once(&self, task: &SubscriptionTask) -> Result<Value, String>;
}

/// Keys with a one-shot in flight; drives the "processing" UI flag.
#[derive(Debug, Default)]
pub struct ProcessingSet {
    keys: Mutex<BTreeSet<TaskKey>>,
}

impl ProcessingSet {
    pub fn is_processing(&self, key: &TaskKey) -> bool {
        self.keys.lock().contains(key)
    }

    /// Marks `key` as processing until the guard drops.
    ///
    /// Returns `None` when a one-shot for the key is already running.
    pub fn begin(&self, key: TaskKey) -> Option<ProcessingGuard<'_>> {
        let inserted = self.keys.lock().insert(key.clone());
        inserted.then_some(ProcessingGuard { set: self, key })
    }
}

/// Clears the processing flag on drop, whatever the outcome.
pub struct ProcessingGuard<'a> {
    set: &'a ProcessingSet,
    key: TaskKey,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.set.keys.lock().remove(&self.key);
    }
}

/// Runs one check bounded by `timeout`.
pub async fn run_one_shot(
    checker: &dyn OneShotChecker,
    task: &SubscriptionTask,
    timeout: Duration,
) -> SyncResult<Value> {
    match tokio::time::timeout(timeout, checker.check_once(task)).await {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(reason)) => Err(SyncError::Unexpected(reason)),
        Err(_) => Err(SyncError::OneShotTimeout {
            key: task.key(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{run_one_shot, OneShotChecker, ProcessingSet};
    use crate::model::task::SubscriptionTask;
    use crate::sync::error::SyncError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct SlowChecker(Duration);

    #[async_trait]
    impl OneShotChecker for SlowChecker {
        async fn check_once(&self, _task: &SubscriptionTask) -> Result<Value, String> {
            tokio::time::sleep(self.0).await;
            Ok(json!({"ok": true}))
        }
    }

    fn task() -> SubscriptionTask {
        SubscriptionTask::new("Polkadot", "subscribe:chain:currentBlock", "Chain")
    }

    #[tokio::test(start_paused = true)]
    async fn slow_checker_times_out() {
        let checker = SlowChecker(Duration::from_secs(30));
        let err = run_one_shot(&checker, &task(), Duration::from_secs(10))
            .await
            .expect_err("check should time out");
        assert!(matches!(err, SyncError::OneShotTimeout { timeout_ms: 10_000, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_checker_returns_payload() {
        let checker = SlowChecker(Duration::from_millis(5));
        let payload = run_one_shot(&checker, &task(), Duration::from_secs(10))
            .await
            .expect("check should finish");
        assert_eq!(payload["ok"], true);
    }

    #[test]
    fn processing_flag_resets_on_drop() {
        let set = ProcessingSet::default();
        let key = task().key();
        {
            let _guard = set.begin(key.clone()).expect("first begin");
            assert!(set.is_processing(&key));
            assert!(set.begin(key.clone()).is_none());
        }
        assert!(!set.is_processing(&key));
    }
}
