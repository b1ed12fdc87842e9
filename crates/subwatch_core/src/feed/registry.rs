//! Feed reference counting and event forwarding.

use crate::model::task::SubscriptionTask;
use crate::repo::task_store::{FeedHooks, StoreResult, TaskStore};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Chain-client boundary. Implemented by the chain RPC subsystem.
pub trait ChainClient: Send + Sync {
    /// Starts the event stream or polling timer for one chain action.
    fn start_feed(&self, chain_id: &str, action: &str);
    /// Tears down the feed started by `start_feed`.
    fn stop_feed(&self, chain_id: &str, action: &str);
}

/// Notification and UI event boundary.
pub trait EventSink: Send + Sync {
    fn ui_event(&self, task: &SubscriptionTask, payload: &Value);
    fn os_notification(&self, task: &SubscriptionTask, payload: &Value);
}

type FeedKey = (String, String);

/// Reference-counted feed registry; plugs into stores as `FeedHooks`.
pub struct FeedRegistry {
    client: Arc<dyn ChainClient>,
    sink: Arc<dyn EventSink>,
    counts: Mutex<BTreeMap<FeedKey, usize>>,
}

impl FeedRegistry {
    pub fn new(client: Arc<dyn ChainClient>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            client,
            sink,
            counts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Current enabled-task count for one feed.
    pub fn ref_count(&self, chain_id: &str, action: &str) -> usize {
        self.counts
            .lock()
            .get(&(chain_id.to_string(), action.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of feeds currently running.
    pub fn active_feeds(&self) -> usize {
        self.counts.lock().len()
    }

    /// Seeds counts from already enabled tasks.
    pub fn restore(&self, enabled: &[SubscriptionTask]) {
        for task in enabled.iter().filter(|task| task.is_enabled()) {
            self.on_enable(task);
        }
    }

    /// Starts feeds for every task the store already has enabled.
    ///
    /// Call once, right after the store is opened and before any surface
    /// writes. Returns the number of enabled tasks found.
    pub async fn restore_from(&self, store: &dyn TaskStore) -> StoreResult<usize> {
        let enabled = store.get_all_enabled().await?;
        self.restore(&enabled);
        info!(
            "event=feed_restore module=feed status=ok backend={} tasks={} feeds={}",
            store.backend_id(),
            enabled.len(),
            self.active_feeds()
        );
        Ok(enabled.len())
    }

    /// Forwards one observed chain event for a task.
    ///
    /// Disabled tasks are dropped; OS notifications are posted only when the
    /// task opts in.
    pub fn on_event_observed(&self, task: &SubscriptionTask, payload: &Value) {
        if !task.is_enabled() {
            debug!(
                "event=feed_observe module=feed status=dropped reason=disabled key={}",
                task.key()
            );
            return;
        }
        self.sink.ui_event(task, payload);
        if task.enable_os_notifications {
            self.sink.os_notification(task, payload);
        }
    }
}

impl FeedHooks for FeedRegistry {
    fn on_enable(&self, task: &SubscriptionTask) {
        let start = {
            let mut counts = self.counts.lock();
            let count = counts
                .entry((task.chain_id.clone(), task.action.clone()))
                .or_insert(0);
            *count += 1;
            *count == 1
        };
        if start {
            info!(
                "event=feed_start module=feed status=ok chain={} action={}",
                task.chain_id, task.action
            );
            self.client.start_feed(&task.chain_id, &task.action);
        }
    }

    fn on_disable(&self, task: &SubscriptionTask) {
        let key = (task.chain_id.clone(), task.action.clone());
        let stop = {
            let mut counts = self.counts.lock();
            match counts.get_mut(&key) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    counts.remove(&key);
                    true
                }
                None => {
                    warn!(
                        "event=feed_stop module=feed status=skipped reason=not_running chain={} action={}",
                        task.chain_id, task.action
                    );
                    false
                }
            }
        };
        if stop {
            info!(
                "event=feed_stop module=feed status=ok chain={} action={}",
                task.chain_id, task.action
            );
            self.client.stop_feed(&task.chain_id, &task.action);
        }
    }
}
