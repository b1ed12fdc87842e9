//! Toggle engine.
//!
//! Callers compose these with I/O as: compute next state, store update,
//! broadcast.

use crate::model::task::{IntervalSetting, SubscriptionTask};

/// Flips `enable`/`disable`; every other field is carried over.
pub fn toggle_status(task: &SubscriptionTask) -> SubscriptionTask {
    SubscriptionTask {
        status: task.status.flipped(),
        ..task.clone()
    }
}

/// Sets the native notification flag, independent of status.
pub fn toggle_os_notify(task: &SubscriptionTask, flag: bool) -> SubscriptionTask {
    SubscriptionTask {
        enable_os_notifications: flag,
        ..task.clone()
    }
}

/// Replaces the polling cadence of an interval task.
///
/// Returns an unchanged copy for non-interval tasks and unknown cadences.
pub fn change_cadence(task: &SubscriptionTask, setting: &IntervalSetting) -> SubscriptionTask {
    if !task.is_interval() || !setting.is_known() {
        return task.clone();
    }
    SubscriptionTask {
        interval_setting: Some(setting.clone()),
        ..task.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{change_cadence, toggle_os_notify, toggle_status};
    use crate::model::action::ACTION_REFERENDUM_VOTES;
    use crate::model::task::{key_of, AccountRef, IntervalSetting, SubscriptionTask, TaskStatus};

    fn sample_tasks() -> Vec<SubscriptionTask> {
        let account = AccountRef::new("Polkadot", "5FHneW46");
        vec![
            SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain"),
            SubscriptionTask::new("Kusama", "subscribe:account:balance:free", "Balances")
                .with_account(AccountRef::new("Kusama", "HNZata"))
                .with_status(TaskStatus::Enable)
                .with_os_notifications(true),
            SubscriptionTask::new("Polkadot", "subscribe:account:nominating:exposure", "Nominating")
                .with_account(account),
            SubscriptionTask::new("Polkadot", ACTION_REFERENDUM_VOTES, "OpenGov")
                .with_referendum(42, IntervalSetting::default_for_referendum()),
        ]
    }

    #[test]
    fn toggle_status_twice_is_identity() {
        for task in sample_tasks() {
            assert_eq!(toggle_status(&toggle_status(&task)), task);
        }
    }

    #[test]
    fn toggle_status_keeps_key_and_other_fields() {
        for task in sample_tasks() {
            let next = toggle_status(&task);
            assert_eq!(key_of(&next), key_of(&task));
            assert_ne!(next.status, task.status);
            assert_eq!(next.enable_os_notifications, task.enable_os_notifications);
            assert_eq!(next.interval_setting, task.interval_setting);
            assert_eq!(next.version, task.version);
        }
    }

    #[test]
    fn toggle_os_notify_ignores_status() {
        let task = SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain");
        let next = toggle_os_notify(&task, true);
        assert!(next.enable_os_notifications);
        assert_eq!(next.status, TaskStatus::Disable);
    }

    #[test]
    fn change_cadence_guards_unknown_values_and_event_tasks() {
        let referendum = SubscriptionTask::new("Polkadot", ACTION_REFERENDUM_VOTES, "OpenGov")
            .with_referendum(1, IntervalSetting::default_for_referendum());

        let known = IntervalSetting::new("6 hours", 24);
        assert_eq!(
            change_cadence(&referendum, &known).interval_setting,
            Some(known.clone())
        );

        let unknown = IntervalSetting::new("7 minutes", 3);
        assert_eq!(change_cadence(&referendum, &unknown), referendum);

        let chain = SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain");
        assert_eq!(change_cadence(&chain, &known), chain);
    }
}
