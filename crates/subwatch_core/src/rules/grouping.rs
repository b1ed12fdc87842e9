//! Category and referendum aggregate switches.
//!
//! An aggregate switch is on only when every task it covers is enabled; one
//! disabled task turns the whole group off. Over an empty set the switch
//! reads as on, matching `Iterator::all`.

use crate::model::task::{SubscriptionTask, TaskStatus};
use crate::rules::toggle::toggle_status;
use std::collections::BTreeMap;

/// Conjunction of `status = enable` over the given tasks.
pub fn category_toggle_state(tasks: &[SubscriptionTask]) -> bool {
    tasks.iter().all(SubscriptionTask::is_enabled)
}

/// Buckets tasks by category label, keeping input order inside buckets.
pub fn group_by_category(tasks: &[SubscriptionTask]) -> BTreeMap<String, Vec<SubscriptionTask>> {
    let mut groups: BTreeMap<String, Vec<SubscriptionTask>> = BTreeMap::new();
    for task in tasks {
        groups
            .entry(task.category.clone())
            .or_default()
            .push(task.clone());
    }
    groups
}

/// Mutation batch that moves every task of `category` to the target state.
///
/// Tasks already in the target state are left out of the batch.
pub fn group_toggle(
    category: &str,
    turn_on: bool,
    tasks: &[SubscriptionTask],
) -> Vec<SubscriptionTask> {
    batch_toward(turn_on, tasks.iter().filter(|task| task.category == category))
}

/// Conjunction rule scoped to one referendum's tasks.
pub fn referendum_toggle_state(referendum_id: u32, tasks: &[SubscriptionTask]) -> bool {
    tasks
        .iter()
        .filter(|task| task.referendum_id == Some(referendum_id))
        .all(SubscriptionTask::is_enabled)
}

/// Mutation batch for the "all tasks of one referendum" switch.
pub fn referendum_toggle(
    referendum_id: u32,
    turn_on: bool,
    tasks: &[SubscriptionTask],
) -> Vec<SubscriptionTask> {
    batch_toward(
        turn_on,
        tasks
            .iter()
            .filter(|task| task.referendum_id == Some(referendum_id)),
    )
}

/// The notification switch is interactive only while the task is enabled.
pub fn os_notify_control_enabled(task: &SubscriptionTask) -> bool {
    task.is_enabled()
}

fn batch_toward<'a>(
    turn_on: bool,
    tasks: impl Iterator<Item = &'a SubscriptionTask>,
) -> Vec<SubscriptionTask> {
    let target = if turn_on {
        TaskStatus::Enable
    } else {
        TaskStatus::Disable
    };
    tasks
        .filter(|task| task.status != target)
        .map(toggle_status)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        category_toggle_state, group_by_category, group_toggle, referendum_toggle,
        referendum_toggle_state,
    };
    use crate::model::action::{ACTION_DECISION_PERIOD, ACTION_REFERENDUM_VOTES};
    use crate::model::task::{AccountRef, IntervalSetting, SubscriptionTask, TaskStatus};
    use crate::rules::toggle::toggle_status;

    fn balances(statuses: &[TaskStatus]) -> Vec<SubscriptionTask> {
        let actions = [
            "subscribe:account:balance:free",
            "subscribe:account:balance:frozen",
            "subscribe:account:balance:reserved",
            "subscribe:account:balance:spendable",
        ];
        statuses
            .iter()
            .zip(actions)
            .map(|(status, action)| {
                SubscriptionTask::new("Polkadot", action, "Balances")
                    .with_account(AccountRef::new("Polkadot", "5Fabc"))
                    .with_status(*status)
            })
            .collect()
    }

    #[test]
    fn category_state_is_a_conjunction() {
        let all_on = balances(&[TaskStatus::Enable; 4]);
        assert!(category_toggle_state(&all_on));

        for index in 0..all_on.len() {
            let mut one_off = all_on.clone();
            one_off[index] = toggle_status(&one_off[index]);
            assert!(!category_toggle_state(&one_off));
        }

        let mostly_on = balances(&[
            TaskStatus::Enable,
            TaskStatus::Enable,
            TaskStatus::Enable,
            TaskStatus::Disable,
        ]);
        assert!(!category_toggle_state(&mostly_on));
    }

    #[test]
    fn group_toggle_only_emits_tasks_that_change() {
        let mut tasks = balances(&[TaskStatus::Enable, TaskStatus::Disable, TaskStatus::Disable]);
        tasks.push(SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain"));

        let batch = group_toggle("Balances", true, &tasks);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|task| task.is_enabled() && task.category == "Balances"));

        let all_on = balances(&[TaskStatus::Enable; 4]);
        assert!(group_toggle("Balances", true, &all_on).is_empty());
        assert_eq!(group_toggle("Balances", false, &all_on).len(), 4);
    }

    #[test]
    fn referendum_state_and_toggle_are_scoped() {
        let setting = IntervalSetting::default_for_referendum();
        let tasks = vec![
            SubscriptionTask::new("Polkadot", ACTION_REFERENDUM_VOTES, "OpenGov")
                .with_referendum(7, setting.clone())
                .with_status(TaskStatus::Enable),
            SubscriptionTask::new("Polkadot", ACTION_DECISION_PERIOD, "OpenGov")
                .with_referendum(7, setting.clone()),
            SubscriptionTask::new("Polkadot", ACTION_REFERENDUM_VOTES, "OpenGov")
                .with_referendum(8, setting)
                .with_status(TaskStatus::Enable),
        ];
        assert!(!referendum_toggle_state(7, &tasks));
        assert!(referendum_toggle_state(8, &tasks));

        let batch = referendum_toggle(7, true, &tasks);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].action, ACTION_DECISION_PERIOD);
    }

    #[test]
    fn group_by_category_buckets_labels() {
        let mut tasks = balances(&[TaskStatus::Enable, TaskStatus::Disable]);
        tasks.push(SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain"));
        let groups = group_by_category(&tasks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Balances"].len(), 2);
    }
}
