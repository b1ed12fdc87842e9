//! Default subscription sets created when a chain or account is added.
//!
//! Every default task starts disabled; the user opts in per row or per
//! category.

use crate::model::action::{actions_for_scope, ActionScope};
use crate::model::task::{AccountRef, SubscriptionTask};

/// Disabled chain-scoped tasks for one chain.
pub fn default_chain_tasks(chain_id: &str) -> Vec<SubscriptionTask> {
    actions_for_scope(ActionScope::Chain)
        .map(|info| SubscriptionTask::new(chain_id, info.action, info.category))
        .collect()
}

/// Disabled account-scoped tasks for one account.
pub fn default_account_tasks(account: &AccountRef) -> Vec<SubscriptionTask> {
    actions_for_scope(ActionScope::Account)
        .map(|info| {
            SubscriptionTask::new(account.chain_id.as_str(), info.action, info.category)
                .with_account(account.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{default_account_tasks, default_chain_tasks};
    use crate::model::task::AccountRef;

    #[test]
    fn defaults_are_disabled_and_valid() {
        let account = AccountRef::new("Kusama", "HNZata");
        let tasks = default_account_tasks(&account);
        assert!(!tasks.is_empty());
        for task in tasks.iter().chain(default_chain_tasks("Kusama").iter()) {
            assert!(!task.is_enabled());
            task.validate().expect("default task should validate");
        }
    }
}
