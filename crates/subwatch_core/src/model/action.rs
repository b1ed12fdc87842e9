//! Catalog of subscription actions known to the backend.
//!
//! # Invariants
//! - Action strings are stable; they are part of the persisted task key.
//! - Interval actions share the `subscribe:interval:` prefix.

/// Which kind of target an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionScope {
    Chain,
    Account,
    Referendum,
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionInfo {
    pub action: &'static str,
    pub category: &'static str,
    pub scope: ActionScope,
    pub label: &'static str,
}

pub const CATEGORY_CHAIN: &str = "Chain";
pub const CATEGORY_BALANCES: &str = "Balances";
pub const CATEGORY_NOMINATION_POOLS: &str = "Nomination Pools";
pub const CATEGORY_NOMINATING: &str = "Nominating";
pub const CATEGORY_OPEN_GOV: &str = "OpenGov";

pub const ACTION_REFERENDUM_VOTES: &str = "subscribe:interval:openGov:referendumVotes";
pub const ACTION_REFERENDUM_THRESHOLDS: &str = "subscribe:interval:openGov:referendumThresholds";
pub const ACTION_DECISION_PERIOD: &str = "subscribe:interval:openGov:decisionPeriod";

const INTERVAL_PREFIX: &str = "subscribe:interval:";

const ACTIONS: &[ActionInfo] = &[
    ActionInfo {
        action: "subscribe:chain:timestamp",
        category: CATEGORY_CHAIN,
        scope: ActionScope::Chain,
        label: "Timestamps",
    },
    ActionInfo {
        action: "subscribe:chain:currentBlock",
        category: CATEGORY_CHAIN,
        scope: ActionScope::Chain,
        label: "Current Block",
    },
    ActionInfo {
        action: "subscribe:account:balance:free",
        category: CATEGORY_BALANCES,
        scope: ActionScope::Account,
        label: "Free Balance",
    },
    ActionInfo {
        action: "subscribe:account:balance:frozen",
        category: CATEGORY_BALANCES,
        scope: ActionScope::Account,
        label: "Frozen Balance",
    },
    ActionInfo {
        action: "subscribe:account:balance:reserved",
        category: CATEGORY_BALANCES,
        scope: ActionScope::Account,
        label: "Reserved Balance",
    },
    ActionInfo {
        action: "subscribe:account:balance:spendable",
        category: CATEGORY_BALANCES,
        scope: ActionScope::Account,
        label: "Spendable Balance",
    },
    ActionInfo {
        action: "subscribe:account:nominationPools:rewards",
        category: CATEGORY_NOMINATION_POOLS,
        scope: ActionScope::Account,
        label: "Unclaimed Rewards",
    },
    ActionInfo {
        action: "subscribe:account:nominationPools:state",
        category: CATEGORY_NOMINATION_POOLS,
        scope: ActionScope::Account,
        label: "State",
    },
    ActionInfo {
        action: "subscribe:account:nominationPools:renamed",
        category: CATEGORY_NOMINATION_POOLS,
        scope: ActionScope::Account,
        label: "Renamed",
    },
    ActionInfo {
        action: "subscribe:account:nominationPools:roles",
        category: CATEGORY_NOMINATION_POOLS,
        scope: ActionScope::Account,
        label: "Roles",
    },
    ActionInfo {
        action: "subscribe:account:nominationPools:commission",
        category: CATEGORY_NOMINATION_POOLS,
        scope: ActionScope::Account,
        label: "Commission",
    },
    ActionInfo {
        action: "subscribe:account:nominating:pendingPayouts",
        category: CATEGORY_NOMINATING,
        scope: ActionScope::Account,
        label: "Pending Payouts",
    },
    ActionInfo {
        action: "subscribe:account:nominating:exposure",
        category: CATEGORY_NOMINATING,
        scope: ActionScope::Account,
        label: "Era Exposure",
    },
    ActionInfo {
        action: "subscribe:account:nominating:commission",
        category: CATEGORY_NOMINATING,
        scope: ActionScope::Account,
        label: "Commission Changed",
    },
    ActionInfo {
        action: "subscribe:account:nominating:nominations",
        category: CATEGORY_NOMINATING,
        scope: ActionScope::Account,
        label: "Nominations Changed",
    },
    ActionInfo {
        action: ACTION_REFERENDUM_VOTES,
        category: CATEGORY_OPEN_GOV,
        scope: ActionScope::Referendum,
        label: "Votes Tally",
    },
    ActionInfo {
        action: ACTION_REFERENDUM_THRESHOLDS,
        category: CATEGORY_OPEN_GOV,
        scope: ActionScope::Referendum,
        label: "Thresholds",
    },
    ActionInfo {
        action: ACTION_DECISION_PERIOD,
        category: CATEGORY_OPEN_GOV,
        scope: ActionScope::Referendum,
        label: "Decision Period",
    },
];

/// Returns the full action catalog.
pub fn all_actions() -> &'static [ActionInfo] {
    ACTIONS
}

/// Returns catalog entries applying to one scope, in catalog order.
pub fn actions_for_scope(scope: ActionScope) -> impl Iterator<Item = &'static ActionInfo> {
    ACTIONS.iter().filter(move |info| info.scope == scope)
}

pub fn find_action(action: &str) -> Option<&'static ActionInfo> {
    ACTIONS.iter().find(|info| info.action == action)
}

/// Whether the action is polled on a timer rather than pushed.
pub fn is_interval_action(action: &str) -> bool {
    action.starts_with(INTERVAL_PREFIX)
}

pub fn is_referendum_action(action: &str) -> bool {
    find_action(action).is_some_and(|info| info.scope == ActionScope::Referendum)
}

#[cfg(test)]
mod tests {
    use super::{actions_for_scope, find_action, is_interval_action, ActionScope};

    #[test]
    fn referendum_actions_are_interval_actions() {
        let referendum: Vec<_> = actions_for_scope(ActionScope::Referendum).collect();
        assert_eq!(referendum.len(), 3);
        assert!(referendum.iter().all(|info| is_interval_action(info.action)));
    }

    #[test]
    fn unknown_action_is_not_in_catalog() {
        assert!(find_action("subscribe:chain:unknown").is_none());
    }
}
