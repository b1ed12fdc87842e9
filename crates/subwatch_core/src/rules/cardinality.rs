//! Per-referendum subscription limit.
//!
//! # Invariants
//! - At most `max_subscriptions_for(status)` distinct actions are enabled
//!   for one referendum.
//! - A status change never subscribes anything by itself; newly allowed
//!   actions only become addable.

use crate::model::action::{actions_for_scope, ActionScope, ACTION_REFERENDUM_VOTES};
use crate::model::referendum::ReferendumStatus;
use crate::model::task::SubscriptionTask;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PRE_DECISION_LIMIT: usize = 1;
const FULL_LIMIT: usize = 3;

/// Maximum concurrently enabled tasks for a referendum in `status`.
pub fn max_subscriptions_for(status: ReferendumStatus) -> usize {
    if status.is_pre_decision() {
        PRE_DECISION_LIMIT
    } else {
        FULL_LIMIT
    }
}

/// Interval actions meaningful for a referendum in `status`.
pub fn applicable_actions(status: ReferendumStatus) -> Vec<&'static str> {
    if status.is_pre_decision() {
        vec![ACTION_REFERENDUM_VOTES]
    } else {
        actions_for_scope(ActionScope::Referendum)
            .map(|info| info.action)
            .collect()
    }
}

/// Distinct enabled actions for one referendum.
pub fn active_actions(referendum_id: u32, tasks: &[SubscriptionTask]) -> BTreeSet<&str> {
    tasks
        .iter()
        .filter(|task| task.referendum_id == Some(referendum_id) && task.is_enabled())
        .map(|task| task.action.as_str())
        .collect()
}

pub fn is_fully_subscribed(
    referendum_id: u32,
    status: ReferendumStatus,
    tasks: &[SubscriptionTask],
) -> bool {
    active_actions(referendum_id, tasks).len() >= max_subscriptions_for(status)
}

/// Actions the user may still add, in catalog order. Never auto-enabled.
pub fn addable_actions(
    referendum_id: u32,
    status: ReferendumStatus,
    tasks: &[SubscriptionTask],
) -> Vec<&'static str> {
    if is_fully_subscribed(referendum_id, status, tasks) {
        return Vec::new();
    }
    let active = active_actions(referendum_id, tasks);
    applicable_actions(status)
        .into_iter()
        .filter(|action| !active.contains(action))
        .collect()
}

/// Checks that enabling `action` keeps the referendum within its limit.
///
/// Re-enabling an action that is already active is always allowed since it
/// updates the existing task in place.
pub fn check_can_enable(
    referendum_id: u32,
    status: ReferendumStatus,
    tasks: &[SubscriptionTask],
    action: &str,
) -> Result<(), CardinalityViolation> {
    let active = active_actions(referendum_id, tasks);
    if active.contains(action) {
        return Ok(());
    }
    let max = max_subscriptions_for(status);
    if active.len() >= max {
        return Err(CardinalityViolation {
            referendum_id,
            status,
            max,
            action: action.to_string(),
        });
    }
    Ok(())
}

/// Enabling one more task would exceed the referendum limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityViolation {
    pub referendum_id: u32,
    pub status: ReferendumStatus,
    pub max: usize,
    pub action: String,
}

impl Display for CardinalityViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "referendum {} ({}) allows at most {} subscription(s); cannot add `{}`",
            self.referendum_id, self.status, self.max, self.action
        )
    }
}

impl Error for CardinalityViolation {}
