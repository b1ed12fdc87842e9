//! Subscription task domain model.
//!
//! # Responsibility
//! - Define the canonical subscription task record shared by every surface.
//! - Define the compound identity key and the equality used for dedup.
//!
//! # Invariants
//! - Identity is `(chain_id, action, account.address?, referendum_id?)`.
//!   `category`, `status`, notification flag, cadence and `version` never
//!   participate in identity.
//! - Task values are never mutated in place once shared; helpers that
//!   change state return a new value.
//! - `version` is assigned by the store only.
//!
//! # See also
//! - model::action for the action catalog.

use crate::model::action::{is_interval_action, is_referendum_action};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][A-Za-z]*(:[A-Za-z][A-Za-z0-9]*)+$").expect("valid action regex")
});

const KEY_SEPARATOR: char = '|';

/// Subscription enablement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Data collection is active for this task.
    Enable,
    /// Kept as a default/historical row; excluded from active counts.
    Disable,
}

impl TaskStatus {
    /// Returns the opposite status.
    pub fn flipped(self) -> Self {
        match self {
            Self::Enable => Self::Disable,
            Self::Disable => Self::Enable,
        }
    }

    /// Stable string form used in storage columns and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// Reference to an imported account on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub address: String,
    pub chain_id: String,
    /// Display name only; never part of identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AccountRef {
    pub fn new(chain_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain_id: chain_id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Cache bucket key for account-scoped observers.
    pub fn scope_key(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.chain_id, self.address)
    }

    /// Two refs point at the same account regardless of display name.
    pub fn same_account(&self, other: &AccountRef) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

/// Polling cadence for interval tasks.
///
/// One tick is the backend's base polling period (15 minutes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSetting {
    pub label: String,
    pub ticks: u32,
}

const KNOWN_INTERVALS: &[(&str, u32)] = &[
    ("15 minutes", 1),
    ("30 minutes", 2),
    ("1 hour", 4),
    ("2 hours", 8),
    ("6 hours", 24),
    ("12 hours", 48),
    ("1 day", 96),
    ("2 days", 192),
    ("3 days", 288),
];

/// Returns every cadence the backend scheduler understands.
pub fn known_intervals() -> Vec<IntervalSetting> {
    KNOWN_INTERVALS
        .iter()
        .map(|(label, ticks)| IntervalSetting::new(*label, *ticks))
        .collect()
}

impl IntervalSetting {
    pub fn new(label: impl Into<String>, ticks: u32) -> Self {
        Self {
            label: label.into(),
            ticks,
        }
    }

    /// Cadence used when a referendum task is created without one.
    pub fn default_for_referendum() -> Self {
        Self::new("1 hour", 4)
    }

    /// Whether this cadence matches one known `(label, ticks)` pair.
    pub fn is_known(&self) -> bool {
        KNOWN_INTERVALS
            .iter()
            .any(|(label, ticks)| *label == self.label && *ticks == self.ticks)
    }
}

/// Compound identity key of one subscription task.
///
/// Serialized as `chain_id|action|address|referendum_id`, with empty
/// segments for absent optional parts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TaskKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical subscription task record.
///
/// Serialized with camelCase field names; this is the persisted JSON shape
/// and the shape carried by broadcast events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTask {
    pub chain_id: String,
    pub action: String,
    /// UI grouping label only.
    pub category: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referendum_id: Option<u32>,
    #[serde(default)]
    pub enable_os_notifications: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_setting: Option<IntervalSetting>,
    /// Store-assigned write counter, `0` for never-persisted values.
    #[serde(default)]
    pub version: u64,
}

impl SubscriptionTask {
    /// Creates a disabled chain-scoped task.
    pub fn new(
        chain_id: impl Into<String>,
        action: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            action: action.into(),
            category: category.into(),
            status: TaskStatus::Disable,
            account: None,
            referendum_id: None,
            enable_os_notifications: false,
            interval_setting: None,
            version: 0,
        }
    }

    /// Scopes the task to one account. The account chain becomes the task chain.
    pub fn with_account(mut self, account: AccountRef) -> Self {
        self.chain_id = account.chain_id.clone();
        self.account = Some(account);
        self
    }

    /// Scopes the task to one referendum with a polling cadence.
    pub fn with_referendum(mut self, referendum_id: u32, setting: IntervalSetting) -> Self {
        self.referendum_id = Some(referendum_id);
        self.interval_setting = Some(setting);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_os_notifications(mut self, enabled: bool) -> Self {
        self.enable_os_notifications = enabled;
        self
    }

    pub fn key(&self) -> TaskKey {
        key_of(self)
    }

    pub fn is_enabled(&self) -> bool {
        self.status == TaskStatus::Enable
    }

    pub fn is_chain_scoped(&self) -> bool {
        self.account.is_none() && self.referendum_id.is_none()
    }

    pub fn is_interval(&self) -> bool {
        is_interval_action(&self.action)
    }

    /// Validates identity and shape invariants before persistence.
    ///
    /// # Errors
    /// - Empty or separator-containing chain id or address.
    /// - Action string outside `segment(:segment)+` grammar.
    /// - Interval setting on a non-interval action, or unknown cadence.
    /// - Referendum id on a non-referendum action (and the reverse).
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        let chain_id = self.chain_id.trim();
        if chain_id.is_empty() || self.chain_id.contains(KEY_SEPARATOR) {
            return Err(TaskValidationError::InvalidChainId(self.chain_id.clone()));
        }
        if !ACTION_RE.is_match(&self.action) {
            return Err(TaskValidationError::InvalidAction(self.action.clone()));
        }
        if let Some(account) = &self.account {
            if account.address.trim().is_empty() || account.address.contains(KEY_SEPARATOR) {
                return Err(TaskValidationError::InvalidAddress(account.address.clone()));
            }
            if account.chain_id != self.chain_id {
                return Err(TaskValidationError::AccountChainMismatch {
                    task_chain: self.chain_id.clone(),
                    account_chain: account.chain_id.clone(),
                });
            }
        }
        match &self.interval_setting {
            Some(_) if !self.is_interval() => {
                return Err(TaskValidationError::IntervalOnEventAction(
                    self.action.clone(),
                ));
            }
            Some(setting) if !setting.is_known() => {
                return Err(TaskValidationError::UnknownInterval(setting.clone()));
            }
            None if self.is_interval() => {
                return Err(TaskValidationError::MissingInterval(self.action.clone()));
            }
            _ => {}
        }
        let referendum_action = is_referendum_action(&self.action);
        if referendum_action != self.referendum_id.is_some() {
            return Err(TaskValidationError::ReferendumScopeMismatch(
                self.action.clone(),
            ));
        }
        Ok(())
    }
}

/// Deterministic serialization of the compound identity key.
pub fn key_of(task: &SubscriptionTask) -> TaskKey {
    let address = task
        .account
        .as_ref()
        .map(|account| account.address.as_str())
        .unwrap_or("");
    let referendum = task
        .referendum_id
        .map(|id| id.to_string())
        .unwrap_or_default();
    TaskKey(format!(
        "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{address}{KEY_SEPARATOR}{referendum}",
        task.chain_id, task.action
    ))
}

/// Identity equality. Never compare tasks by value for dedup.
pub fn same_task(a: &SubscriptionTask, b: &SubscriptionTask) -> bool {
    key_of(a) == key_of(b)
}

/// Task shape validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    InvalidChainId(String),
    InvalidAction(String),
    InvalidAddress(String),
    AccountChainMismatch {
        task_chain: String,
        account_chain: String,
    },
    IntervalOnEventAction(String),
    MissingInterval(String),
    UnknownInterval(IntervalSetting),
    ReferendumScopeMismatch(String),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChainId(value) => write!(f, "invalid chain id: `{value}`"),
            Self::InvalidAction(value) => write!(f, "invalid action: `{value}`"),
            Self::InvalidAddress(value) => write!(f, "invalid account address: `{value}`"),
            Self::AccountChainMismatch {
                task_chain,
                account_chain,
            } => write!(
                f,
                "account chain `{account_chain}` does not match task chain `{task_chain}`"
            ),
            Self::IntervalOnEventAction(action) => {
                write!(f, "interval setting is not allowed on event action `{action}`")
            }
            Self::MissingInterval(action) => {
                write!(f, "interval action `{action}` requires an interval setting")
            }
            Self::UnknownInterval(setting) => write!(
                f,
                "unknown interval setting `{}` ({} ticks)",
                setting.label, setting.ticks
            ),
            Self::ReferendumScopeMismatch(action) => write!(
                f,
                "referendum id presence does not match action `{action}`"
            ),
        }
    }
}

impl Error for TaskValidationError {}

#[cfg(test)]
mod tests {
    use super::{key_of, same_task, AccountRef, IntervalSetting, SubscriptionTask, TaskStatus};

    #[test]
    fn key_ignores_non_identity_fields() {
        let a = SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain");
        let mut b = a.clone();
        b.category = "Other".to_string();
        b.status = TaskStatus::Enable;
        b.enable_os_notifications = true;
        b.version = 9;
        assert!(same_task(&a, &b));
    }

    #[test]
    fn key_distinguishes_account_and_referendum() {
        let chain = SubscriptionTask::new("Polkadot", "subscribe:account:balance:free", "Balances");
        let account = chain
            .clone()
            .with_account(AccountRef::new("Polkadot", "5Fabc"));
        assert_ne!(key_of(&chain), key_of(&account));
        assert_eq!(key_of(&account).as_str(), "Polkadot|subscribe:account:balance:free|5Fabc|");

        let referendum = SubscriptionTask::new(
            "Polkadot",
            "subscribe:interval:openGov:referendumVotes",
            "OpenGov",
        )
        .with_referendum(12, IntervalSetting::default_for_referendum());
        assert!(key_of(&referendum).as_str().ends_with("||12"));
    }

    #[test]
    fn validate_rejects_separator_in_chain_id() {
        let task = SubscriptionTask::new("Pol|kadot", "subscribe:chain:timestamp", "Chain");
        assert!(task.validate().is_err());
    }

    #[test]
    fn validate_requires_referendum_for_open_gov_actions() {
        let mut task = SubscriptionTask::new(
            "Polkadot",
            "subscribe:interval:openGov:referendumVotes",
            "OpenGov",
        );
        task.interval_setting = Some(IntervalSetting::default_for_referendum());
        assert!(task.validate().is_err());
        let task = task.with_referendum(3, IntervalSetting::default_for_referendum());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn flipped_status_round_trips() {
        assert_eq!(TaskStatus::Enable.flipped().flipped(), TaskStatus::Enable);
    }
}
