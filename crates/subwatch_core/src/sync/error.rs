//! Surface-level error taxonomy.
//!
//! Every variant is recovered at the surface boundary; none of them is
//! allowed to take a process down.

use crate::model::task::{TaskKey, TaskValidationError};
use crate::repo::task_store::StoreError;
use crate::rules::cardinality::CardinalityViolation;
use crate::sync::transport::TransportError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    /// Store not ready or locked; the surface goes offline until reconnect.
    StoreUnavailable(String),
    /// Mutation targeted a key the store does not know.
    UnknownTaskKey(TaskKey),
    /// Referendum already has as many enabled actions as its status allows.
    CardinalityViolation(CardinalityViolation),
    /// One-shot check did not answer in time.
    OneShotTimeout { key: TaskKey, timeout_ms: u64 },
    /// Another surface committed this key first.
    VersionConflict {
        key: TaskKey,
        expected: u64,
        actual: u64,
    },
    /// The requested control is disabled for the task's current state.
    ControlDisabled { key: TaskKey, control: &'static str },
    /// Task rejected by validation.
    InvalidTask(TaskValidationError),
    /// Commit succeeded but the broadcast could not be sent.
    Transport(TransportError),
    /// Anything else the store or a collaborator reported.
    Unexpected(String),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(reason) => write!(f, "store unavailable: {reason}"),
            Self::UnknownTaskKey(key) => write!(f, "unknown task key: {key}"),
            Self::CardinalityViolation(err) => write!(f, "{err}"),
            Self::OneShotTimeout { key, timeout_ms } => {
                write!(f, "one-shot check for `{key}` timed out after {timeout_ms} ms")
            }
            Self::VersionConflict {
                key,
                expected,
                actual,
            } => write!(
                f,
                "task `{key}` changed elsewhere: expected version {expected}, stored {actual}"
            ),
            Self::ControlDisabled { key, control } => {
                write!(f, "control `{control}` is disabled for task `{key}`")
            }
            Self::InvalidTask(err) => write!(f, "{err}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::Unexpected(reason) => write!(f, "unexpected failure: {reason}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CardinalityViolation(err) => Some(err),
            Self::InvalidTask(err) => Some(err),
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl SyncError {
    /// Stable code for log lines and UI toasts.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::UnknownTaskKey(_) => "unknown_task_key",
            Self::CardinalityViolation(_) => "cardinality_violation",
            Self::OneShotTimeout { .. } => "one_shot_timeout",
            Self::VersionConflict { .. } => "version_conflict",
            Self::ControlDisabled { .. } => "control_disabled",
            Self::InvalidTask(_) => "invalid_task",
            Self::Transport(_) => "transport_error",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            StoreError::VersionConflict {
                key,
                expected,
                actual,
            } => Self::VersionConflict {
                key,
                expected,
                actual,
            },
            StoreError::Validation(err) => Self::InvalidTask(err),
            StoreError::Cardinality(err) => Self::CardinalityViolation(err),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

impl From<CardinalityViolation> for SyncError {
    fn from(value: CardinalityViolation) -> Self {
        Self::CardinalityViolation(value)
    }
}

impl From<TransportError> for SyncError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}
