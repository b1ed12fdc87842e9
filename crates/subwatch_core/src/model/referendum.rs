//! Referendum lifecycle status as reported by the governance subsystem.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// OpenGov referendum status. Unreported referenda count as `Preparing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferendumStatus {
    #[default]
    Preparing,
    Queueing,
    Deciding,
    Confirming,
    Approved,
    Rejected,
    Cancelled,
    TimedOut,
    Killed,
}

impl ReferendumStatus {
    /// Early phase before a decision period has started.
    pub fn is_pre_decision(self) -> bool {
        matches!(self, Self::Preparing | Self::Queueing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing",
            Self::Queueing => "Queueing",
            Self::Deciding => "Deciding",
            Self::Confirming => "Confirming",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::TimedOut => "TimedOut",
            Self::Killed => "Killed",
        }
    }

    /// Inverse of `as_str`.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == name)
    }
}

const ALL_STATUSES: [ReferendumStatus; 9] = [
    ReferendumStatus::Preparing,
    ReferendumStatus::Queueing,
    ReferendumStatus::Deciding,
    ReferendumStatus::Confirming,
    ReferendumStatus::Approved,
    ReferendumStatus::Rejected,
    ReferendumStatus::Cancelled,
    ReferendumStatus::TimedOut,
    ReferendumStatus::Killed,
];

impl Display for ReferendumStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ReferendumStatus;

    #[test]
    fn names_round_trip() {
        assert_eq!(
            ReferendumStatus::from_name("TimedOut"),
            Some(ReferendumStatus::TimedOut)
        );
        assert_eq!(ReferendumStatus::from_name("timedout"), None);
    }
}
