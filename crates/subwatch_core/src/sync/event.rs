//! Broadcast event wire shape.
//!
//! Events are JSON-safe so the IPC layer can carry them unchanged between
//! processes.

use crate::model::task::{key_of, SubscriptionTask, TaskKey};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one front-end surface instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SurfaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Front-end surface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Main,
    Settings,
    Action,
    OpenGov,
}

impl SurfaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Settings => "settings",
            Self::Action => "action",
            Self::OpenGov => "open_gov",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOp {
    Upsert,
    Delete,
}

/// One committed task change, as seen by other surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Unique per emission; redeliveries keep the same id.
    pub id: Uuid,
    pub origin: SurfaceId,
    pub key: TaskKey,
    /// Stored value after the commit (last stored value for deletes).
    pub task: SubscriptionTask,
    pub op: EventOp,
}

impl BroadcastEvent {
    pub fn upsert(origin: SurfaceId, task: SubscriptionTask) -> Self {
        Self::new(origin, task, EventOp::Upsert)
    }

    pub fn delete(origin: SurfaceId, task: SubscriptionTask) -> Self {
        Self::new(origin, task, EventOp::Delete)
    }

    fn new(origin: SurfaceId, task: SubscriptionTask, op: EventOp) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            key: key_of(&task),
            task,
            op,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BroadcastEvent, SurfaceId};
    use crate::model::task::SubscriptionTask;

    #[test]
    fn event_serializes_with_snake_case_op_and_camel_case_task() {
        let task = SubscriptionTask::new("Polkadot", "subscribe:chain:currentBlock", "Chain");
        let event = BroadcastEvent::upsert(SurfaceId::new(), task);
        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["op"], "upsert");
        assert_eq!(json["key"], "Polkadot|subscribe:chain:currentBlock||");
        assert_eq!(json["task"]["chainId"], "Polkadot");
        assert_eq!(json["task"]["status"], "disable");

        let decoded: BroadcastEvent = serde_json::from_value(json).expect("event should decode");
        assert_eq!(decoded, event);
    }
}
