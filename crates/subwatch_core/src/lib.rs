//! Core of the subscription sync engine.
//!
//! The store in `repo` is the single source of truth for subscription
//! tasks; `sync` keeps every front-end surface's cache converged on it and
//! `feed` keeps live chain feeds in step with enabled tasks.

pub mod cache;
pub mod config;
pub mod db;
pub mod feed;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rules;
pub mod sync;

pub use cache::observer::{ApplyOutcome, LoadState, ObserverCache, ScopeTarget};
pub use config::{ConfigError, CoreConfig};
pub use feed::registry::{ChainClient, EventSink, FeedRegistry};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::referendum::ReferendumStatus;
pub use model::task::{
    key_of, same_task, AccountRef, IntervalSetting, SubscriptionTask, TaskKey, TaskStatus,
    TaskValidationError,
};
pub use repo::host::{
    negotiate_store, open_store, open_store_with_feeds, HostCapability, StoreSelection,
};
pub use repo::memory_store::MemoryTaskStore;
pub use repo::sqlite_store::SqliteTaskStore;
pub use repo::task_store::{
    FeedHooks, NoopFeedHooks, StoreError, StoreResult, TaskStore, UpdateOutcome,
};
pub use sync::error::{SyncError, SyncResult};
pub use sync::event::{BroadcastEvent, EventOp, SurfaceId, SurfaceKind};
pub use sync::surface::{MutationOutcome, Surface, SurfaceOptions};
pub use sync::transport::{EventTransport, MemoryTransport, TransportError};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
