//! Host capability negotiation and store adapter selection.
//!
//! # Responsibility
//! - Parse the storage capabilities a host process declares at startup.
//! - Select exactly one concrete `TaskStore` and build it for injection.
//!
//! # Invariants
//! - Selection happens once per process, before any surface hydrates.
//! - Preference order is fixed: `sqlite_file`, `sqlite_memory`, `memory`.

use crate::db::{open_db, open_db_in_memory};
use crate::feed::registry::FeedRegistry;
use crate::repo::memory_store::MemoryTaskStore;
use crate::repo::sqlite_store::SqliteTaskStore;
use crate::repo::task_store::{FeedHooks, StoreError, TaskStore};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Manifest string for a writable file system with SQLite available.
pub const HOST_CAPABILITY_SQLITE_FILE: &str = "sqlite_file";
/// Manifest string for SQLite without durable file access.
pub const HOST_CAPABILITY_SQLITE_MEMORY: &str = "sqlite_memory";
/// Manifest string for a plain in-process map.
pub const HOST_CAPABILITY_MEMORY: &str = "memory";

/// Storage capability a host process can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HostCapability {
    SqliteFile,
    SqliteMemory,
    Memory,
}

impl HostCapability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SqliteFile => HOST_CAPABILITY_SQLITE_FILE,
            Self::SqliteMemory => HOST_CAPABILITY_SQLITE_MEMORY,
            Self::Memory => HOST_CAPABILITY_MEMORY,
        }
    }
}

/// Parses one capability from its declaration string.
pub fn parse_host_capability(value: &str) -> Result<HostCapability, HostSelectionError> {
    match value.trim() {
        "" => Err(HostSelectionError::EmptyCapability),
        HOST_CAPABILITY_SQLITE_FILE => Ok(HostCapability::SqliteFile),
        HOST_CAPABILITY_SQLITE_MEMORY => Ok(HostCapability::SqliteMemory),
        HOST_CAPABILITY_MEMORY => Ok(HostCapability::Memory),
        other => Err(HostSelectionError::UnsupportedCapability(other.to_string())),
    }
}

/// Concrete store choice produced by negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSelection {
    SqliteFile(PathBuf),
    SqliteMemory,
    Memory,
}

/// Picks one backend from the offered capabilities.
///
/// `sqlite_file` is only eligible when a database path is configured.
pub fn negotiate_store(
    offered: &[HostCapability],
    db_path: Option<&PathBuf>,
) -> Result<StoreSelection, HostSelectionError> {
    if offered.contains(&HostCapability::SqliteFile) {
        if let Some(path) = db_path {
            return Ok(StoreSelection::SqliteFile(path.clone()));
        }
    }
    if offered.contains(&HostCapability::SqliteMemory) {
        return Ok(StoreSelection::SqliteMemory);
    }
    if offered.contains(&HostCapability::Memory) {
        return Ok(StoreSelection::Memory);
    }
    Err(HostSelectionError::NoUsableBackend)
}

/// Builds the selected store with the given feed hooks.
///
/// # Errors
/// - Returns `HostSelectionError::Store` when the database cannot be opened.
pub fn open_store(
    selection: &StoreSelection,
    hooks: Arc<dyn FeedHooks>,
) -> Result<Arc<dyn TaskStore>, HostSelectionError> {
    let store: Arc<dyn TaskStore> = match selection {
        StoreSelection::SqliteFile(path) => {
            let conn = open_db(path).map_err(|err| HostSelectionError::Store(err.into()))?;
            Arc::new(SqliteTaskStore::new(conn, hooks))
        }
        StoreSelection::SqliteMemory => {
            let conn = open_db_in_memory().map_err(|err| HostSelectionError::Store(err.into()))?;
            Arc::new(SqliteTaskStore::new(conn, hooks))
        }
        StoreSelection::Memory => Arc::new(MemoryTaskStore::new(hooks)),
    };
    info!(
        "event=store_select module=repo status=ok backend={}",
        store.backend_id()
    );
    Ok(store)
}

/// Builds the selected store with `registry` as its hooks, then starts the
/// feeds of tasks that were already enabled when the store was opened.
///
/// # Errors
/// - Same as `open_store`, plus `HostSelectionError::Store` when the
///   enabled tasks cannot be read.
pub async fn open_store_with_feeds(
    selection: &StoreSelection,
    registry: Arc<FeedRegistry>,
) -> Result<Arc<dyn TaskStore>, HostSelectionError> {
    let store = open_store(selection, registry.clone())?;
    registry
        .restore_from(store.as_ref())
        .await
        .map_err(HostSelectionError::Store)?;
    Ok(store)
}

/// Capability negotiation errors.
#[derive(Debug)]
pub enum HostSelectionError {
    EmptyCapability,
    UnsupportedCapability(String),
    NoUsableBackend,
    Store(StoreError),
}

impl Display for HostSelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "host capability value must not be empty"),
            Self::UnsupportedCapability(value) => {
                write!(f, "host capability is unsupported: {value}")
            }
            Self::NoUsableBackend => write!(f, "no offered capability maps to a task store"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HostSelectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}
