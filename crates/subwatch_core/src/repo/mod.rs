//! Task store adapters.
//!
//! # Responsibility
//! - Define the storage-agnostic task store contract.
//! - Provide the SQLite and in-memory adapters and pick one per host.
//!
//! # Invariants
//! - The store is the only writer of durable subscription state.
//! - Writes validate tasks before persistence.

pub mod host;
pub mod memory_store;
pub mod sqlite_store;
pub mod task_store;
