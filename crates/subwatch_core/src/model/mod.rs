//! Subscription domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its compound identity key.
//! - Catalog the actions and default task sets the backend knows about.
//!
//! # Invariants
//! - Every task is identified by `key_of`; object identity is meaningless.
//! - Chain and account tasks are never hard-deleted, only disabled.

pub mod action;
pub mod defaults;
pub mod referendum;
pub mod task;
