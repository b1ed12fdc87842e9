//! Per-surface observer caches.
//!
//! # Responsibility
//! - Mirror the subset of store tasks one surface renders.
//! - Rebuild wholesale on hydrate; patch one bucket per broadcast event.
//!
//! # Invariants
//! - The cache is never authoritative; the store is.
//! - A cache that failed to hydrate is empty and reports `NotLoaded`.
//! - Applying the same event twice leaves the cache unchanged.

pub mod observer;
