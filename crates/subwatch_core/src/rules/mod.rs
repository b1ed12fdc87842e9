//! Pure subscription state rules.
//!
//! # Responsibility
//! - Compute next task states from toggle intents (`toggle`).
//! - Derive category/referendum aggregate switches (`grouping`).
//! - Enforce the per-referendum subscription limit (`cardinality`).
//!
//! # Invariants
//! - Nothing in this module performs I/O or touches `version`.
//! - Inputs are borrowed and outputs are new values.

pub mod cardinality;
pub mod grouping;
pub mod toggle;
