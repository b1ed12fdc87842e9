//! Backend-side live chain-data feed bookkeeping.
//!
//! # Responsibility
//! - Reference-count enabled tasks per `(chain_id, action)`.
//! - Start a feed on the first enable and stop it on the last disable.
//! - Forward observed chain events to the notification and UI layers.
//!
//! # Invariants
//! - Reference counts live here only; surfaces never duplicate them.
//! - `ChainClient` sees exactly one start per 0->1 edge and one stop per
//!   1->0 edge.

pub mod registry;
