//! Cross-surface synchronization.
//!
//! Each surface owns an observer cache and a mutation queue. Writes go to
//! the shared store first and are then broadcast to every other surface.

pub mod error;
pub mod event;
pub mod oneshot;
pub mod queue;
pub mod surface;
pub mod transport;
