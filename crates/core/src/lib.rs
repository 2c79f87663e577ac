//! `esgadmin-core` — shared primitives for the admin console crates.
//!
//! This crate contains **pure** building blocks (no IO, no transport).

pub mod clock;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use id::{ActorId, InvalidActorId};
