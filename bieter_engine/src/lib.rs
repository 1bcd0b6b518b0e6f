#![forbid(unsafe_code)]

//! Bieter Engine
//!
//! Pure kernel of the member/offer store: phase machine, events,
//! validation, transitions and canonical hashing. No I/O.

/// Version of the event bodies and canonical state layout.
pub const SCHEMA_VERSION: u32 = 1;

pub mod domain;
pub mod error;
pub mod ids;
pub mod events;
pub mod state;
pub mod validation;
pub mod transitions;
pub mod hashing;
pub mod engine;
