#![forbid(unsafe_code)]

//! Bieter Runtime
//!
//! Wraps the kernel with a durable append-only event log, replay at
//! startup, member ID generation, configuration and a thread-safe store.
//!
//! No domain logic lives here; validation and transitions are delegated
//! to `bieter_engine`.

pub mod proto_types;
pub mod proto_bridge;
pub mod event_log;
pub mod replay;
pub mod drift;
pub mod id_gen;
pub mod config;
pub mod store;

pub use config::{load_config, Config};
pub use store::{Store, StoreError};
