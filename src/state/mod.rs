//! Session state store
//!
//! Durable, atomically-written project record. Everything else reads and
//! writes project state through this module.

mod store;

pub use store::{SessionStore, StoreError, StoreLock, SCHEMA_VERSION};
