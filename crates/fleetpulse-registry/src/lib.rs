//! fleetpulse-registry — the in-memory service catalog.
//!
//! Holds the domain types for monitored services, the shared `Registry`
//! (an `RwLock`ed map from service id to record), and the JSON catalog
//! loader that seeds it at startup.
//!
//! Records are handed out as cloned snapshots; every mutation goes through
//! [`Registry::update`], which applies a closure under the exclusive lock.
//! Probing engines therefore never hold a reference into the map while
//! doing I/O.

pub mod catalog;
pub mod error;
pub mod registry;
pub mod types;

pub use error::CatalogError;
pub use registry::Registry;
pub use types::*;
