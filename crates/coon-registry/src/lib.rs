//! Pattern registry: fingerprinted widget subtrees addressable by reference id.
//!
//! Snapshots are immutable and shared; registration is append-only and
//! publishes a new snapshot under a single write lock.

pub mod buffer;
pub mod builtin;
pub mod entry;
pub mod registry;
pub mod snapshot;
pub mod store;

pub use buffer::{mine_repeated, RegistrationBuffer};
pub use entry::{PatternEntry, PatternMeta};
pub use registry::PatternRegistry;
pub use snapshot::{RegistryStats, RegistrySnapshot};
