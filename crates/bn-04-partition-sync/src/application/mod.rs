//! Application layer: the sync service and its periodic drivers.

pub mod loops;
pub mod service;

pub use loops::spawn_loops;
pub use service::{SyncDependencies, SyncService};
