//! # Shared Types Crate
//!
//! Domain entities, network parameters and peer wire messages shared by all
//! badge node subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary is
//!   defined here.
//! - **Storage Agnostic**: entities are plain serde structs; the repositories
//!   that persist them live behind ports in the subsystem crates.
//! - **Wire Stability**: peer messages are protobuf (`prost`) with fixed tags.

pub mod entities;
pub mod errors;
pub mod ids;
pub mod network;
pub mod time;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use ids::{raw_to_txid, txid_to_raw};
pub use network::{Network, NetworkParams};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
