//! Domain layer: key layout, chunking and errors.

pub mod chunks;
pub mod errors;
pub mod keys;

pub use chunks::{assemble, split};
pub use errors::StoreError;
