//! Adapters to external systems.

pub mod mapi;

pub use mapi::{open_envelope, sign_request, Envelope, MapiOracle, SignedRequest};
