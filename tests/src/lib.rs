//! # Badge Node Test Suite
//!
//! Multi-node tests that run real peer listeners and HTTP servers on
//! localhost.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # node builders and polling helpers
//! └── integration/
//!     ├── reconcile.rs  # partition digest anti-entropy between nodes
//!     └── http_flow.rs  # full runtimes driven over the HTTP API
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p badge-tests
//! cargo test -p badge-tests integration::reconcile::
//! ```

pub mod integration;
pub mod support;
