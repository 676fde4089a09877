//! Cross-node flows.

mod http_flow;
mod reconcile;
