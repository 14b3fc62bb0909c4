//! Shared utilities for the clipper workspace.
//!
//! Currently this is only [`observability`]: the centralised tracing setup
//! used by binaries and integration tests. It is deliberately lightweight so
//! every crate can depend on it without heavy transitive costs.
pub mod observability;
