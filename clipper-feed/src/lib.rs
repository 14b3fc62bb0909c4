//! Read-only client for a user's public media timeline.
//!
//! One operation: fetch a single page by user id, page size, and opaque
//! cursor. Pagination loops belong to the caller; the next cursor travels
//! inside the returned payload, whose shape the remote service owns.
pub mod client;
pub mod types;

pub use client::FeedClient;
