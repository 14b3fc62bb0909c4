//! CRUD client for the article document store.
//!
//! Articles are opaque JSON documents living in named collections,
//! addressed by a server-assigned `_id`. The client is a transport and
//! envelope-unwrapping layer only; document schema belongs to the server.
pub mod client;
pub mod types;

pub use client::ArticleClient;
