//! Conversation history
//!
//! Turns are kept per session id behind the `SessionStore` trait so the storage
//! backend can be swapped without touching the pipeline or the HTTP layer.

pub mod adapters;
pub mod store;

pub use adapters::InMemorySessionStore;
pub use store::{
    Session, SessionStats, SessionStore, SessionStoreError, SessionStoreRef, SessionSummary,
};
