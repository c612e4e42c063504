//! Storage backends for [`SessionStore`](super::SessionStore)

pub mod in_memory;

pub use in_memory::InMemorySessionStore;
