// This crate contains the provider-facing side of the concierge:
// - API client for the LLM provider (Messages API)
// - Request/response data structures
// - Local-search client and the canonical venue record
// - Provider configuration
// - Shared error types

// Export client module - API client for the LLM provider
pub mod client;
pub use client::*;

// Export types module - Request/response data structures
pub mod types;
pub use types::*;

// Export local_search module - Local-search client and venue records
pub mod local_search;
pub use local_search::*;

// Export config module - Provider configuration
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;
