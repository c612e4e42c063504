//! Travel concierge daemon.
//!
//! A chat turn flows through [`synthesizer`] (draft answer, entity extraction,
//! verification fan-out, merge), is wrapped by [`assembler`] and recorded in the
//! [`session`] store by [`coordinator`]. [`http_server`] exposes the whole thing.

pub mod answer;
pub mod assembler;
pub mod config;
pub mod coordinator;
pub mod extractor;
pub mod http_server;
pub mod prompts;
pub mod session;
pub mod synthesizer;
pub mod turn;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;
