//! Beesto is a streaming chat client for several chat-completion providers.
//!
//! - [`core`] owns the session: credentials, the model catalog and
//!   selection, conversation storage, request shaping per provider, stream
//!   decoding with cancellation, and diagnostics for failed requests.
//! - [`api`] defines the wire payloads shared by every provider.
//! - [`cli`] is the command-line front end built on [`core::session`].
//!
//! The binary (`src/main.rs`) only calls [`cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
