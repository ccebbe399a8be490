pub mod catalog;
pub mod chat;
pub mod chat_stream;
pub mod config;
pub mod credentials;
pub mod diagnostics;
pub mod error;
pub mod generation;
pub mod message;
pub mod message_builder;
pub mod providers;
pub mod selector;
pub mod session;
pub mod transport;
