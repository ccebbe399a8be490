use crate::core::catalog::Provider;
use thiserror::Error;

/// Failures raised by a [`ChatTransport`](crate::core::transport::ChatTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Other(String),
}

/// Everything that can go wrong between pressing send and committing a reply.
///
/// Cancellation is not in here: a stopped generation is an outcome, not an
/// error, and never produces a diagnostic.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No usable key for the selected model's provider. Resolved before any
    /// network call.
    #[error("no usable {provider} key for model {model}")]
    MissingCredential { provider: Provider, model: String },

    /// The provider answered with a non-2xx status.
    #[error("HTTP {status}")]
    Http { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The provider reported an error inside the event stream.
    #[error("{0}")]
    Stream(String),
}
