//! The HTTP seam between request shaping and stream consumption.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::debug;

use crate::core::error::TransportError;
use crate::core::providers::RequestDescriptor;

/// Response body as it arrives from the wire, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

pub struct TransportResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the body into a string, replacing invalid UTF-8.
    pub async fn text(mut self) -> Result<String, TransportError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Issues a prepared request and hands back the status plus a streaming body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor)
        -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportError> {
        let mut http_request = self.client.post(&request.endpoint);
        for (name, value) in &request.headers {
            http_request = http_request.header(name, value);
        }

        let response = http_request.json(&request.body).send().await?;
        let status = response.status().as_u16();
        debug!(status, endpoint = %request.endpoint, "chat response received");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from))
            .boxed();
        Ok(TransportResponse { status, body })
    }
}
