use crate::core::config::DataStore;
use crate::core::error::TransportError;
use crate::core::providers::RequestDescriptor;
use crate::core::session::ChatSession;
use crate::core::transport::{ByteStream, ChatTransport, TransportResponse};
use async_trait::async_trait;
use futures_util::future;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A transport that replays a fixed response and records what it was sent.
pub struct ScriptedTransport {
    status: u16,
    chunks: Vec<Vec<u8>>,
    hang: bool,
    stall: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new(status: u16, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            chunks,
            hang: false,
            stall: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 200 response streaming one delta per entry, then the sentinel.
    pub fn replying(deltas: &[&str]) -> Self {
        let mut chunks: Vec<Vec<u8>> = deltas.iter().map(|d| sse_delta(d)).collect();
        chunks.push(b"data: [DONE]\n\n".to_vec());
        Self::new(200, chunks)
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self::new(status, vec![body.as_bytes().to_vec()])
    }

    /// After the scripted chunks the body never ends.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// `send` records the request and then never resolves.
    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.stall {
            future::pending::<()>().await;
        }

        let body = stream::iter(self.chunks.clone().into_iter().map(Ok));
        let body: ByteStream = if self.hang {
            body.chain(stream::pending()).boxed()
        } else {
            body.boxed()
        };
        Ok(TransportResponse {
            status: self.status,
            body,
        })
    }
}

pub fn sse_delta(text: &str) -> Vec<u8> {
    let event = serde_json::json!({ "choices": [{ "delta": { "content": text } }] });
    format!("data: {event}\n\n").into_bytes()
}

/// Session without persistence, wired to `transport`.
pub fn test_session(transport: Arc<ScriptedTransport>) -> ChatSession {
    ChatSession::new(Default::default(), Vec::new(), None, transport)
}

/// Session persisting into `store`.
pub fn stored_session(store: DataStore, transport: Arc<ScriptedTransport>) -> ChatSession {
    ChatSession::open(store, transport)
}
