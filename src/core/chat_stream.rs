use std::collections::VecDeque;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::ChatResponse;
use crate::core::diagnostics::extract_error_summary;
use crate::core::error::ChatError;
use crate::core::generation::GenerationGuard;
use crate::core::transport::ByteStream;

const DONE_SENTINEL: &str = "[DONE]";

/// Live notifications for a front end rendering the reply as it arrives.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    End,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SseEvent {
    Delta(String),
    Done,
    Error(String),
}

/// How a stream ended.
#[derive(Debug)]
pub enum StreamOutcome {
    /// Sentinel or end of transport; carries the accumulated text.
    Completed(String),
    Cancelled,
    Failed(ChatError),
}

/// Incremental decoder for `data:`-framed event streams.
///
/// Bytes are buffered until a newline arrives, so neither a line nor a
/// multi-byte character split across reads is ever decoded early. Once the
/// sentinel or an error event is seen, further input is ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.extend_from_slice(chunk);
        let mut consumed = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[consumed..]) {
            let line_end = consumed + offset;
            let line = String::from_utf8_lossy(&self.buffer[consumed..line_end]);
            consumed = line_end + 1;

            if let Some(event) = process_sse_line(&line) {
                let terminal = !matches!(event, SseEvent::Delta(_));
                events.push(event);
                if terminal {
                    self.finished = true;
                    self.buffer.clear();
                    return events;
                }
            }
        }
        self.buffer.drain(..consumed);
        events
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

fn process_sse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let payload = extract_data_payload(line)?;
    if payload == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(error) = response.error.filter(|_| response.choices.is_empty()) {
                let wrapped = serde_json::json!({ "error": error });
                let summary = extract_error_summary(&wrapped)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| error_fallback(&wrapped));
                return Some(SseEvent::Error(summary));
            }
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .map(SseEvent::Delta)
        }
        Err(err) => {
            // Frames split mid-JSON are expected; skip them.
            debug!(error = %err, "skipping unparseable stream frame");
            None
        }
    }
}

fn error_fallback(value: &serde_json::Value) -> String {
    format!("API Error: {}", value["error"])
}

struct DeltaState {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    done: bool,
}

/// Lazily turns a response body into text deltas. The stream ends at the
/// sentinel (without reading further) or at end of transport; it yields an
/// error for transport failures and provider error events.
pub fn delta_stream(body: ByteStream) -> BoxStream<'static, Result<String, ChatError>> {
    let state = DeltaState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                match event {
                    SseEvent::Delta(text) => return Some((Ok(text), state)),
                    SseEvent::Done => return None,
                    SseEvent::Error(message) => {
                        state.done = true;
                        state.pending.clear();
                        return Some((Err(ChatError::Stream(message)), state));
                    }
                }
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(&chunk);
                    state.pending.extend(events);
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(ChatError::Transport(err)), state));
                }
                None => return None,
            }
        }
    })
    .boxed()
}

/// Reads deltas into the generation's partial text until the stream ends, an
/// error occurs, or the generation is stopped.
pub async fn consume_stream(
    body: ByteStream,
    generation: &GenerationGuard,
    listener: Option<&mpsc::UnboundedSender<StreamMessage>>,
) -> StreamOutcome {
    let cancel_token = generation.cancel_token().clone();
    let mut deltas = delta_stream(body);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return StreamOutcome::Cancelled,
            next = deltas.next() => next,
        };

        match next {
            Some(Ok(delta)) => {
                generation.push_delta(&delta);
                if let Some(tx) = listener {
                    let _ = tx.send(StreamMessage::Chunk(delta));
                }
            }
            Some(Err(err)) => {
                if cancel_token.is_cancelled() {
                    return StreamOutcome::Cancelled;
                }
                return StreamOutcome::Failed(err);
            }
            None => break,
        }
    }

    StreamOutcome::Completed(generation.partial_text())
}
