//! The session context: settings, conversations, the selected model and the
//! generation flag, plus the operations a front end drives.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::catalog::{Model, ModelCatalog, Provider};
use crate::core::chat::{title_from, Chat, ChatCollection};
use crate::core::chat_stream::{consume_stream, StreamMessage, StreamOutcome};
use crate::core::config::{DataStore, Settings, StoreError, Theme};
use crate::core::diagnostics;
use crate::core::error::ChatError;
use crate::core::generation::{GenerationGuard, GenerationState};
use crate::core::message::{Attachment, Message};
use crate::core::message_builder::build_api_messages;
use crate::core::providers::{translate, RequestDescriptor};
use crate::core::selector::select_default;
use crate::core::transport::ChatTransport;

/// What a send or regenerate did to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send.
    Ignored,
    /// Another generation is in flight; nothing was appended.
    Busy,
    /// A reply was committed.
    Replied,
    /// The stream finished without text; a placeholder was committed.
    EmptyReply,
    /// No usable key; a diagnostic was committed without any network call.
    MissingCredential,
    /// The request failed; a diagnostic was committed.
    Failed,
    /// Stopped by the user; nothing was committed.
    Cancelled,
}

pub struct ChatSession {
    catalog: &'static ModelCatalog,
    settings: Settings,
    model: &'static Model,
    chats: ChatCollection,
    store: Option<DataStore>,
    transport: Arc<dyn ChatTransport>,
    generation: GenerationState,
    listener: Option<mpsc::UnboundedSender<StreamMessage>>,
}

impl ChatSession {
    /// Builds a session over already-loaded state. Without a store, nothing is
    /// persisted.
    pub fn new(
        settings: Settings,
        chats: Vec<Chat>,
        store: Option<DataStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let catalog = ModelCatalog::builtin();
        let current = ModelCatalog::builtin_or_default(&settings.selected_model_id);
        let model = select_default(current, &settings.credentials, catalog);
        if model.id != current.id {
            debug!(from = %current.id, to = %model.id, "switched to a model with a usable key");
        }

        let mut session = Self {
            catalog,
            settings,
            model,
            chats: ChatCollection::from_chats(chats),
            store,
            transport,
            generation: GenerationState::new(),
            listener: None,
        };
        session.settings.selected_model_id = model.id.clone();
        session
    }

    /// Loads settings and chats from `store`; missing or corrupt files start
    /// fresh.
    pub fn open(store: DataStore, transport: Arc<dyn ChatTransport>) -> Self {
        let settings = store.load_settings();
        let chats = store.load_chats();
        Self::new(settings, chats, Some(store), transport)
    }

    pub fn catalog(&self) -> &'static ModelCatalog {
        self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &'static Model {
        self.model
    }

    pub fn chats(&self) -> &ChatCollection {
        &self.chats
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.chats.current()
    }

    /// Last message of the open conversation.
    pub fn last_message(&self) -> Option<&Message> {
        self.chats.current().and_then(|chat| chat.messages.last())
    }

    /// Clonable handle for reading partial text or stopping from elsewhere.
    pub fn generation(&self) -> GenerationState {
        self.generation.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_generating()
    }

    pub fn current_partial_text(&self) -> String {
        self.generation.partial_text()
    }

    /// Returns false when nothing was running.
    pub fn stop_generation(&self) -> bool {
        self.generation.stop()
    }

    /// Streams deltas of every following request to the returned receiver.
    /// Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StreamMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listener = Some(tx);
        rx
    }

    // Settings

    /// Stores (or clears, when blank) a key, then re-runs model selection.
    pub fn set_credential(&mut self, provider: Provider, value: &str) -> &'static Model {
        self.settings.credentials.set(provider, value.trim());
        let model = select_default(self.model, &self.settings.credentials, self.catalog);
        if model.id != self.model.id {
            info!(from = %self.model.id, to = %model.id, "model reselected after key change");
        }
        self.model = model;
        self.settings.selected_model_id = model.id.clone();
        self.persist_settings();
        model
    }

    /// Selects a catalog model and remembers it. Unknown ids are rejected.
    pub fn select_model(&mut self, id: &str) -> Option<&'static Model> {
        let model = self.override_model(id)?;
        self.settings.selected_model_id = model.id.clone();
        self.persist_settings();
        Some(model)
    }

    /// Uses a catalog model for this session only.
    pub fn override_model(&mut self, id: &str) -> Option<&'static Model> {
        let model = self.catalog.find(id.trim())?;
        self.model = model;
        Some(model)
    }

    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.settings.system_prompt = prompt.trim().to_string();
        self.persist_settings();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.settings.theme = theme;
        self.persist_settings();
    }

    pub fn toggle_theme(&mut self, system_prefers_dark: bool) -> Theme {
        let theme = self.settings.theme.toggle(system_prefers_dark);
        self.set_theme(theme);
        theme
    }

    // Conversations

    pub fn new_chat(&mut self) -> &Chat {
        self.chats.new_chat();
        self.persist_chats();
        self.chats.ensure_current()
    }

    pub fn select_chat(&mut self, id: &str) -> bool {
        self.chats.select(id)
    }

    pub fn delete_chat(&mut self, id: &str) -> bool {
        let removed = self.chats.delete(id);
        if removed {
            self.persist_chats();
        }
        removed
    }

    pub fn clear_chats(&mut self) {
        self.chats.clear();
        self.persist_chats();
    }

    pub fn search_chats(&self, query: &str) -> Vec<&Chat> {
        self.chats.search(query)
    }

    pub fn export_chats(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.chats.export_json().map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    // Generation

    /// Appends a user message to the open conversation (creating one if
    /// needed) and requests a reply.
    pub async fn send_user_turn(&mut self, text: &str, attachments: Vec<Attachment>) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() && attachments.is_empty() {
            return TurnOutcome::Ignored;
        }
        if self.generation.is_generating() {
            debug!("send ignored while a reply is streaming");
            return TurnOutcome::Busy;
        }

        let chat = self.chats.ensure_current();
        chat.push(Message::user(text, attachments));
        if chat.user_message_count() == 1 && !text.is_empty() {
            chat.title = title_from(text);
        }
        self.persist_chats();

        self.request_completion().await
    }

    /// Drops the trailing assistant message and asks again with the
    /// remaining history.
    pub async fn regenerate_last_turn(&mut self) -> TurnOutcome {
        if self.generation.is_generating() {
            return TurnOutcome::Busy;
        }
        let Some(chat) = self.chats.current_mut() else {
            return TurnOutcome::Ignored;
        };
        if chat.pop_assistant().is_none() {
            return TurnOutcome::Ignored;
        }
        self.persist_chats();

        self.request_completion().await
    }

    async fn request_completion(&mut self) -> TurnOutcome {
        let model = self.model;
        let Some(credential) = self.settings.credentials.usable_key(model.provider) else {
            let error = ChatError::MissingCredential {
                provider: model.provider,
                model: model.id.clone(),
            };
            warn!(%error, "request not sent");
            let text =
                diagnostics::missing_credential(model, &self.settings.credentials, self.catalog);
            self.commit(Message::diagnostic(text));
            return TurnOutcome::MissingCredential;
        };

        let Some(guard) = self.generation.try_begin() else {
            return TurnOutcome::Busy;
        };

        let history = self
            .chats
            .current()
            .map(|chat| chat.messages.as_slice())
            .unwrap_or_default();
        let messages = build_api_messages(history, &self.settings.system_prompt, model);
        let request = translate(model.provider, credential, model, messages);
        debug!(
            provider = %model.provider,
            model = %request.body.model,
            endpoint = %request.endpoint,
            messages = request.body.messages.len(),
            "dispatching chat request"
        );

        let outcome = self.run_request(&request, &guard).await;
        let turn = match outcome {
            StreamOutcome::Completed(text) => {
                let reply = text.trim();
                if reply.is_empty() {
                    self.commit(Message::diagnostic(diagnostics::EMPTY_RESPONSE));
                    TurnOutcome::EmptyReply
                } else {
                    self.commit(Message::assistant(reply, model.display_name.clone()));
                    TurnOutcome::Replied
                }
            }
            StreamOutcome::Cancelled => {
                debug!("generation stopped by user");
                self.touch_current();
                TurnOutcome::Cancelled
            }
            StreamOutcome::Failed(err) => {
                warn!(provider = %model.provider, error = %err, "chat request failed");
                self.commit(Message::diagnostic(diagnostics::request_failed(&err, model)));
                TurnOutcome::Failed
            }
        };

        self.notify(StreamMessage::End);
        drop(guard);
        turn
    }

    async fn run_request(
        &self,
        request: &RequestDescriptor,
        guard: &GenerationGuard,
    ) -> StreamOutcome {
        let cancel_token = guard.cancel_token();

        let response = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return StreamOutcome::Cancelled,
            response = self.transport.send(request) => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(err) => return StreamOutcome::Failed(ChatError::from(err)),
        };

        if !response.is_success() {
            let status = response.status;
            let body = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return StreamOutcome::Cancelled,
                body = response.text() => body.unwrap_or_default(),
            };
            return StreamOutcome::Failed(ChatError::Http { status, body });
        }

        consume_stream(response.body, guard, self.listener.as_ref()).await
    }

    fn commit(&mut self, message: Message) {
        self.chats.ensure_current().push(message);
        self.persist_chats();
    }

    fn touch_current(&mut self) {
        if let Some(chat) = self.chats.current_mut() {
            chat.touch();
        }
        self.persist_chats();
    }

    fn notify(&self, message: StreamMessage) {
        if let Some(tx) = &self.listener {
            let _ = tx.send(message);
        }
    }

    fn persist_settings(&self) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save_settings(&self.settings) {
                warn!(error = %err, "failed to save settings");
            }
        }
    }

    fn persist_chats(&self) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save_chats(self.chats.chats()) {
                warn!(error = %err, "failed to save chats");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use crate::utils::test_utils::{sse_delta, stored_session, test_session, ScriptedTransport};
    use tempfile::TempDir;

    const GROQ_KEY: &str = "gsk_abcdefghijklmnop";

    fn with_groq_key(session: &mut ChatSession) {
        session.set_credential(Provider::Groq, GROQ_KEY);
    }

    #[tokio::test]
    async fn missing_key_commits_diagnostic_without_network_call() {
        let transport = Arc::new(ScriptedTransport::replying(&["never"]));
        let mut session = test_session(transport.clone());

        let outcome = session.send_user_turn("hello", Vec::new()).await;

        assert_eq!(outcome, TurnOutcome::MissingCredential);
        assert_eq!(transport.call_count(), 0);
        let reply = session.last_message().unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("**GROQ** key"));
        assert!(reply.content.contains("https://console.groq.com/keys"));
        assert!(reply.content.contains("Ultra-fast free inference"));
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn short_keys_count_as_missing() {
        let transport = Arc::new(ScriptedTransport::replying(&["never"]));
        let mut session = test_session(transport.clone());
        session.set_credential(Provider::Groq, "  short  ");

        let outcome = session.send_user_turn("hello", Vec::new()).await;
        assert_eq!(outcome, TurnOutcome::MissingCredential);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn streamed_reply_is_committed_with_model_name() {
        let transport = Arc::new(ScriptedTransport::replying(&["  Hel", "lo!  "]));
        let mut session = test_session(transport.clone());
        with_groq_key(&mut session);

        let outcome = session.send_user_turn("Say hello", Vec::new()).await;

        assert_eq!(outcome, TurnOutcome::Replied);
        let chat = session.current_chat().unwrap();
        assert_eq!(chat.title, "Say hello");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].content, "Hello!");
        assert_eq!(chat.messages[1].model.as_deref(), Some("LLaMA 3.3 70B"));
        assert_eq!(session.current_partial_text(), "");
        assert!(!session.is_generating());

        let request = &transport.requests()[0];
        assert_eq!(request.header("authorization"), Some("Bearer gsk_abcdefghijklmnop"));
        assert_eq!(request.body.messages.len(), 2);
        assert_eq!(request.body.messages[0].role, "system");
    }

    #[tokio::test]
    async fn subscribers_see_chunks_then_end() {
        let transport = Arc::new(ScriptedTransport::replying(&["a", "b"]));
        let mut session = test_session(transport);
        with_groq_key(&mut session);
        let mut rx = session.subscribe();

        session.send_user_turn("hi", Vec::new()).await;

        assert_eq!(rx.try_recv().unwrap(), StreamMessage::Chunk("a".into()));
        assert_eq!(rx.try_recv().unwrap(), StreamMessage::Chunk("b".into()));
        assert_eq!(rx.try_recv().unwrap(), StreamMessage::End);
    }

    #[tokio::test]
    async fn unauthorized_names_provider_in_uppercase() {
        let transport = Arc::new(ScriptedTransport::failing(
            401,
            r#"{"error":{"message":"Invalid API Key"}}"#,
        ));
        let mut session = test_session(transport.clone());
        with_groq_key(&mut session);

        let outcome = session.send_user_turn("hello", Vec::new()).await;

        assert_eq!(outcome, TurnOutcome::Failed);
        assert_eq!(transport.call_count(), 1);
        let reply = &session.last_message().unwrap().content;
        assert!(reply.starts_with("### ❌ Request Failed"));
        assert!(reply.contains("Invalid or expired API key for **GROQ**"));
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn in_stream_errors_become_diagnostics() {
        let transport = Arc::new(ScriptedTransport::new(
            200,
            vec![
                sse_delta("partial"),
                b"data: {\"error\":{\"message\":\"upstream timeout\"}}\n\n".to_vec(),
            ],
        ));
        let mut session = test_session(transport);
        with_groq_key(&mut session);

        assert_eq!(session.send_user_turn("hi", Vec::new()).await, TurnOutcome::Failed);
        let reply = &session.last_message().unwrap().content;
        assert!(reply.contains("upstream timeout"));
        assert!(!reply.contains("partial"));
    }

    #[tokio::test]
    async fn empty_stream_commits_placeholder() {
        let transport = Arc::new(ScriptedTransport::replying(&["   "]));
        let mut session = test_session(transport);
        with_groq_key(&mut session);

        let outcome = session.send_user_turn("hello", Vec::new()).await;

        assert_eq!(outcome, TurnOutcome::EmptyReply);
        let reply = session.last_message().unwrap();
        assert_eq!(reply.content, diagnostics::EMPTY_RESPONSE);
        assert_eq!(reply.model, None);
    }

    #[tokio::test]
    async fn cancellation_commits_nothing_and_clears_flag() {
        let transport = Arc::new(ScriptedTransport::new(200, vec![sse_delta("Hel")]).hanging());
        let mut session = test_session(transport);
        with_groq_key(&mut session);
        let generation = session.generation();

        let stopper = async {
            while generation.partial_text().is_empty() {
                tokio::task::yield_now().await;
            }
            assert!(generation.stop());
        };
        let (outcome, ()) = tokio::join!(session.send_user_turn("hello", Vec::new()), stopper);

        assert_eq!(outcome, TurnOutcome::Cancelled);
        let chat = session.current_chat().unwrap();
        assert_eq!(chat.messages.len(), 1);
        assert!(chat.messages[0].is_user());
        assert!(!session.is_generating());
        assert_eq!(session.current_partial_text(), "");
    }

    #[tokio::test]
    async fn stopping_before_response_arrives_cancels_quietly() {
        let transport = Arc::new(ScriptedTransport::replying(&["never"]).stalled());
        let mut session = test_session(transport.clone());
        with_groq_key(&mut session);
        let generation = session.generation();

        let stopper = async {
            while transport.call_count() == 0 {
                tokio::task::yield_now().await;
            }
            assert!(generation.is_generating());
            assert!(generation.stop());
        };
        let (outcome, ()) = tokio::join!(session.send_user_turn("hello", Vec::new()), stopper);

        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(transport.call_count(), 1);
        let chat = session.current_chat().unwrap();
        assert_eq!(chat.messages.len(), 1);
        assert!(chat.messages[0].is_user());
        assert_eq!(chat.messages[0].content, "hello");
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn sends_are_ignored_while_generating() {
        let transport = Arc::new(ScriptedTransport::replying(&["x"]));
        let mut session = test_session(transport.clone());
        with_groq_key(&mut session);
        let handle = session.generation();
        let _busy = handle.try_begin().unwrap();

        assert_eq!(session.send_user_turn("hello", Vec::new()).await, TurnOutcome::Busy);
        assert_eq!(session.regenerate_last_turn().await, TurnOutcome::Busy);
        assert_eq!(transport.call_count(), 0);
        assert!(session.current_chat().is_none());
    }

    #[tokio::test]
    async fn blank_sends_are_ignored() {
        let transport = Arc::new(ScriptedTransport::replying(&["x"]));
        let mut session = test_session(transport.clone());
        assert_eq!(session.send_user_turn("   ", Vec::new()).await, TurnOutcome::Ignored);
        assert!(session.current_chat().is_none());
    }

    #[tokio::test]
    async fn regenerate_drops_last_reply_and_resends_history() {
        let transport = Arc::new(ScriptedTransport::replying(&["answer"]));
        let mut session = test_session(transport.clone());
        with_groq_key(&mut session);
        session.set_system_prompt("");

        session.send_user_turn("first", Vec::new()).await;
        session.send_user_turn("second", Vec::new()).await;
        assert_eq!(session.current_chat().unwrap().messages.len(), 4);

        let outcome = session.regenerate_last_turn().await;

        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(transport.call_count(), 3);
        let resent = &transport.requests()[2].body.messages;
        let roles: Vec<&str> = resent.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "user"]);
        assert_eq!(resent[0].content.as_text(), Some("first"));
        assert_eq!(resent[2].content.as_text(), Some("second"));
        assert_eq!(session.current_chat().unwrap().messages.len(), 4);
    }

    #[tokio::test]
    async fn regenerate_needs_trailing_reply() {
        let transport = Arc::new(ScriptedTransport::replying(&["x"]));
        let mut session = test_session(transport.clone());
        assert_eq!(session.regenerate_last_turn().await, TurnOutcome::Ignored);
    }

    #[test]
    fn key_changes_reselect_the_model() {
        let transport = Arc::new(ScriptedTransport::replying(&[]));
        let mut session = test_session(transport);
        assert_eq!(session.model().id, "llama-3.3-70b-versatile");

        let model = session.set_credential(Provider::OpenAI, "sk-abcdefghijk");
        assert_eq!(model.id, "gpt-4o-mini");

        // The current provider stays usable, so nothing moves.
        session.set_credential(Provider::OpenRouter, "sk-or-abcdefghijk");
        assert_eq!(session.model().id, "gpt-4o-mini");
    }

    #[test]
    fn unknown_models_are_rejected() {
        let transport = Arc::new(ScriptedTransport::replying(&[]));
        let mut session = test_session(transport);
        assert!(session.select_model("no-such-model").is_none());
        assert_eq!(session.select_model("grok-3-mini").unwrap().provider, Provider::Xai);
        assert_eq!(session.settings().selected_model_id, "grok-3-mini");
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DataStore::new(temp_dir.path());
        let transport = Arc::new(ScriptedTransport::replying(&["Hi there"]));

        let mut session = stored_session(store.clone(), transport.clone());
        session.set_credential(Provider::Groq, GROQ_KEY);
        session.set_theme(Theme::Light);
        session.send_user_turn("Hello", Vec::new()).await;
        let chat_id = session.current_chat().unwrap().id.clone();

        let reopened = stored_session(store, transport);
        assert_eq!(reopened.settings().theme, Theme::Light);
        assert!(reopened.settings().credentials.is_usable(Provider::Groq));
        let chat = reopened.current_chat().unwrap();
        assert_eq!(chat.id, chat_id);
        assert_eq!(chat.messages[1].content, "Hi there");
    }

    #[test]
    fn chat_management_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let transport = Arc::new(ScriptedTransport::replying(&[]));
        let mut session = test_session(transport);

        let first = session.new_chat().id.clone();
        let second = session.new_chat().id.clone();
        assert_ne!(first, second);
        assert_eq!(session.current_chat().unwrap().id, second);
        assert!(session.select_chat(&first));
        assert!(!session.select_chat("c_missing"));

        let export = temp_dir.path().join("export.json");
        session.export_chats(&export).expect("export failed");
        let exported: Vec<Chat> =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        assert_eq!(exported.len(), 2);

        assert!(session.delete_chat(&first));
        assert_eq!(session.current_chat().unwrap().id, second);
        session.clear_chats();
        assert!(session.current_chat().is_none());
    }
}
