//! Per-provider request shaping.
//!
//! Every provider gets one entry in [`PROVIDER_TABLE`]. Adding a provider
//! means adding a row (and a [`Provider`] variant); callers only ever go
//! through [`translate`].

use crate::api::{ChatMessage, ChatRequest};
use crate::core::catalog::{Model, Provider};

const OPENROUTER_MODEL_PREFIX: &str = "openrouter/";
const OPENROUTER_REFERER: &str = "http://localhost";
const OPENROUTER_TITLE: &str = "Beesto AI";

/// Everything a transport needs to issue the request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub provider: Provider,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: ChatRequest,
}

impl RequestDescriptor {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

type BuildRequest = fn(&ProviderSpec, &str, &Model, Vec<ChatMessage>) -> RequestDescriptor;

pub struct ProviderSpec {
    pub provider: Provider,
    pub endpoint: &'static str,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    build: BuildRequest,
}

pub static PROVIDER_TABLE: [ProviderSpec; 5] = [
    ProviderSpec {
        provider: Provider::OpenRouter,
        endpoint: "https://openrouter.ai/api/v1/chat/completions",
        max_tokens: 4096,
        temperature: None,
        build: openrouter_request,
    },
    ProviderSpec {
        provider: Provider::OpenAI,
        endpoint: "https://api.openai.com/v1/chat/completions",
        max_tokens: 4096,
        temperature: None,
        build: standard_request,
    },
    ProviderSpec {
        provider: Provider::Gemini,
        endpoint: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
        max_tokens: 8192,
        temperature: None,
        build: standard_request,
    },
    ProviderSpec {
        provider: Provider::Groq,
        endpoint: "https://api.groq.com/openai/v1/chat/completions",
        max_tokens: 32768,
        temperature: Some(0.7),
        build: standard_request,
    },
    ProviderSpec {
        provider: Provider::Xai,
        endpoint: "https://api.x.ai/v1/chat/completions",
        max_tokens: 4096,
        temperature: None,
        build: standard_request,
    },
];

pub fn provider_spec(provider: Provider) -> &'static ProviderSpec {
    PROVIDER_TABLE
        .iter()
        .find(|spec| spec.provider == provider)
        .unwrap_or(&PROVIDER_TABLE[0])
}

/// Builds the streaming request for `model` on `provider`.
pub fn translate(
    provider: Provider,
    credential: &str,
    model: &Model,
    messages: Vec<ChatMessage>,
) -> RequestDescriptor {
    let spec = provider_spec(provider);
    (spec.build)(spec, credential, model, messages)
}

fn base_headers(credential: &str) -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), format!("Bearer {credential}")),
    ]
}

fn body(spec: &ProviderSpec, model_id: &str, messages: Vec<ChatMessage>) -> ChatRequest {
    ChatRequest {
        model: model_id.to_string(),
        messages,
        stream: true,
        max_tokens: spec.max_tokens,
        temperature: spec.temperature,
    }
}

fn standard_request(
    spec: &ProviderSpec,
    credential: &str,
    model: &Model,
    messages: Vec<ChatMessage>,
) -> RequestDescriptor {
    RequestDescriptor {
        provider: spec.provider,
        endpoint: spec.endpoint.to_string(),
        headers: base_headers(credential),
        body: body(spec, &model.id, messages),
    }
}

fn openrouter_request(
    spec: &ProviderSpec,
    credential: &str,
    model: &Model,
    messages: Vec<ChatMessage>,
) -> RequestDescriptor {
    let model_id = model
        .id
        .strip_prefix(OPENROUTER_MODEL_PREFIX)
        .unwrap_or(&model.id);
    let mut headers = base_headers(credential);
    headers.push(("HTTP-Referer".to_string(), OPENROUTER_REFERER.to_string()));
    headers.push(("X-Title".to_string(), OPENROUTER_TITLE.to_string()));

    RequestDescriptor {
        provider: spec.provider,
        endpoint: spec.endpoint.to_string(),
        headers,
        body: body(spec, model_id, messages),
    }
}
