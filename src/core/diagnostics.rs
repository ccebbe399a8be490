//! User-facing diagnostics committed to the conversation in place of a reply.

use crate::core::catalog::{Model, ModelCatalog};
use crate::core::credentials::CredentialStore;
use crate::core::error::ChatError;

/// Raw error bodies longer than this are cut before being shown.
const RAW_BODY_LIMIT: usize = 300;

pub const EMPTY_RESPONSE: &str =
    "*(The model returned an empty response. Try rephrasing your message or switching models.)*";

/// Explains which key is missing and how to get one. When another provider is
/// usable, points at that provider's models.
pub fn missing_credential(
    model: &Model,
    credentials: &CredentialStore,
    catalog: &ModelCatalog,
) -> String {
    let provider = model.provider;
    let required = provider.shout();

    let mut text = format!(
        "### 🔑 API Key Required\n\n\
The model **{name}** needs a **{required}** key.\n\n\
**How to fix:**\n\
1. Get a key from {link}\n\
2. Save it with `beesto key {id} <your-key>`\n\
3. Send your message again\n\n\
📎 Get a free key: {link}\n\n\
*{hint}*",
        name = model.display_name,
        link = provider.key_link(),
        hint = provider.hint(),
        id = provider.id(),
    );

    let alternative = credentials
        .usable_providers()
        .into_iter()
        .next()
        .and_then(|have| catalog.group_for(have).map(|group| (have, group)));
    if let Some((have, group)) = alternative {
        let example = group
            .models
            .first()
            .map(|m| format!(" (for example `beesto set model {}`)", m.id))
            .unwrap_or_default();
        text.push_str(&format!(
            "\n\n---\n**💡 Quick fix:** You have a **{}** key. Switch to a **{}** model{}.",
            have.shout(),
            group.name,
            example
        ));
    }

    text
}

/// Short, status-specific explanation of a failed request.
pub fn describe(error: &ChatError, model: &Model) -> String {
    let provider = model.provider.shout();
    match error {
        ChatError::MissingCredential { provider, model } => {
            format!("No usable **{}** key for **{model}**.", provider.shout())
        }
        ChatError::Http { status, body } => match status {
            401 => format!(
                "Invalid or expired API key for **{provider}**. Double-check it with `beesto key`."
            ),
            429 => format!("Rate limit reached on **{provider}**. Wait a moment and try again."),
            402 => format!("Insufficient credits on **{provider}**. Top up your account."),
            404 => format!("Model **{}** not found. Try a different model.", model.id),
            400 => format!(
                "Bad request: {}. Check your system prompt for special characters.",
                http_error_summary(*status, body)
            ),
            _ => http_error_summary(*status, body),
        },
        ChatError::Transport(err) => err.to_string(),
        ChatError::Stream(message) => message.clone(),
    }
}

/// Full diagnostic for a request that failed after dispatch.
pub fn request_failed(error: &ChatError, model: &Model) -> String {
    format!(
        "### ❌ Request Failed\n\n{}\n\n\
**Things to try:**\n\
- Verify your API key is correct (`beesto key`)\n\
- Make sure the key belongs to **{}**\n\
- Check your internet connection\n\
- Try a different model",
        describe(error, model),
        model.provider.shout()
    )
}

/// Best single-line summary of an error response body.
pub fn http_error_summary(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value).filter(|s| !s.is_empty()) {
            return summary;
        }
    }
    if trimmed.is_empty() {
        return format!("HTTP {status}");
    }
    trimmed.chars().take(RAW_BODY_LIMIT).collect()
}

/// Pulls `error.message`, a bare `error` string, or a top-level `message` out
/// of a provider error payload, collapsing whitespace.
pub(crate) fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}
