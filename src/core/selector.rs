//! Default model selection based on which providers have usable keys.

use crate::core::catalog::{Model, ModelCatalog, Provider};
use crate::core::credentials::CredentialStore;

/// Providers tried, in order, when the current model cannot be used.
pub const SELECTION_PRIORITY: [Provider; 5] = [
    Provider::OpenRouter,
    Provider::OpenAI,
    Provider::Gemini,
    Provider::Groq,
    Provider::Xai,
];

/// Picks the model the next request should use.
///
/// The current model is kept while its provider is usable. Otherwise the
/// first model of the highest-priority usable provider wins. With no usable
/// provider at all the current model is returned unchanged and the missing
/// key is reported when the user sends.
pub fn select_default<'a>(
    current: &'a Model,
    credentials: &CredentialStore,
    catalog: &'a ModelCatalog,
) -> &'a Model {
    if credentials.is_usable(current.provider) {
        return current;
    }

    SELECTION_PRIORITY
        .iter()
        .filter(|provider| credentials.is_usable(**provider))
        .find_map(|provider| catalog.first_for(*provider))
        .unwrap_or(current)
}
