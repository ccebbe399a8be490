//! Built-in model catalog
//!
//! Models are grouped by provider and loaded from the embedded
//! `builtin_models.toml`. The catalog is fixed for the life of the process.

use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;

/// Backend services that host chat-completion models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenRouter,
    OpenAI,
    Gemini,
    Groq,
    Xai,
}

impl Provider {
    /// Declaration order, used whenever providers are listed.
    pub const ALL: [Provider; 5] = [
        Provider::OpenRouter,
        Provider::OpenAI,
        Provider::Gemini,
        Provider::Groq,
        Provider::Xai,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAI => "openai",
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::Xai => "xai",
        }
    }

    /// Case-insensitive lookup by identifier.
    pub fn from_id(id: &str) -> Option<Provider> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.id().eq_ignore_ascii_case(id.trim()))
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenRouter => "OpenRouter",
            Provider::OpenAI => "OpenAI",
            Provider::Gemini => "Google Gemini",
            Provider::Groq => "Groq",
            Provider::Xai => "xAI (Grok)",
        }
    }

    /// Where a user can create an API key for this provider.
    pub fn key_url(self) -> &'static str {
        match self {
            Provider::OpenRouter => "https://openrouter.ai/keys",
            Provider::OpenAI => "https://platform.openai.com/api-keys",
            Provider::Gemini => "https://aistudio.google.com/apikey",
            Provider::Groq => "https://console.groq.com/keys",
            Provider::Xai => "https://console.x.ai",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Provider::OpenRouter => "Best option: one key unlocks 100+ models (Claude, GPT-4o, Gemini, LLaMA)",
            Provider::OpenAI => "GPT-4o, GPT-4o Mini, o4-mini",
            Provider::Gemini => "Gemini 2.5 Pro, 2.5 Flash, 2.0 Flash (free tier available)",
            Provider::Groq => "Ultra-fast free inference: LLaMA 3.3, Mixtral, Gemma",
            Provider::Xai => "Grok 3, Grok 3 Mini, Grok 2 Vision",
        }
    }

    /// Markdown link to the key page, used in diagnostics.
    pub fn key_link(self) -> String {
        let url = self.key_url();
        format!("[{}]({})", url.trim_start_matches("https://"), url)
    }

    pub fn shout(self) -> String {
        self.id().to_uppercase()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Immutable description of one selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub provider: Provider,
    #[serde(rename = "vision")]
    pub supports_vision: bool,
    #[serde(rename = "fast")]
    pub is_fast: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelGroup {
    pub name: String,
    pub tagline: String,
    pub models: Vec<Model>,
}

impl ModelGroup {
    pub fn provider(&self) -> Option<Provider> {
        self.models.first().map(|model| model.provider)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelCatalog {
    groups: Vec<ModelGroup>,
}

static BUILTIN_CATALOG: LazyLock<ModelCatalog> = LazyLock::new(|| {
    const CATALOG_CONTENT: &str = include_str!("builtin_models.toml");
    ModelCatalog::from_toml(CATALOG_CONTENT).expect("Failed to parse builtin_models.toml")
});

static BUILTIN_DEFAULT_MODEL: LazyLock<&'static Model> = LazyLock::new(|| {
    BUILTIN_CATALOG
        .default_model()
        .expect("builtin_models.toml declares no models")
});

/// Model used when nothing has been selected yet.
pub const DEFAULT_MODEL_ID: &str = "llama-3.3-70b-versatile";

impl ModelCatalog {
    pub fn builtin() -> &'static ModelCatalog {
        &BUILTIN_CATALOG
    }

    /// Default model of the builtin catalog.
    pub fn builtin_default() -> &'static Model {
        *BUILTIN_DEFAULT_MODEL
    }

    /// Builtin model with `id`, or the builtin default when it is unknown.
    pub fn builtin_or_default(id: &str) -> &'static Model {
        Self::builtin().find(id).unwrap_or_else(Self::builtin_default)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn groups(&self) -> &[ModelGroup] {
        &self.groups
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.groups.iter().flat_map(|group| group.models.iter())
    }

    pub fn find(&self, id: &str) -> Option<&Model> {
        self.models().find(|model| model.id == id)
    }

    /// The group that holds the provider's models, if the catalog has any.
    pub fn group_for(&self, provider: Provider) -> Option<&ModelGroup> {
        self.groups
            .iter()
            .find(|group| group.models.iter().any(|model| model.provider == provider))
    }

    /// First model declared in the provider's group.
    pub fn first_for(&self, provider: Provider) -> Option<&Model> {
        self.group_for(provider).and_then(|group| group.models.first())
    }

    /// The stock default model, falling back to the first catalog entry.
    pub fn default_model(&self) -> Option<&Model> {
        self.find(DEFAULT_MODEL_ID).or_else(|| self.models().next())
    }
}
