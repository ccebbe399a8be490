use crate::core::catalog::DEFAULT_MODEL_ID;
use crate::core::credentials::CredentialStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Beesto AI, a highly capable, friendly, and \
articulate AI assistant. Provide clear, accurate, and well-formatted responses. Use markdown \
for code blocks, tables, and lists when it adds clarity.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::System => "system",
        }
    }

    /// Flips between dark and light. `System` first resolves through the
    /// caller's preference.
    pub fn toggle(self, system_prefers_dark: bool) -> Theme {
        let effective = match self {
            Theme::System if system_prefers_dark => Theme::Dark,
            Theme::System => Theme::Light,
            other => other,
        };
        match effective {
            Theme::Dark => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "system" => Ok(Theme::System),
            other => Err(format!("unknown theme '{other}' (expected dark, light or system)")),
        }
    }
}

/// Everything in `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub credentials: CredentialStore,
    pub system_prompt: String,
    pub selected_model_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            credentials: CredentialStore::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            selected_model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }
}

/// Shortens paths under the home directory to `~/...` for display.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
