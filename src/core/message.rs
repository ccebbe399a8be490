use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest file accepted as an attachment.
pub const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// A file attached to a user message. Exactly one of `image_data` and
/// `text_content` is set, decided by the MIME type when the file is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64 image payload, without the `data:` prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("\"{name}\" exceeds 20 MB")]
    TooLarge { name: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Attachment {
    pub fn image(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            image_data: Some(BASE64.encode(bytes)),
            text_content: None,
        }
    }

    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: "text/plain".to_string(),
            image_data: None,
            text_content: Some(content.into()),
        }
    }

    /// Reads a file from disk, encoding images and decoding everything else as
    /// text.
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let read_error = |source| AttachmentError::Read {
            path: path.to_path_buf(),
            source,
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size = fs::metadata(path).map_err(read_error)?.len();
        if size > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge { name });
        }

        let bytes = fs::read(path).map_err(read_error)?;
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("text/plain");
        if mime_type.starts_with("image/") {
            Ok(Self::image(name, mime_type, &bytes))
        } else {
            Ok(Self {
                name,
                mime_type: mime_type.to_string(),
                image_data: None,
                text_content: Some(String::from_utf8_lossy(&bytes).into_owned()),
            })
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/") && self.image_data.is_some()
    }

    pub fn is_text(&self) -> bool {
        self.text_content.is_some()
    }

    /// `data:` URL for an image attachment.
    pub fn data_url(&self) -> Option<String> {
        self.image_data
            .as_ref()
            .map(|data| format!("data:{};base64,{}", self.mime_type, data))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Display name of the model that produced an assistant reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments,
            model: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            model: Some(model.into()),
            timestamp: Utc::now(),
        }
    }

    /// App-authored assistant message (diagnostics, placeholders).
    pub fn diagnostic(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            model: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}
