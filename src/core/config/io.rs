use crate::core::chat::Chat;
use crate::core::config::data::{path_display, Settings};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

const SETTINGS_FILE: &str = "settings.json";
const CHATS_FILE: &str = "chats.json";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BEESTO_DATA_DIR";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not determine a data directory; pass --data-dir or set {}", DATA_DIR_ENV)]
    NoDataDir,

    #[error("failed to access {}: {source}", path_display(.path))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode {}: {source}", path_display(.path))]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Directory holding `settings.json` and `chats.json`.
#[derive(Debug, Clone)]
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `override_dir`, then `BEESTO_DATA_DIR`, then the platform data dir.
    pub fn open_default(override_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let proj_dirs = ProjectDirs::from("ai", "beesto", "beesto").ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(proj_dirs.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn chats_path(&self) -> PathBuf {
        self.dir.join(CHATS_FILE)
    }

    /// Missing or unreadable settings yield the defaults.
    pub fn load_settings(&self) -> Settings {
        load_or_default(&self.settings_path())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        write_json_atomic(&self.settings_path(), settings)
    }

    /// Missing or unreadable history yields an empty list.
    pub fn load_chats(&self) -> Vec<Chat> {
        load_or_default(&self.chats_path())
    }

    pub fn save_chats(&self, chats: &[Chat]) -> Result<(), StoreError> {
        write_json_atomic(&self.chats_path(), chats)
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path_display(path), "no stored file, using defaults");
            return T::default();
        }
        Err(err) => {
            warn!(path = %path_display(path), error = %err, "failed to read stored file");
            return T::default();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|err| {
        warn!(path = %path_display(path), error = %err, "stored file is corrupt, using defaults");
        T::default()
    })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let contents = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let mut temp_file = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(io_err)?;

    temp_file.write_all(contents.as_bytes()).map_err(io_err)?;
    temp_file.as_file_mut().sync_all().map_err(io_err)?;
    temp_file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
