use super::data::{Settings, Theme, DEFAULT_SYSTEM_PROMPT};
use super::io::DataStore;
use crate::core::catalog::Provider;
use crate::core::chat::Chat;
use crate::core::message::Message;
use std::fs;
use tempfile::TempDir;

#[test]
fn missing_files_load_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DataStore::new(temp_dir.path().join("nested"));

    let settings = store.load_settings();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(settings.selected_model_id, "llama-3.3-70b-versatile");
    assert!(store.load_chats().is_empty());
}

#[test]
fn settings_round_trip_through_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DataStore::new(temp_dir.path().join("data"));

    let mut settings = Settings {
        theme: Theme::Light,
        system_prompt: "Be brief.".to_string(),
        selected_model_id: "gpt-4o-mini".to_string(),
        ..Default::default()
    };
    settings.credentials.set(Provider::OpenAI, "sk-abcdefghijk");
    store.save_settings(&settings).expect("save failed");

    let raw = fs::read_to_string(store.settings_path()).expect("read failed");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["theme"], "light");
    assert_eq!(value["credentials"]["openai"], "sk-abcdefghijk");
    assert_eq!(value["selected_model_id"], "gpt-4o-mini");

    assert_eq!(store.load_settings(), settings);
}

#[test]
fn partial_settings_fill_in_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DataStore::new(temp_dir.path());
    fs::write(store.settings_path(), r#"{"theme":"system"}"#).expect("write failed");

    let settings = store.load_settings();
    assert_eq!(settings.theme, Theme::System);
    assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
}

#[test]
fn corrupt_files_fall_back_to_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DataStore::new(temp_dir.path());
    fs::write(store.settings_path(), "{not json").expect("write failed");
    fs::write(store.chats_path(), "[1, 2").expect("write failed");

    assert_eq!(store.load_settings(), Settings::default());
    assert!(store.load_chats().is_empty());
}

#[test]
fn chats_round_trip_and_overwrite() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DataStore::new(temp_dir.path());

    let mut chat = Chat::new("c_1");
    chat.push(Message::user("hello", Vec::new()));
    chat.push(Message::assistant("hi", "LLaMA 3.3 70B"));
    store.save_chats(&[chat.clone()]).expect("save failed");

    let loaded = store.load_chats();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "c_1");
    assert_eq!(loaded[0].messages.len(), 2);
    assert_eq!(loaded[0].messages[1].model.as_deref(), Some("LLaMA 3.3 70B"));

    store.save_chats(&[]).expect("second save failed");
    assert!(store.load_chats().is_empty());
}

#[test]
fn override_dir_wins() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = DataStore::open_default(Some(temp_dir.path().to_path_buf())).expect("open failed");
    assert_eq!(store.dir(), temp_dir.path());
}

#[test]
fn theme_toggle_and_parse() {
    assert_eq!(Theme::Dark.toggle(true), Theme::Light);
    assert_eq!(Theme::Light.toggle(true), Theme::Dark);
    assert_eq!(Theme::System.toggle(true), Theme::Light);
    assert_eq!(Theme::System.toggle(false), Theme::Dark);
    assert_eq!(" Light ".parse::<Theme>(), Ok(Theme::Light));
    assert!("sepia".parse::<Theme>().is_err());
}
