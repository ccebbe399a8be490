//! `beesto chats` subcommands.

use std::error::Error;

use crate::cli::ChatsCommands;
use crate::core::chat::Chat;
use crate::core::config::data::path_display;
use crate::core::session::ChatSession;

pub fn run_chats(
    session: &mut ChatSession,
    command: Option<ChatsCommands>,
) -> Result<(), Box<dyn Error>> {
    match command.unwrap_or(ChatsCommands::List { query: None }) {
        ChatsCommands::List { query } => {
            let query = query.unwrap_or_default();
            let current = session.chats().current_id().map(str::to_owned);
            let matches = session.search_chats(&query);
            if matches.is_empty() {
                println!("No conversations found.");
            }
            for chat in matches {
                print_chat_line(chat, current.as_deref() == Some(chat.id.as_str()));
            }
        }
        ChatsCommands::Export { path } => {
            session.export_chats(&path)?;
            println!(
                "✅ Exported {} conversations to {}",
                session.chats().chats().len(),
                path_display(&path)
            );
        }
        ChatsCommands::Delete { id } => {
            if !session.delete_chat(&id) {
                return Err(format!("No conversation with id '{id}'.").into());
            }
            println!("✅ Deleted {id}");
        }
        ChatsCommands::Clear => {
            session.clear_chats();
            println!("✅ Deleted every conversation");
        }
    }
    Ok(())
}

pub(crate) fn print_chat_line(chat: &Chat, is_current: bool) {
    let marker = if is_current { "▶" } else { " " };
    println!(
        "{marker} {}  {}  ({} messages, {})",
        chat.id,
        chat.title,
        chat.messages.len(),
        chat.updated_at.format("%Y-%m-%d %H:%M")
    );
}
