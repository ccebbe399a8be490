//! Line-oriented interactive chat on stdin/stdout.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use directories::BaseDirs;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::chats::print_chat_line;
use crate::cli::say::{print_last_message, stream_turn};
use crate::core::message::Attachment;
use crate::core::session::{ChatSession, TurnOutcome};

const HELP: &str = "\
/new              Start a new conversation
/regen            Regenerate the last reply
/attach <path>    Attach a file to the next message
/model [id]       Show or switch the model
/chats            List conversations
/open <id>        Open a conversation
/quit             Exit
Ctrl+C stops a reply that is streaming; when idle it exits.";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Empty,
    Message(String),
    New,
    Regenerate,
    Attach(String),
    Model(Option<String>),
    Chats,
    Open(String),
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    fn parse(line: &str) -> ReplCommand {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ReplCommand::Message(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match (name, argument) {
            ("new", _) => ReplCommand::New,
            ("regen" | "regenerate", _) => ReplCommand::Regenerate,
            ("attach", Some(path)) => ReplCommand::Attach(path),
            ("model", argument) => ReplCommand::Model(argument),
            ("chats", _) => ReplCommand::Chats,
            ("open", Some(id)) => ReplCommand::Open(id),
            ("help" | "?", _) => ReplCommand::Help,
            ("quit" | "exit" | "q", _) => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

pub async fn run_chat(mut session: ChatSession) -> Result<(), Box<dyn Error>> {
    let mut rx = session.subscribe();
    let generation = session.generation();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<Attachment> = Vec::new();

    let model = session.model();
    println!("🐝 Beesto · {} ({})", model.display_name, model.id);
    println!("Type /help for commands.");

    loop {
        print_prompt(pending.len())?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::New => {
                let chat = session.new_chat();
                println!("🆕 Started {}", chat.id);
            }
            ReplCommand::Regenerate => {
                let outcome =
                    stream_turn(session.regenerate_last_turn(), &mut rx, &generation).await?;
                if outcome == TurnOutcome::Ignored {
                    println!("Nothing to regenerate.");
                }
                report(&session, outcome);
            }
            ReplCommand::Attach(path) => match Attachment::from_path(&expand_home(&path)) {
                Ok(attachment) => {
                    println!("📎 Attached {} ({})", attachment.name, attachment.mime_type);
                    pending.push(attachment);
                }
                Err(err) => eprintln!("❌ {err}"),
            },
            ReplCommand::Model(None) => {
                let model = session.model();
                println!("🎯 {} ({})", model.display_name, model.id);
            }
            ReplCommand::Model(Some(id)) => match session.select_model(&id) {
                Some(model) => println!("🎯 Switched to {} ({})", model.display_name, model.id),
                None => eprintln!("❌ Unknown model '{id}'. Run 'beesto models' to list them."),
            },
            ReplCommand::Chats => {
                let current = session.chats().current_id().map(str::to_owned);
                for chat in session.search_chats("") {
                    print_chat_line(chat, current.as_deref() == Some(chat.id.as_str()));
                }
            }
            ReplCommand::Open(id) => {
                if session.select_chat(&id) {
                    println!("📂 Opened {id}");
                } else {
                    eprintln!("❌ No conversation with id '{id}'.");
                }
            }
            ReplCommand::Unknown(command) => {
                eprintln!("❌ Unknown command: {command}. Type /help for commands.")
            }
            ReplCommand::Message(text) => {
                let attachments = std::mem::take(&mut pending);
                let outcome =
                    stream_turn(session.send_user_turn(&text, attachments), &mut rx, &generation)
                        .await?;
                report(&session, outcome);
            }
        }
    }

    Ok(())
}

/// Resolves a leading `~` to the home directory. Other paths are used as typed.
fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => PathBuf::from(path),
    }
}

fn print_prompt(attachments: usize) -> io::Result<()> {
    let mut stdout = io::stdout();
    if attachments > 0 {
        write!(stdout, "[{attachments} 📎] > ")?;
    } else {
        write!(stdout, "> ")?;
    }
    stdout.flush()
}

fn report(session: &ChatSession, outcome: TurnOutcome) {
    match outcome {
        TurnOutcome::EmptyReply | TurnOutcome::MissingCredential | TurnOutcome::Failed => {
            print_last_message(session)
        }
        TurnOutcome::Busy => eprintln!("⏳ A reply is still being generated."),
        TurnOutcome::Replied | TurnOutcome::Cancelled | TurnOutcome::Ignored => {}
    }
}
