//! Command-line interface parsing and dispatch.

pub mod chat;
pub mod chats;
pub mod model_list;
pub mod say;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cli::chat::run_chat;
use crate::cli::chats::run_chats;
use crate::cli::model_list::list_models;
use crate::cli::say::{run_regenerate, run_say};
use crate::core::catalog::Provider;
use crate::core::config::{DataStore, Theme};
use crate::core::session::ChatSession;
use crate::core::transport::HttpTransport;
use crate::utils::logging;

#[derive(Parser)]
#[command(name = "beesto")]
#[command(version)]
#[command(about = "Streaming chat with OpenRouter, OpenAI, Gemini, Groq and xAI models")]
#[command(
    long_about = "Beesto streams replies from several chat-completion providers. Store one key \
per provider with 'beesto key'; when the selected model's provider has no key, Beesto switches \
to a model from a provider that does.\n\n\
Environment Variables:\n\
  BEESTO_DATA_DIR   Directory for settings.json and chats.json\n\
  BEESTO_LOG        Log filter (e.g. debug, beesto=trace)\n\n\
Chat commands:\n\
  /new              Start a new conversation\n\
  /regen            Regenerate the last reply\n\
  /attach <path>    Attach a file to the next message\n\
  /model <id>       Switch model\n\
  /chats            List conversations\n\
  /open <id>        Open a conversation\n\
  /quit             Exit\n\
  Ctrl+C            Stop the reply being generated, or exit when idle"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding settings and chat history
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Model to use for this run (see 'beesto models')
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Send one message and stream the reply
    Say {
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
        /// File to attach (repeatable)
        #[arg(short = 'a', long = "attach", value_name = "PATH")]
        attach: Vec<PathBuf>,
    },
    /// Regenerate the last reply of the current conversation
    Regenerate,
    /// List available models
    Models,
    /// Store an API key for a provider; omit the value to remove it
    Key {
        provider: String,
        value: Option<String>,
    },
    /// Change a setting
    Set {
        #[command(subcommand)]
        setting: SetCommands,
    },
    /// Manage saved conversations
    Chats {
        #[command(subcommand)]
        command: Option<ChatsCommands>,
    },
}

#[derive(Subcommand)]
pub enum SetCommands {
    /// Replace the system prompt (empty to disable it)
    SystemPrompt {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// dark, light, system or toggle
    Theme { theme: String },
    /// Remember a model as the selection
    Model { id: String },
}

#[derive(Subcommand)]
pub enum ChatsCommands {
    /// List conversations, optionally filtered by title
    List { query: Option<String> },
    /// Write every conversation to a JSON file
    Export { path: PathBuf },
    /// Delete one conversation
    Delete { id: String },
    /// Delete every conversation
    Clear,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let mut session = open_session(&args)?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(session).await,
        Commands::Say { prompt, attach } => run_say(session, prompt, attach).await,
        Commands::Regenerate => run_regenerate(session).await,
        Commands::Models => {
            list_models(&session);
            Ok(())
        }
        Commands::Key { provider, value } => {
            let provider = parse_provider(&provider)?;
            let value = value.unwrap_or_default();
            let model = session.set_credential(provider, &value);
            if value.trim().is_empty() {
                println!("✅ Removed the {} key", provider.display_name());
            } else if session.settings().credentials.is_usable(provider) {
                println!("✅ Saved the {} key", provider.display_name());
            } else {
                println!(
                    "⚠️  Saved the {} key, but it looks too short to be valid",
                    provider.display_name()
                );
            }
            println!("🎯 Selected model: {} ({})", model.display_name, model.id);
            Ok(())
        }
        Commands::Set { setting } => run_set(&mut session, setting),
        Commands::Chats { command } => run_chats(&mut session, command),
    }
}

fn open_session(args: &Args) -> Result<ChatSession, Box<dyn Error>> {
    let store = DataStore::open_default(args.data_dir.clone())?;
    let transport = Arc::new(HttpTransport::default());
    let mut session = ChatSession::open(store, transport);

    if let Some(id) = args.model.as_deref() {
        if session.override_model(id).is_none() {
            return Err(format!("Unknown model '{id}'. Run 'beesto models' to list them.").into());
        }
    }
    Ok(session)
}

fn parse_provider(id: &str) -> Result<Provider, Box<dyn Error>> {
    Provider::from_id(id).ok_or_else(|| {
        let known: Vec<&str> = Provider::ALL.iter().map(|p| p.id()).collect();
        format!("Unknown provider '{id}'. Expected one of: {}", known.join(", ")).into()
    })
}

fn run_set(session: &mut ChatSession, setting: SetCommands) -> Result<(), Box<dyn Error>> {
    match setting {
        SetCommands::SystemPrompt { prompt } => {
            session.set_system_prompt(&prompt.join(" "));
            if session.settings().system_prompt.is_empty() {
                println!("✅ System prompt disabled");
            } else {
                println!("✅ System prompt updated");
            }
        }
        SetCommands::Theme { theme } => {
            let theme = if theme.eq_ignore_ascii_case("toggle") {
                session.toggle_theme(true)
            } else {
                let theme: Theme = theme.parse()?;
                session.set_theme(theme);
                theme
            };
            println!("✅ Theme set to {theme}");
        }
        SetCommands::Model { id } => match session.select_model(&id) {
            Some(model) => {
                println!("✅ Selected {} ({})", model.display_name, model.id);
                if !session.settings().credentials.is_usable(model.provider) {
                    println!(
                        "⚠️  No {} key yet. Add one with: beesto key {} <your-key>",
                        model.provider.display_name(),
                        model.provider.id()
                    );
                }
            }
            None => {
                return Err(
                    format!("Unknown model '{id}'. Run 'beesto models' to list them.").into(),
                )
            }
        },
    }
    Ok(())
}
