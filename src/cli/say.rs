//! One-shot commands that stream a single reply to stdout.

use std::error::Error;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::core::chat_stream::StreamMessage;
use crate::core::generation::GenerationState;
use crate::core::message::Attachment;
use crate::core::session::{ChatSession, TurnOutcome};

pub async fn run_say(
    mut session: ChatSession,
    prompt: Vec<String>,
    attach: Vec<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let attachments = attach
        .iter()
        .map(|path| Attachment::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    session.new_chat();
    let mut rx = session.subscribe();
    let generation = session.generation();
    let outcome = stream_turn(
        session.send_user_turn(&prompt, attachments),
        &mut rx,
        &generation,
    )
    .await?;
    finish(&session, outcome)
}

pub async fn run_regenerate(mut session: ChatSession) -> Result<(), Box<dyn Error>> {
    let mut rx = session.subscribe();
    let generation = session.generation();
    let outcome = stream_turn(session.regenerate_last_turn(), &mut rx, &generation).await?;
    if outcome == TurnOutcome::Ignored {
        return Err("The current conversation does not end with a reply to regenerate.".into());
    }
    finish(&session, outcome)
}

fn finish(session: &ChatSession, outcome: TurnOutcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        TurnOutcome::Replied | TurnOutcome::Cancelled | TurnOutcome::Ignored => Ok(()),
        TurnOutcome::EmptyReply => {
            print_last_message(session);
            Ok(())
        }
        TurnOutcome::Busy => Err("A reply is already being generated.".into()),
        TurnOutcome::MissingCredential | TurnOutcome::Failed => {
            if let Some(message) = session.last_message() {
                eprintln!("{}", message.content);
            }
            std::process::exit(1);
        }
    }
}

pub(crate) fn print_last_message(session: &ChatSession) {
    if let Some(message) = session.last_message() {
        println!("{}", message.content);
    }
}

/// Drives a send or regenerate future while printing deltas as they arrive.
/// Ctrl+C stops the generation instead of killing the process.
pub(crate) async fn stream_turn(
    turn: impl Future<Output = TurnOutcome>,
    rx: &mut mpsc::UnboundedReceiver<StreamMessage>,
    generation: &GenerationState,
) -> io::Result<TurnOutcome> {
    tokio::pin!(turn);
    let mut stdout = io::stdout();
    let mut printed = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            Some(message) = rx.recv() => {
                if let StreamMessage::Chunk(text) = message {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                    printed = true;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                generation.stop();
            }
        }
    };

    while let Ok(message) = rx.try_recv() {
        if let StreamMessage::Chunk(text) = message {
            write!(stdout, "{text}")?;
            printed = true;
        }
    }
    if printed {
        writeln!(stdout)?;
    }
    if outcome == TurnOutcome::Cancelled {
        eprintln!("⏹  Stopped");
    }
    Ok(outcome)
}
