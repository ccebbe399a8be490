//! Turns a stored conversation into the message list sent to a provider.
//!
//! Providers reject image parts for models without vision support, and expect
//! either a string or an array of parts for `content`. User turns are
//! therefore sent as parts only when they carry images and the model can read
//! them; every other turn is flattened into one string.

use crate::api::{ChatMessage, ContentPart};
use crate::core::catalog::Model;
use crate::core::message::{Attachment, Message};

pub fn build_api_messages(
    messages: &[Message],
    system_prompt: &str,
    model: &Model,
) -> Vec<ChatMessage> {
    let mut api_messages = Vec::with_capacity(messages.len() + 1);

    if !system_prompt.is_empty() {
        api_messages.push(ChatMessage::text("system", system_prompt));
    }

    for message in messages {
        if message.is_assistant() {
            api_messages.push(ChatMessage::text("assistant", message.content.clone()));
        } else {
            api_messages.push(build_user_message(message, model));
        }
    }

    api_messages
}

fn build_user_message(message: &Message, model: &Model) -> ChatMessage {
    let images: Vec<&Attachment> = message.attachments.iter().filter(|a| a.is_image()).collect();
    let texts: Vec<&Attachment> = message.attachments.iter().filter(|a| a.is_text()).collect();

    if !images.is_empty() && model.supports_vision {
        let mut parts = Vec::with_capacity(1 + images.len() + texts.len());
        if !message.content.is_empty() {
            parts.push(ContentPart::text(message.content.clone()));
        }
        parts.extend(
            images
                .iter()
                .filter_map(|image| image.data_url())
                .map(ContentPart::image),
        );
        parts.extend(texts.iter().map(|file| ContentPart::text(file_block(file))));
        return ChatMessage::parts("user", parts);
    }

    let mut content = message.content.clone();
    for file in &texts {
        content.push_str(&file_block(file));
    }
    for image in &images {
        content.push_str(&format!(
            "\n\n[Image: {} - switch to a Vision model to analyse images]",
            image.name
        ));
    }
    ChatMessage::text("user", content)
}

fn file_block(file: &Attachment) -> String {
    format!(
        "\n\n[File: {}]\n```\n{}\n```",
        file.name,
        file.text_content.as_deref().unwrap_or_default()
    )
}
