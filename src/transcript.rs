//! Grouping chat transcript messages into one spoken request.
//!
//! A chat UI renders consecutive messages from the same author as one block,
//! and the listen control on any of them should speak the whole block.

use crate::pipeline::SpeechRequest;
use serde::{Deserialize, Serialize};

/// Lifecycle steps that never take part in a spoken group.
const LIFECYCLE_STEPS: &[&str] = &["on_chat_start", "on_message", "on_audio_end"];

/// Step type fragments that mark a message as produced by the assistant.
const ASSISTANT_TYPES: &[&str] = &["llm", "tool", "assistant", "retrieval", "rerank"];

/// Step names that describe internal work rather than the assistant itself.
const INTERNAL_STEP_NAMES: &[&str] = &["herramienta", "razonamiento"];

/// One rendered transcript entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptMessage {
    /// Step or author name.
    pub name: String,
    /// Step type, e.g. `assistant_message` or `tool`.
    pub step_type: String,
    /// Display name set by the assistant, if any.
    pub avatar_name: Option<String>,
    pub output: String,
    /// Still receiving tokens.
    pub streaming: bool,
}

impl TranscriptMessage {
    fn is_lifecycle_step(&self) -> bool {
        LIFECYCLE_STEPS.contains(&self.name.as_str())
    }

    fn is_assistant_type(&self) -> bool {
        ASSISTANT_TYPES.iter().any(|t| self.step_type.contains(t))
    }
}

/// Whether the listen control for `message` should be enabled.
pub fn can_speak(message: &TranscriptMessage) -> bool {
    !message.output.is_empty() && !message.streaming
}

/// Author a message is displayed under.
///
/// Resolution order: the message's own avatar name; for assistant-typed steps,
/// the first avatar name in the transcript, then the step name unless it names
/// internal work, then `assistant_name`; otherwise the step name.
pub fn author_of<'a>(
    message: &'a TranscriptMessage,
    messages: &'a [TranscriptMessage],
    assistant_name: &'a str,
) -> &'a str {
    if let Some(avatar) = message.avatar_name.as_deref() {
        return avatar;
    }
    if message.is_assistant_type() {
        if let Some(avatar) = messages.iter().find_map(|m| m.avatar_name.as_deref()) {
            return avatar;
        }
        let internal = INTERNAL_STEP_NAMES.iter().any(|n| message.name.contains(n));
        if !message.name.is_empty() && !internal {
            return &message.name;
        }
        return assistant_name;
    }
    if message.name.is_empty() {
        assistant_name
    } else {
        &message.name
    }
}

/// Text of the same-author block around `messages[index]`, joined by blank lines.
///
/// Neighbours join the block while they share the author and are not
/// lifecycle steps. Returns `None` when `index` is out of range.
pub fn group_for_speech(
    messages: &[TranscriptMessage],
    index: usize,
    assistant_name: &str,
) -> Option<String> {
    let message = messages.get(index)?;
    let author = author_of(message, messages, assistant_name);
    let joins = |m: &TranscriptMessage| {
        !m.is_lifecycle_step() && author_of(m, messages, assistant_name) == author
    };

    let start = messages[..index]
        .iter()
        .rposition(|m| !joins(m))
        .map_or(0, |i| i + 1);
    let end = messages[index + 1..]
        .iter()
        .position(|m| !joins(m))
        .map_or(messages.len(), |i| index + 1 + i);

    let text = messages[start..end]
        .iter()
        .map(|m| m.output.as_str())
        .filter(|o| !o.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(text)
}

/// Build a request for the block around `messages[index]`.
///
/// Returns `None` if the message cannot be spoken yet.
pub fn speech_request(
    messages: &[TranscriptMessage],
    index: usize,
    assistant_name: &str,
    element_names: impl IntoIterator<Item = String>,
) -> Option<SpeechRequest> {
    if !can_speak(messages.get(index)?) {
        return None;
    }
    let text = group_for_speech(messages, index, assistant_name)?;
    Some(SpeechRequest::new(text).with_element_names(element_names))
}
