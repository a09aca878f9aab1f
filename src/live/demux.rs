//! Classifies raw inbound messages into the closed internal event set.

use base64::Engine;

use super::wire::ServerMessage;

/// The demultiplexer's unit of work. Consumed immediately by the session's
/// inbound task, never buffered beyond the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Cumulative partial transcript of the user's current utterance
    UserPartial(String),
    /// Cumulative partial transcript of the assistant's current utterance
    AssistantPartial(String),
    /// Turn boundary with optional finalized text per speaker
    TurnComplete {
        user: Option<String>,
        assistant: Option<String>,
    },
    /// Synthesized speech bytes, passed through to the host for playback
    Audio(Vec<u8>),
    /// Error reported by the service or a malformed message. Fatal.
    ServiceError(String),
    /// Recognized as valid wire traffic this core does not act on
    Ignored,
}

/// Classify one raw text frame. Pure and total: never panics, any shape the
/// channel can deliver maps to a variant. Unparseable JSON is a protocol
/// violation and classifies as `ServiceError`; valid JSON carrying nothing
/// this core acts on classifies as `Ignored`.
pub fn classify(raw: &str) -> InboundEvent {
    let message: ServerMessage = match serde_json::from_str(raw) {
        Ok(m) => m,
        Err(e) => return InboundEvent::ServiceError(format!("malformed server message: {}", e)),
    };

    if let Some(err) = message.error {
        return InboundEvent::ServiceError(err.message);
    }

    if let Some(transcription) = message.input_transcription {
        return InboundEvent::UserPartial(transcription.text);
    }

    if let Some(transcription) = message.output_transcription {
        return InboundEvent::AssistantPartial(transcription.text);
    }

    if let Some(turn) = message.turn_complete {
        return InboundEvent::TurnComplete {
            user: turn.user_text,
            assistant: turn.assistant_text,
        };
    }

    if let Some(audio) = message.audio {
        return match base64::engine::general_purpose::STANDARD.decode(audio.data) {
            Ok(bytes) => InboundEvent::Audio(bytes),
            // Undecodable playback audio is not worth failing a session over
            Err(_) => InboundEvent::Ignored,
        };
    }

    InboundEvent::Ignored
}
