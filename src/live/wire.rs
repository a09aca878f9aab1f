//! Message shapes of the live inference wire protocol.
//!
//! The remote schema is a versioned contract owned by the service. It is
//! isolated here (and in `demux`) so a schema change never touches the
//! session controller or the turn reconciler.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Outbound messages. Externally tagged: `{"setup": {...}}`,
/// `{"realtimeAudio": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(SetupMessage),
    RealtimeAudio(AudioChunkMessage),
}

/// First message on every connection: interview configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub system_prompt: String,
    pub opening_question: String,
    pub input_sample_rate: u32,
}

/// One encoded microphone frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunkMessage {
    pub mime_type: String,
    /// Base64-encoded little-endian PCM16
    pub data: String,
}

impl AudioChunkMessage {
    pub fn from_pcm(pcm: &[u8], sample_rate: u32) -> Self {
        Self {
            mime_type: format!("audio/pcm;rate={}", sample_rate),
            data: base64::engine::general_purpose::STANDARD.encode(pcm),
        }
    }
}

/// Inbound message: a bag of optional fields, any subset may be present.
/// Fields this core does not know about are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    /// Partial transcript of the user's speech (cumulative full-so-far text)
    pub input_transcription: Option<Transcription>,
    /// Partial transcript of the assistant's speech (cumulative)
    pub output_transcription: Option<Transcription>,
    /// Turn boundary, optionally carrying the finalized text per speaker
    pub turn_complete: Option<TurnCompleteMessage>,
    /// Synthesized speech for playback, passed through untouched
    pub audio: Option<AudioPayload>,
    /// Service-reported error
    pub error: Option<ErrorMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transcription {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurnCompleteMessage {
    pub user_text: Option<String>,
    pub assistant_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioPayload {
    /// Base64-encoded audio bytes
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorMessage {
    pub message: String,
}
