use serde::{Deserialize, Serialize};

/// Configuration for one live interview session. The prompt strings are
/// opaque to this crate; the host supplies them per category/topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Unique session identifier
    pub session_id: String,

    /// System prompt sent in the setup message
    pub system_prompt: String,

    /// Opening question the assistant speaks first
    pub opening_question: String,

    /// Sample rate of the audio streamed to the live service
    pub sample_rate: u32,

    /// Outbound frame cadence in milliseconds
    pub frame_duration_ms: u64,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            session_id: format!("interview-{}", uuid::Uuid::new_v4()),
            system_prompt: String::new(),
            opening_question: String::new(),
            sample_rate: 16000, // 16kHz PCM expected by the live service
            frame_duration_ms: 100,
        }
    }
}
