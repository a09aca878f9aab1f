use std::time::Duration;

use chrono::{DateTime, Utc};

use super::turns::Turn;
use crate::audio::RawAudioArtifact;

/// Everything a finished session hands back to the host: the ordered turn
/// sequence for the analysis service and the sealed recording for durable
/// storage.
#[derive(Debug, Clone)]
pub struct InterviewOutcome {
    /// Finalized turns in order
    pub turns: Vec<Turn>,
    /// Plain-text transcript, one "Speaker: text" line per turn
    pub transcript: String,
    /// Sealed raw microphone recording
    pub audio: RawAudioArtifact,
    /// Wall-clock session duration
    pub duration: Duration,
    /// When the session started
    pub started_at: DateTime<Utc>,
}
