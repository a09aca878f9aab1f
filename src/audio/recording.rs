use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use super::backend::AudioFrame;

/// The sealed microphone recording for a whole session, independent of the
/// encoding streamed to the live service. Immutable after sealing; ownership
/// transfers to the host for upload to durable storage.
#[derive(Debug, Clone)]
pub struct RawAudioArtifact {
    /// Complete WAV payload
    pub bytes: Vec<u8>,
    /// Total captured duration
    pub duration: Duration,
    /// Payload mime type
    pub mime_type: &'static str,
    /// Sample rate of the payload
    pub sample_rate: u32,
    /// Channel count of the payload
    pub channels: u16,
}

/// Accumulates raw captured samples and seals them into a `RawAudioArtifact`
/// exactly once. Appends after sealing are dropped.
#[derive(Debug)]
pub struct RecordingBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    sealed: Option<RawAudioArtifact>,
}

impl RecordingBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
            sealed: None,
        }
    }

    /// Append one captured frame. The first frame fixes the recording format;
    /// later frames are assumed to match (one device, one stream).
    pub fn append(&mut self, frame: &AudioFrame) {
        if self.sealed.is_some() {
            warn!("Dropping audio frame appended after recording was sealed");
            return;
        }

        if self.samples.is_empty() {
            self.sample_rate = frame.sample_rate;
            self.channels = frame.channels;
        }

        self.samples.extend_from_slice(&frame.samples);
    }

    /// Total captured duration so far.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        Duration::from_micros(frames * 1_000_000 / self.sample_rate as u64)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.is_some()
    }

    /// Seal the buffer into a WAV artifact. Idempotent: the first call builds
    /// and caches the artifact, later calls return the same one.
    pub fn seal(&mut self) -> Result<RawAudioArtifact> {
        if let Some(artifact) = &self.sealed {
            return Ok(artifact.clone());
        }

        let mut payload = Vec::new();
        {
            let spec = hound::WavSpec {
                channels: self.channels.max(1),
                sample_rate: self.sample_rate.max(1),
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };

            let mut writer = hound::WavWriter::new(Cursor::new(&mut payload), spec)
                .context("Failed to create WAV writer")?;

            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }

            writer.finalize().context("Failed to finalize WAV payload")?;
        }

        let artifact = RawAudioArtifact {
            bytes: payload,
            duration: self.duration(),
            mime_type: "audio/wav",
            sample_rate: self.sample_rate.max(1),
            channels: self.channels.max(1),
        };

        self.sealed = Some(artifact.clone());
        Ok(artifact)
    }
}
