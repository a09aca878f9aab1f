pub mod backend;
pub mod capture;
pub mod convert;
pub mod microphone;
pub mod recording;

pub use backend::{AudioCaptureBackend, AudioFrame, CaptureConfig};
pub use capture::CaptureUnit;
pub use microphone::MicrophoneBackend;
pub use recording::{RawAudioArtifact, RecordingBuffer};
