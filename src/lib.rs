pub mod audio;
pub mod config;
pub mod error;
pub mod live;
pub mod session;

pub use audio::{
    AudioCaptureBackend, AudioFrame, CaptureConfig, CaptureUnit, MicrophoneBackend,
    RawAudioArtifact, RecordingBuffer,
};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use live::{
    classify, ChannelFrame, ClientMessage, InboundEvent, LiveChannel, LiveServiceConfig,
    ServerMessage, SetupMessage, WebSocketChannel,
};
pub use session::{
    InterviewConfig, InterviewOutcome, InterviewSession, SessionState, Speaker, Turn,
    TurnReconciler,
};
