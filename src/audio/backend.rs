use tokio::sync::mpsc;

use crate::error::SessionResult;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for the capture pipeline
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate of the encoded frames sent to the live service
    pub target_sample_rate: u32,
    /// Channel count of the encoded frames (1 = mono)
    pub target_channels: u16,
    /// Duration of each outbound frame in milliseconds
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz PCM expected by the live service
            target_channels: 1,        // Mono
            frame_duration_ms: 100,    // ~100ms cadence
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - `MicrophoneBackend`: cpal input device on a dedicated thread
/// - Test fakes that count start/stop calls and feed scripted frames
#[async_trait::async_trait]
pub trait AudioCaptureBackend: Send {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive raw audio frames. The
    /// channel closing while the session is still active signals hardware
    /// loss and is treated as fatal by the session controller. Fails with
    /// `DeviceUnavailable` if the device cannot be opened or is already held.
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the hardware stream. Idempotent.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
