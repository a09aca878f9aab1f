use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioCaptureBackend, CaptureConfig};
use super::convert::encode_wire_frame;
use super::recording::{RawAudioArtifact, RecordingBuffer};
use crate::error::{SessionError, SessionResult};

/// Owns the capture backend and produces two independent outputs from one
/// microphone stream: encoded frames for the live service, and the raw
/// recording kept for durable storage. Failure of the wire consumer never
/// affects the recording and vice versa.
pub struct CaptureUnit {
    backend: Box<dyn AudioCaptureBackend>,
    config: CaptureConfig,
    recording: Arc<Mutex<RecordingBuffer>>,
    tee_task: Option<JoinHandle<()>>,
    acquired: bool,
}

impl CaptureUnit {
    pub fn new(backend: Box<dyn AudioCaptureBackend>, config: CaptureConfig) -> Self {
        let recording = Arc::new(Mutex::new(RecordingBuffer::new(
            config.target_sample_rate,
            config.target_channels,
        )));

        Self {
            backend,
            config,
            recording,
            tee_task: None,
            acquired: false,
        }
    }

    /// Acquire the device and start streaming. Returns the receiver of
    /// encoded wire frames (~one per `frame_duration_ms`). A second acquire
    /// while the device is held fails fast.
    pub async fn acquire(&mut self) -> SessionResult<mpsc::Receiver<Vec<u8>>> {
        if self.acquired {
            return Err(SessionError::DeviceUnavailable(
                "capture unit already holds the device".into(),
            ));
        }

        let mut raw_rx = self.backend.start().await?;
        self.acquired = true;

        let (encoded_tx, encoded_rx) = mpsc::channel(32);
        let recording = Arc::clone(&self.recording);
        let target_rate = self.config.target_sample_rate;

        // Tee task: every raw frame is appended to the recording, then
        // encoded and forwarded to the transport consumer.
        self.tee_task = Some(tokio::spawn(async move {
            debug!("Capture tee task started");

            while let Some(frame) = raw_rx.recv().await {
                if let Ok(mut buffer) = recording.lock() {
                    buffer.append(&frame);
                }

                let encoded = encode_wire_frame(&frame, target_rate);
                if encoded_tx.send(encoded).await.is_err() {
                    // Wire consumer is gone; keep recording until stop().
                    break;
                }
            }

            // Consumer still listening: drain remaining raw frames into the
            // recording so nothing captured before stop() is lost.
            while let Some(frame) = raw_rx.recv().await {
                if let Ok(mut buffer) = recording.lock() {
                    buffer.append(&frame);
                }
            }

            debug!("Capture tee task stopped");
        }));

        info!("Capture unit acquired '{}'", self.backend.name());

        Ok(encoded_rx)
    }

    /// Release the hardware stream and join the tee task. Safe to call
    /// multiple times and from any internal state, including after a
    /// partially failed acquire.
    pub async fn stop(&mut self) -> SessionResult<()> {
        self.backend.stop().await?;

        if let Some(task) = self.tee_task.take() {
            let _ = task.await;
        }

        self.acquired = false;
        Ok(())
    }

    /// Seal and return the accumulated raw recording. Idempotent; safe to
    /// call after `stop()`.
    pub fn recording(&self) -> Result<RawAudioArtifact> {
        let mut buffer = self
            .recording
            .lock()
            .map_err(|_| anyhow::anyhow!("recording buffer poisoned"))?;
        buffer.seal()
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }
}
