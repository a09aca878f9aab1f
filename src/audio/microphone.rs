use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioCaptureBackend, AudioFrame, CaptureConfig};
use super::convert::mix_to_mono;
use crate::error::{SessionError, SessionResult};

/// Process-wide device claim. One session owns the microphone at a time;
/// a second acquire fails fast instead of queuing.
static MIC_CLAIM: AtomicBool = AtomicBool::new(false);

/// Microphone capture backend
///
/// The cpal `Stream` is not `Send`, so it lives on a dedicated capture
/// thread that forwards frames over a channel and parks until stopped.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    capturing: bool,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: false,
            stop_tx: None,
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            return Err(SessionError::DeviceUnavailable(
                "microphone already capturing".into(),
            ));
        }

        if MIC_CLAIM
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::DeviceUnavailable(
                "microphone is held by another session".into(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let frame_duration_ms = self.config.frame_duration_ms.max(10);

        let thread = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                capture_thread_main(frame_tx, ready_tx, stop_rx, frame_duration_ms);
                MIC_CLAIM.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                MIC_CLAIM.store(false, Ordering::SeqCst);
                SessionError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                self.capturing = true;
                info!("Microphone capture started");
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = tokio::task::spawn_blocking(move || thread.join()).await;
                Err(e)
            }
            Err(_) => {
                let _ = tokio::task::spawn_blocking(move || thread.join()).await;
                Err(SessionError::DeviceUnavailable(
                    "capture thread exited before reporting readiness".into(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }

        if self.capturing {
            info!("Microphone capture stopped");
        }
        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

/// Runs on the dedicated capture thread: owns the cpal stream, forwards
/// sliced frames, and exits on stop signal or stream error.
fn capture_thread_main(
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<SessionResult<()>>,
    stop_rx: std_mpsc::Receiver<()>,
    frame_duration_ms: u64,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(SessionError::DeviceUnavailable(
                "no default input device".into(),
            )));
            return;
        }
    };
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(SessionError::DeviceUnavailable(format!(
                "failed to read input config: {}",
                e
            ))));
            return;
        }
    };

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let device_rate = stream_config.sample_rate.0;
    let device_channels = stream_config.channels;
    let frame_samples = (device_rate as u64 * frame_duration_ms / 1000).max(1) as usize;

    let stream_failed = Arc::new(AtomicBool::new(false));
    let failed_flag = Arc::clone(&stream_failed);

    let mut slicer = FrameSlicer::new(frame_tx, device_rate, device_channels, frame_samples);

    let err_fn = move |err| {
        error!("Microphone stream error: {}", err);
        failed_flag.store(true, Ordering::SeqCst);
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                slicer.push(data);
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let i16_data: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                slicer.push(&i16_data);
            },
            err_fn,
            None,
        ),
        other => {
            let _ = ready_tx.send(Err(SessionError::DeviceUnavailable(format!(
                "unsupported sample format: {:?}",
                other
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(SessionError::DeviceUnavailable(format!(
                "failed to build input stream: {}",
                e
            ))));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(SessionError::DeviceUnavailable(format!(
            "failed to start input stream: {}",
            e
        ))));
        return;
    }

    info!(
        "Capturing from '{}' ({}Hz, {} channels)",
        device_name, device_rate, device_channels
    );
    let _ = ready_tx.send(Ok(()));

    // Park until stopped. A stream error closes the frame channel, which the
    // session treats as hardware loss.
    loop {
        match stop_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                if stream_failed.load(Ordering::SeqCst) {
                    warn!("Capture thread exiting after stream error");
                    break;
                }
            }
        }
    }

    drop(stream);
}

/// Accumulates mono samples from the audio callback and emits fixed-size
/// frames. Runs inside the callback: must never block, so full channels
/// drop frames.
struct FrameSlicer {
    frame_tx: mpsc::Sender<AudioFrame>,
    sample_rate: u32,
    channels: u16,
    frame_samples: usize,
    pending: Vec<i16>,
    emitted_ms: u64,
    overflow_warned: bool,
}

impl FrameSlicer {
    fn new(
        frame_tx: mpsc::Sender<AudioFrame>,
        sample_rate: u32,
        channels: u16,
        frame_samples: usize,
    ) -> Self {
        Self {
            frame_tx,
            sample_rate,
            channels,
            frame_samples,
            pending: Vec::with_capacity(frame_samples * 2),
            emitted_ms: 0,
            overflow_warned: false,
        }
    }

    fn push(&mut self, interleaved: &[i16]) {
        let mono = mix_to_mono(interleaved, self.channels);
        self.pending.extend_from_slice(&mono);

        while self.pending.len() >= self.frame_samples {
            let samples: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            let frame = AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                channels: 1,
                timestamp_ms: self.emitted_ms,
            };
            self.emitted_ms += self.frame_samples as u64 * 1000 / self.sample_rate as u64;

            if self.frame_tx.try_send(frame).is_err() && !self.overflow_warned {
                warn!("Audio frame channel full, dropping frames");
                self.overflow_warned = true;
            }
        }
    }
}
