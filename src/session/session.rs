use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::InterviewConfig;
use super::outcome::InterviewOutcome;
use super::turns::{Speaker, Turn, TurnReconciler};
use crate::audio::{AudioCaptureBackend, CaptureConfig, CaptureUnit};
use crate::error::{SessionError, SessionResult};
use crate::live::wire::{AudioChunkMessage, ClientMessage, SetupMessage};
use crate::live::{classify, ChannelFrame, InboundEvent, LiveChannel};

/// Lifecycle of one interview session. Terminal states are `Closed`
/// (success) and `Failed` (error or cancel); a session object is one-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Finishing,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Finishing => "finishing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State shared between the controller and its spawned tasks. All mutation
/// of the partial buffers and the turn sequence goes through the reconciler
/// mutex, so writes are serialized regardless of which producer fires.
struct Shared {
    session_id: String,
    state: Mutex<SessionState>,
    reconciler: Mutex<TurnReconciler>,
    last_error: Mutex<Option<SessionError>>,
    /// Cleared on finish/cancel/failure; the outbound task checks it per frame.
    active: AtomicBool,
}

impl Shared {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            state: Mutex::new(SessionState::Idle),
            reconciler: Mutex::new(TurnReconciler::new()),
            last_error: Mutex::new(None),
            active: AtomicBool::new(false),
        }
    }

    fn state(&self) -> SessionState {
        self.state.lock().map(|s| *s).unwrap_or(SessionState::Failed)
    }

    /// Apply a transition if it is legal; illegal requests are dropped with
    /// a warning (the public operations guard before calling this, so a drop
    /// here means two exit paths raced and the first one won).
    fn transition(&self, to: SessionState) -> bool {
        let Ok(mut current) = self.state.lock() else {
            return false;
        };

        let valid = matches!(
            (*current, to),
            (SessionState::Idle, SessionState::Connecting)
                | (SessionState::Connecting, SessionState::Active)
                | (SessionState::Connecting, SessionState::Failed)
                | (SessionState::Active, SessionState::Finishing)
                | (SessionState::Active, SessionState::Failed)
                | (SessionState::Finishing, SessionState::Closed)
        );

        if !valid {
            warn!(
                "Session {}: ignoring transition {} -> {}",
                self.session_id, *current, to
            );
            return false;
        }

        info!("Session {}: {} -> {}", self.session_id, *current, to);
        *current = to;
        true
    }

    /// Record a component failure and move to `Failed` if the session is
    /// still running. Returns false when a terminal state was already
    /// reached (late errors after finish/cancel are logged, not acted on).
    fn mark_failed(&self, err: SessionError) -> bool {
        if !self.transition(SessionState::Failed) {
            debug!(
                "Session {}: late component error ignored: {}",
                self.session_id, err
            );
            return false;
        }

        error!("Session {} failed: {}", self.session_id, err);
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(err);
        }
        self.active.store(false, Ordering::SeqCst);
        true
    }
}

/// The session controller: the single entry point the host drives.
///
/// Owns the capture unit and the live channel (constructor-injected so tests
/// substitute fakes), enforces the state machine, and guarantees every exit
/// path releases the device and the connection.
pub struct InterviewSession {
    config: InterviewConfig,
    shared: Arc<Shared>,
    capture: Arc<tokio::sync::Mutex<CaptureUnit>>,
    channel: Option<Box<dyn LiveChannel>>,
    outbound_task: Option<JoinHandle<()>>,
    inbound_task: Option<JoinHandle<()>>,
    supervisor_task: Option<JoinHandle<()>>,
    playback_rx: Option<mpsc::Receiver<Vec<u8>>>,
    started: Option<(Instant, DateTime<Utc>)>,
}

impl InterviewSession {
    pub fn new(
        config: InterviewConfig,
        capture_backend: Box<dyn AudioCaptureBackend>,
        channel: Box<dyn LiveChannel>,
    ) -> Self {
        let capture_config = CaptureConfig {
            target_sample_rate: config.sample_rate,
            target_channels: 1,
            frame_duration_ms: config.frame_duration_ms,
        };

        Self {
            shared: Arc::new(Shared::new(config.session_id.clone())),
            capture: Arc::new(tokio::sync::Mutex::new(CaptureUnit::new(
                capture_backend,
                capture_config,
            ))),
            channel: Some(channel),
            config,
            outbound_task: None,
            inbound_task: None,
            supervisor_task: None,
            playback_rx: None,
            started: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    /// Acquire the microphone and open the live connection concurrently,
    /// then start streaming. Valid only from `Idle`; either collaborator
    /// failing tears down the other and lands the session in `Failed`.
    pub async fn start(&mut self) -> SessionResult<()> {
        self.guard(SessionState::Idle, "start")?;
        self.shared.transition(SessionState::Connecting);

        let mut channel = self
            .channel
            .take()
            .ok_or_else(|| SessionError::Transport("live channel already consumed".into()))?;

        let setup = SetupMessage {
            system_prompt: self.config.system_prompt.clone(),
            opening_question: self.config.opening_question.clone(),
            input_sample_rate: self.config.sample_rate,
        };

        info!("Session {}: starting", self.config.session_id);

        let (frames, events) = {
            let mut capture = self.capture.lock().await;
            let (capture_res, open_res) = tokio::join!(capture.acquire(), channel.open(setup));

            match (capture_res, open_res) {
                (Ok(frames), Ok(events)) => (frames, events),
                (Ok(_), Err(e)) => {
                    let _ = capture.stop().await;
                    self.shared.mark_failed(e.clone());
                    return Err(e);
                }
                (Err(e), Ok(_)) => {
                    let _ = channel.close().await;
                    self.shared.mark_failed(e.clone());
                    return Err(e);
                }
                (Err(e), Err(open_err)) => {
                    warn!(
                        "Session {}: connect also failed during device failure: {}",
                        self.config.session_id, open_err
                    );
                    self.shared.mark_failed(e.clone());
                    return Err(e);
                }
            }
        };

        self.shared.active.store(true, Ordering::SeqCst);

        let (failure_tx, failure_rx) = mpsc::channel::<SessionError>(4);
        let (playback_tx, playback_rx) = mpsc::channel::<Vec<u8>>(32);
        self.playback_rx = Some(playback_rx);

        self.outbound_task = Some(self.spawn_outbound(channel, frames, failure_tx.clone()));
        self.inbound_task = Some(self.spawn_inbound(events, playback_tx, failure_tx.clone()));
        self.supervisor_task = Some(self.spawn_supervisor(failure_rx));
        drop(failure_tx);

        self.started = Some((Instant::now(), Utc::now()));
        self.shared.transition(SessionState::Active);

        Ok(())
    }

    /// Outbound producer: encoded capture frames to the live service. Closes
    /// the channel (graceful drain) when the frame stream ends.
    fn spawn_outbound(
        &self,
        mut channel: Box<dyn LiveChannel>,
        mut frames: mpsc::Receiver<Vec<u8>>,
        failure_tx: mpsc::Sender<SessionError>,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let sample_rate = self.config.sample_rate;

        tokio::spawn(async move {
            debug!("Outbound audio task started");
            let mut send_failed = false;

            while let Some(pcm) = frames.recv().await {
                if !shared.active.load(Ordering::SeqCst) {
                    break;
                }

                let message =
                    ClientMessage::RealtimeAudio(AudioChunkMessage::from_pcm(&pcm, sample_rate));

                if let Err(e) = channel.send(message).await {
                    let _ = failure_tx.send(e).await;
                    send_failed = true;
                    break;
                }
            }

            // The frame stream closing while the session is still active
            // means the capture side died (device unplugged, stream error).
            if !send_failed && shared.active.load(Ordering::SeqCst) {
                let _ = failure_tx
                    .send(SessionError::DeviceUnavailable(
                        "capture stream ended unexpectedly".into(),
                    ))
                    .await;
            }

            let _ = channel.close().await;
            debug!("Outbound audio task stopped");
        })
    }

    /// Inbound consumer: channel frames through the demultiplexer into the
    /// reconciler; synthesized audio forwarded to the host's playback
    /// receiver (dropped if unconsumed).
    fn spawn_inbound(
        &self,
        mut events: mpsc::Receiver<ChannelFrame>,
        playback_tx: mpsc::Sender<Vec<u8>>,
        failure_tx: mpsc::Sender<SessionError>,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            debug!("Inbound event task started");

            while let Some(frame) = events.recv().await {
                let raw = match frame {
                    ChannelFrame::Message(raw) => raw,
                    ChannelFrame::Fault(msg) => {
                        let _ = failure_tx.send(SessionError::Transport(msg)).await;
                        break;
                    }
                };

                match classify(&raw) {
                    InboundEvent::UserPartial(text) => {
                        if let Ok(mut reconciler) = shared.reconciler.lock() {
                            reconciler.on_partial(Speaker::User, text);
                        }
                    }
                    InboundEvent::AssistantPartial(text) => {
                        if let Ok(mut reconciler) = shared.reconciler.lock() {
                            reconciler.on_partial(Speaker::Assistant, text);
                        }
                    }
                    InboundEvent::TurnComplete { user, assistant } => {
                        if let Ok(mut reconciler) = shared.reconciler.lock() {
                            let finalized = reconciler
                                .on_turn_complete(user.as_deref(), assistant.as_deref());
                            for turn in finalized {
                                info!(
                                    "Session {}: turn {} finalized ({}: \"{}\")",
                                    shared.session_id,
                                    turn.ordinal,
                                    turn.speaker.label(),
                                    turn.text
                                );
                            }
                        }
                    }
                    InboundEvent::Audio(bytes) => {
                        // Playback is the host's concern; never block on it.
                        let _ = playback_tx.try_send(bytes);
                    }
                    InboundEvent::ServiceError(message) => {
                        let _ = failure_tx.send(SessionError::Transport(message)).await;
                        break;
                    }
                    InboundEvent::Ignored => {}
                }
            }

            debug!("Inbound event task stopped");
        })
    }

    /// Waits for the first component failure and tears down whatever is
    /// still running, so one dead collaborator never leaves the other live.
    fn spawn_supervisor(&self, mut failure_rx: mpsc::Receiver<SessionError>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let capture = Arc::clone(&self.capture);

        tokio::spawn(async move {
            if let Some(err) = failure_rx.recv().await {
                if shared.mark_failed(err) {
                    let mut capture = capture.lock().await;
                    if let Err(e) = capture.stop().await {
                        warn!("Session {}: capture stop after failure: {}", shared.session_id, e);
                    }
                }
            }
        })
    }

    /// Stop capture, drain and close the connection, seal the recording.
    /// Valid only from `Active`.
    pub async fn finish(&mut self) -> SessionResult<InterviewOutcome> {
        self.guard(SessionState::Active, "finish")?;
        self.shared.transition(SessionState::Finishing);
        self.shared.active.store(false, Ordering::SeqCst);

        info!("Session {}: finishing", self.config.session_id);

        // Stopping capture ends the frame stream; the outbound task then
        // closes the channel with drain semantics, which in turn ends the
        // inbound stream once every delivered event is processed.
        {
            let mut capture = self.capture.lock().await;
            capture.stop().await?;
        }

        for task in [
            self.outbound_task.take(),
            self.inbound_task.take(),
            self.supervisor_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            if let Err(e) = task.await {
                error!("Session {}: task panicked: {}", self.config.session_id, e);
            }
        }

        let audio = {
            let capture = self.capture.lock().await;
            capture
                .recording()
                .map_err(|e| SessionError::Transport(format!("failed to seal recording: {}", e)))?
        };

        let (turns, transcript) = self.snapshot_turns();
        let (duration, started_at) = match self.started {
            Some((t0, at)) => (t0.elapsed(), at),
            None => (std::time::Duration::ZERO, Utc::now()),
        };

        self.shared.transition(SessionState::Closed);
        info!(
            "Session {}: closed ({} turns, {:.1}s)",
            self.config.session_id,
            turns.len(),
            duration.as_secs_f64()
        );

        Ok(InterviewOutcome {
            turns,
            transcript,
            audio,
            duration,
            started_at,
        })
    }

    /// Best-effort immediate teardown: aborts the streaming tasks (dropping
    /// the connection, no drain), releases the device, lands in `Failed`.
    /// Never blocks on the network.
    pub async fn cancel(&mut self) -> SessionResult<()> {
        let state = self.state();
        if !matches!(state, SessionState::Connecting | SessionState::Active) {
            return Err(SessionError::InvalidState { op: "cancel", state });
        }

        info!("Session {}: cancelled", self.config.session_id);
        self.shared.active.store(false, Ordering::SeqCst);

        let tasks: Vec<_> = [
            self.outbound_task.take(),
            self.inbound_task.take(),
            self.supervisor_task.take(),
        ]
        .into_iter()
        .flatten()
        .collect();

        // Abort first, then reap: awaiting an aborted task only waits for
        // its future to be dropped, which releases the connection without
        // touching the network.
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }

        {
            let mut capture = self.capture.lock().await;
            let _ = capture.stop().await;
        }

        self.shared.transition(SessionState::Failed);
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Current in-progress text for a speaker. Non-blocking snapshot; stays
    /// readable after failure so the host may preserve partial progress.
    pub fn partial(&self, speaker: Speaker) -> Option<String> {
        self.shared
            .reconciler
            .lock()
            .ok()
            .and_then(|r| r.partial(speaker).map(str::to_string))
    }

    /// Snapshot of the finalized turn sequence.
    pub fn turns(&self) -> Vec<Turn> {
        self.shared
            .reconciler
            .lock()
            .map(|r| r.turns().to_vec())
            .unwrap_or_default()
    }

    /// Plain-text transcript of the finalized turns so far.
    pub fn transcript(&self) -> String {
        self.shared
            .reconciler
            .lock()
            .map(|r| r.transcript())
            .unwrap_or_default()
    }

    /// The error that moved the session to `Failed`, if any. `None` after
    /// `cancel()`, which is host-initiated rather than a component failure.
    pub fn last_error(&self) -> Option<SessionError> {
        self.shared.last_error.lock().ok().and_then(|e| e.clone())
    }

    /// Take the synthesized-audio playback receiver. Available once, after
    /// `start()`; chunks are dropped if the host never consumes them.
    pub fn playback(&mut self) -> Option<mpsc::Receiver<Vec<u8>>> {
        self.playback_rx.take()
    }

    fn guard(&self, expected: SessionState, op: &'static str) -> SessionResult<()> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState { op, state })
        }
    }

    fn snapshot_turns(&self) -> (Vec<Turn>, String) {
        self.shared
            .reconciler
            .lock()
            .map(|r| (r.turns().to_vec(), r.transcript()))
            .unwrap_or_default()
    }
}
