use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::wire::{ClientMessage, SetupMessage};
use crate::error::{SessionError, SessionResult};

type WsSink = futures::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    tungstenite::Message,
>;

/// One unit of inbound delivery. `Message` frames arrive exactly once, in
/// order; a `Fault` means the connection failed mid-session and delivery may
/// have been truncated.
#[derive(Debug, Clone)]
pub enum ChannelFrame {
    Message(String),
    Fault(String),
}

/// A single bidirectional streaming connection to the live inference
/// service. One connection per session, one attempt, no reconnect; retry
/// policy belongs to the host above the session controller.
#[async_trait::async_trait]
pub trait LiveChannel: Send {
    /// Establish the connection and send the setup message. Returns the
    /// receiver of inbound frames. Fails with `ConnectFailed` on network or
    /// auth rejection; never retries silently.
    async fn open(&mut self, setup: SetupMessage) -> SessionResult<mpsc::Receiver<ChannelFrame>>;

    /// Transmit one outbound message. Fails with `SendAfterClose` once the
    /// channel has been closed.
    async fn send(&mut self, message: ClientMessage) -> SessionResult<()>;

    /// Terminate the connection. Idempotent. Frames received before close
    /// are all forwarded before this returns (graceful drain); no frame is
    /// delivered afterwards.
    async fn close(&mut self) -> SessionResult<()>;

    fn is_open(&self) -> bool;

    /// Get channel name for logging
    fn name(&self) -> &str;
}

/// Connection parameters for the websocket live endpoint.
#[derive(Debug, Clone)]
pub struct LiveServiceConfig {
    pub url: String,
    pub api_key: String,
}

/// Websocket implementation of `LiveChannel`.
pub struct WebSocketChannel {
    config: LiveServiceConfig,
    sink: Option<WsSink>,
    reader: Option<JoinHandle<()>>,
    closed: bool,
}

impl WebSocketChannel {
    pub fn new(config: LiveServiceConfig) -> Self {
        Self {
            config,
            sink: None,
            reader: None,
            closed: false,
        }
    }

    fn build_request(&self) -> SessionResult<tungstenite::http::Request<()>> {
        tungstenite::http::Request::builder()
            .uri(&self.config.url)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("x-api-key", &self.config.api_key)
            .body(())
            .map_err(|e| SessionError::ConnectFailed(format!("invalid request: {}", e)))
    }
}

#[async_trait::async_trait]
impl LiveChannel for WebSocketChannel {
    async fn open(&mut self, setup: SetupMessage) -> SessionResult<mpsc::Receiver<ChannelFrame>> {
        if self.sink.is_some() || self.closed {
            return Err(SessionError::ConnectFailed(
                "channel already used; sessions are one-shot".into(),
            ));
        }

        let request = self.build_request()?;

        info!("Connecting to live service at {}", self.config.url);

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| SessionError::ConnectFailed(e.to_string()))?;

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let setup_json = serde_json::to_string(&ClientMessage::Setup(setup))
            .map_err(|e| SessionError::ConnectFailed(format!("failed to encode setup: {}", e)))?;

        ws_tx
            .send(tungstenite::Message::Text(setup_json))
            .await
            .map_err(|e| SessionError::ConnectFailed(format!("failed to send setup: {}", e)))?;

        let (frame_tx, frame_rx) = mpsc::channel(64);

        // Reader task: the single producer behind the inbound receiver.
        // Forwards text frames in arrival order until close, server
        // disconnect, or a transport fault.
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(tungstenite::Message::Text(text)) => {
                        if frame_tx.send(ChannelFrame::Message(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(tungstenite::Message::Close(frame)) => {
                        debug!("Live service closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Websocket receive error: {}", e);
                        let _ = frame_tx.send(ChannelFrame::Fault(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        self.sink = Some(ws_tx);
        self.reader = Some(reader);

        info!("Live service connection established");

        Ok(frame_rx)
    }

    async fn send(&mut self, message: ClientMessage) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::SendAfterClose);
        }

        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| SessionError::Transport("channel not open".into()))?;

        let json = serde_json::to_string(&message)
            .map_err(|e| SessionError::Transport(format!("failed to encode message: {}", e)))?;

        sink.send(tungstenite::Message::Text(json))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(mut sink) = self.sink.take() {
            let _ = sink.send(tungstenite::Message::Close(None)).await;
            let _ = sink.close().await;
        }

        // Drain: the reader forwards everything received before the close
        // handshake completes, then exits. Joining it guarantees no delivery
        // after close() returns.
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }

        info!("Live service connection closed");

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.sink.is_some() && !self.closed
    }

    fn name(&self) -> &str {
        "websocket live channel"
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        // Dropped without close() on the cancel path: tear down immediately,
        // no drain.
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
