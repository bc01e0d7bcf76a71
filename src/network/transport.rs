use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::common::{TransportCommand, TransportEvent};
use crate::error::ChatResult;

use super::codec;

const CHANNEL_CAPACITY: usize = 100;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Both ends a chat session holds on its (exclusively owned) transport.
pub struct TransportHandle {
    pub commands: mpsc::Sender<TransportCommand>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens a fresh transport for one mounted session.
pub trait TransportFactory: Send + Sync {
    fn open(&self, token: &str) -> TransportHandle;
}

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// WebSocket transport speaking the JSON frames in [`codec`].
pub struct WsConnector {
    url: String,
    policy: ReconnectPolicy,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }
}

impl TransportFactory for WsConnector {
    fn open(&self, token: &str) -> TransportHandle {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let socket = SocketTask {
            url: self.url.clone(),
            token: token.to_string(),
            policy: self.policy,
            commands: command_rx,
            events: event_tx,
            reported_up: None,
        };
        tokio::spawn(socket.run());

        TransportHandle {
            commands: command_tx,
            events: event_rx,
        }
    }
}

enum PumpOutcome {
    /// Close was requested (or the session is gone).
    Closed,
    Dropped(String),
}

struct SocketTask {
    url: String,
    token: String,
    policy: ReconnectPolicy,
    commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
    /// Last connection state told to the session, to avoid repeating it.
    reported_up: Option<bool>,
}

impl SocketTask {
    async fn run(mut self) {
        log::info!("Chat socket task started for {}", self.url);
        let mut attempt = 0u32;

        loop {
            let connected = tokio::select! {
                result = connect(&self.url, &self.token) => result,
                _ = wait_for_close(&mut self.commands) => {
                    log::info!("Chat socket closed while connecting");
                    return;
                }
            };

            match connected {
                Ok(stream) => {
                    attempt = 0;
                    log::info!("Chat socket connected to {}", self.url);
                    if !self.report(true).await {
                        return;
                    }
                    match self.pump(stream).await {
                        PumpOutcome::Closed => {
                            log::info!("Chat socket closed");
                            return;
                        }
                        PumpOutcome::Dropped(reason) => {
                            log::warn!("Chat socket dropped: {reason}");
                        }
                    }
                }
                Err(err) => {
                    log::warn!("Chat socket connect to {} failed: {err}", self.url);
                }
            }

            if !self.report(false).await {
                return;
            }

            attempt += 1;
            if !self.policy.allows(attempt) {
                log::error!("Chat socket giving up after {} attempts", attempt - 1);
                return;
            }
            let delay = self.policy.delay_for(attempt);
            log::info!("Reconnecting chat socket in {}ms", delay.as_millis());
            if self.sleep_unless_closed(delay).await {
                return;
            }
        }
    }

    /// Returns `false` once nobody is listening anymore.
    async fn report(&mut self, up: bool) -> bool {
        if self.reported_up == Some(up) {
            return true;
        }
        self.reported_up = Some(up);
        let event = if up {
            TransportEvent::Connected
        } else {
            TransportEvent::Disconnected
        };
        self.events.send(event).await.is_ok()
    }

    async fn pump(&mut self, stream: WsStream) -> PumpOutcome {
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(TransportCommand::Emit(event)) => match codec::encode(&event) {
                        Ok(frame) => {
                            if let Err(err) = sink.send(WsMessage::Text(frame)).await {
                                return PumpOutcome::Dropped(err.to_string());
                            }
                        }
                        Err(err) => log::warn!("Failed to encode {event:?}: {err}"),
                    },
                    Some(TransportCommand::Close) | None => {
                        if let Err(err) = sink.close().await {
                            log::debug!("Close handshake failed: {err}");
                        }
                        return PumpOutcome::Closed;
                    }
                },
                frame = source.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => match codec::decode(&text) {
                        Ok(event) => {
                            if self.events.send(TransportEvent::Server(event)).await.is_err() {
                                return PumpOutcome::Closed;
                            }
                        }
                        Err(err) => log::debug!("Ignoring chat frame ({err}): {text}"),
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        return PumpOutcome::Dropped(format!("server closed ({frame:?})"));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return PumpOutcome::Dropped(err.to_string()),
                    None => return PumpOutcome::Dropped("stream ended".to_string()),
                },
            }
        }
    }

    /// Waits out a backoff delay. Returns `true` if close was requested.
    async fn sleep_unless_closed(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep_until(Instant::now() + delay) => false,
            _ = wait_for_close(&mut self.commands) => true,
        }
    }
}

async fn connect(url: &str, token: &str) -> ChatResult<WsStream> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    let (stream, _response) = connect_async(request).await?;
    Ok(stream)
}

/// Drains commands while the socket is down; emits cannot be delivered.
async fn wait_for_close(commands: &mut mpsc::Receiver<TransportCommand>) {
    loop {
        match commands.recv().await {
            Some(TransportCommand::Emit(event)) => {
                log::warn!("Chat socket is down, dropping {event:?}");
            }
            Some(TransportCommand::Close) | None => return,
        }
    }
}
