//! Inbound site chat websocket transport
//!
//! Owns the socket on a background task and exposes the [`Transport`] control
//! surface through a command channel. Disconnect and reconnect stop dispatch
//! of new frames from this socket; handler tasks already in flight on the
//! worker pool run to completion. A dropped socket is reconnected
//! automatically while a connection is desired.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::constants::WS_PING_PERIOD_SECONDS;
use crate::core::router::MessageRouter;
use crate::error::{ChatMirrorError, Result};

use super::traits::Transport;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

enum Command {
    Connect,
    Disconnect,
    Reconnect,
    Send(String),
}

pub struct SiteTransport {
    url: String,
    ping_period: Duration,
    commands: mpsc::UnboundedSender<Command>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    latency: Mutex<Option<Duration>>,
}

impl SiteTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_ping_period(url, Duration::from_secs(WS_PING_PERIOD_SECONDS))
    }

    pub fn with_ping_period(url: impl Into<String>, ping_period: Duration) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            ping_period,
            commands,
            receiver: Mutex::new(Some(receiver)),
            latency: Mutex::new(None),
        }
    }

    fn submit(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ChatMirrorError::TransportError("transport task stopped".to_string()))
    }

    /// Start the connection loop, feeding inbound text frames to the router.
    ///
    /// May be called once; subsequent calls fail.
    pub fn spawn(self: &Arc<Self>, router: Arc<MessageRouter>) -> Result<JoinHandle<()>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                ChatMirrorError::SystemError("transport loop already started".to_string())
            })?;
        let transport = Arc::clone(self);
        Ok(tokio::spawn(async move {
            transport.run(receiver, router).await;
        }))
    }

    async fn run(&self, mut commands: mpsc::UnboundedReceiver<Command>, router: Arc<MessageRouter>) {
        let mut connect_requested = false;

        loop {
            if !connect_requested {
                match commands.recv().await {
                    None => return,
                    Some(Command::Connect) | Some(Command::Reconnect) => {
                        connect_requested = true;
                    }
                    Some(Command::Disconnect) => {}
                    Some(Command::Send(_)) => {
                        debug!("Dropping outbound frame while disconnected");
                    }
                }
                continue;
            }

            let stream = match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Failed to connect to site chat socket: {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };
            info!("Connected to site chat socket");

            let (mut sink, mut source) = stream.split();
            let mut ping_interval = tokio::time::interval(self.ping_period);
            ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ping_interval.reset();
            let mut last_ping: Option<Instant> = None;

            'session: loop {
                tokio::select! {
                    command = commands.recv() => match command {
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            return;
                        }
                        Some(Command::Disconnect) => {
                            info!("Disconnecting from site chat socket");
                            connect_requested = false;
                            let _ = sink.send(Message::Close(None)).await;
                            break 'session;
                        }
                        Some(Command::Reconnect) => {
                            info!("Reconnecting to site chat socket");
                            let _ = sink.send(Message::Close(None)).await;
                            break 'session;
                        }
                        Some(Command::Connect) => {}
                        Some(Command::Send(text)) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                warn!("Failed to write frame: {}", e);
                                break 'session;
                            }
                        }
                    },
                    frame = source.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            router.route(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            if let Some(sent) = last_ping.take() {
                                *self.latency.lock().unwrap_or_else(PoisonError::into_inner) =
                                    Some(sent.elapsed());
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            warn!("Site chat socket closed");
                            break 'session;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Site chat socket error: {}", e);
                            break 'session;
                        }
                    },
                    _ = ping_interval.tick() => {
                        last_ping = Some(Instant::now());
                        if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                            warn!("Failed to ping site chat socket: {}", e);
                            break 'session;
                        }
                    }
                }
            }

            if connect_requested {
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl Transport for SiteTransport {
    async fn connect(&self) -> Result<()> {
        self.submit(Command::Connect)
    }

    async fn disconnect(&self) -> Result<()> {
        self.submit(Command::Disconnect)
    }

    async fn reconnect(&self) -> Result<()> {
        self.submit(Command::Reconnect)
    }

    async fn send_frame(&self, text: &str) -> Result<()> {
        self.submit(Command::Send(text.to_string()))
    }

    async fn latency(&self) -> Option<Duration> {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
