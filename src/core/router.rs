//! Inbound frame classification and dispatch
//!
//! Each raw transport frame is classified independently and its handler is
//! dispatched onto the shared worker pool; no ordering is guaranteed between
//! frames. Handlers only share state through the recent-id cache and the
//! relay config, both of which are internally synchronized.

use std::sync::Arc;

use log::{debug, trace, warn};
use tokio::task::JoinHandle;

use crate::core::message::{ChatMessage, FrameType, ProtocolFrame};
use crate::core::relay::RelayEngine;
use crate::platform::context::BotContext;

pub struct MessageRouter {
    ctx: Arc<BotContext>,
    relay: Arc<RelayEngine>,
}

impl MessageRouter {
    pub fn new(ctx: Arc<BotContext>, relay: Arc<RelayEngine>) -> Self {
        Self { ctx, relay }
    }

    /// Classify one raw frame and dispatch its handler.
    ///
    /// Returns the handle of the spawned handler task, or `None` when the
    /// frame was malformed, carries no handler, or the pool rejected the
    /// task. Malformed frames are dropped silently.
    pub fn route(&self, raw: &str) -> Option<JoinHandle<()>> {
        let frame = ProtocolFrame::parse(raw)?;

        match frame.frame_type {
            FrameType::Msg | FrameType::Broadcast | FrameType::Ban | FrameType::Mute => {
                self.dispatch_payload(frame.frame_type, frame.payload, raw)
            }
            FrameType::Ping => {
                let transport = self.ctx.transport.clone();
                let payload = frame.payload.to_string();
                self.ctx.pool.execute(async move {
                    if let Err(e) = transport.send_frame(&format!("PONG {}", payload)).await {
                        warn!("Failed to answer ping: {}", e);
                    }
                })
            }
            FrameType::Refresh => {
                let transport = self.ctx.transport.clone();
                self.ctx.pool.execute(async move {
                    if let Err(e) = transport.reconnect().await {
                        warn!("Failed to reconnect transport: {}", e);
                    }
                })
            }
            FrameType::Aware
            | FrameType::Unban
            | FrameType::Unmute
            | FrameType::Names
            | FrameType::Join
            | FrameType::Quit => {
                trace!("Ignoring message: {}", raw);
                None
            }
            FrameType::Unknown => {
                debug!("Unrecognized frame type: {}", raw);
                None
            }
        }
    }

    fn dispatch_payload(
        &self,
        frame_type: FrameType,
        payload: &str,
        raw: &str,
    ) -> Option<JoinHandle<()>> {
        let relay = self.relay.clone();
        let payload = payload.to_string();
        let raw = raw.to_string();

        self.ctx.pool.execute(async move {
            let parsed = match serde_json::from_str::<ChatMessage>(&payload) {
                Ok(message) => message,
                Err(e) => match frame_type {
                    // Moderation frames may carry the bare target name
                    // instead of a JSON body.
                    FrameType::Ban | FrameType::Mute => ChatMessage {
                        data: payload.trim().to_string(),
                        nick: None,
                        sub: None,
                        features: None,
                        pronouns: None,
                        timestamp: None,
                    },
                    _ => {
                        warn!("Failed to parse socket message: {}: {}", raw, e);
                        return;
                    }
                },
            };
            trace!("Received message: {}", payload);

            match frame_type {
                FrameType::Msg => relay.handle_message(parsed).await,
                FrameType::Broadcast => relay.handle_broadcast(parsed).await,
                // Ban and Mute both drain the named user's relayed ids.
                _ => relay.handle_purge(parsed).await,
            }
        })
    }
}
