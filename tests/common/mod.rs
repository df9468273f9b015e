//! Shared in-memory collaborators for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chat_mirror::config::Settings;
use chat_mirror::core::recent_ids::RecentIdCache;
use chat_mirror::core::worker_pool::create_worker_pool;
use chat_mirror::core::{CommandDispatcher, MessageRouter, RelayEngine};
use chat_mirror::error::Result;
use chat_mirror::platform::traits::{ChatSender, ConfigStore, PollCreator, Transport};
use chat_mirror::platform::{BotContext, StaticPronouns};

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub text: String,
    pub nonce: Option<String>,
}

#[derive(Default)]
pub struct MockSender {
    pub sent: Mutex<Vec<Sent>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl ChatSender for MockSender {
    async fn send(
        &self,
        _channel: &str,
        text: &str,
        nonce: Option<&str>,
        _reply_id: Option<&str>,
    ) -> Result<String> {
        self.sent.lock().unwrap().push(Sent {
            text: text.to_string(),
            nonce: nonce.map(str::to_string),
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("id-{}", id))
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub reconnects: AtomicUsize,
    pub frames: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
    async fn reconnect(&self) -> Result<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    async fn send_frame(&self, text: &str) -> Result<()> {
        self.frames.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPolls {
    pub created: Mutex<Vec<String>>,
}

#[async_trait]
impl PollCreator for MockPolls {
    async fn create_poll(&self, title: &str, _choices: &[String]) -> Result<()> {
        self.created.lock().unwrap().push(title.to_string());
        Ok(())
    }
}

pub struct NoopStore;

#[async_trait]
impl ConfigStore for NoopStore {
    async fn persist(&self, _settings: &Settings) -> Result<()> {
        Ok(())
    }
}

pub struct Harness {
    pub ctx: Arc<BotContext>,
    pub router: MessageRouter,
    pub dispatcher: CommandDispatcher,
    pub sender: Arc<MockSender>,
    pub transport: Arc<MockTransport>,
    pub polls: Arc<MockPolls>,
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.channel_name = "somechannel".to_string();
    settings.auth_token = Some("tok".to_string());
    settings.chat_socket_url = "wss://example.test/ws".to_string();
    settings.first_party_token = Some("fp".to_string());
    settings
}

pub fn harness(settings: Settings) -> Harness {
    let sender = Arc::new(MockSender::default());
    let transport = Arc::new(MockTransport::default());
    let polls = Arc::new(MockPolls::default());
    let ctx = Arc::new(BotContext::new(
        settings,
        Arc::new(RecentIdCache::new()),
        sender.clone(),
        transport.clone(),
        polls.clone(),
        Arc::new(StaticPronouns::new()),
        Arc::new(NoopStore),
        create_worker_pool(200),
    ));
    let relay = Arc::new(RelayEngine::new(ctx.clone()));
    let router = MessageRouter::new(ctx.clone(), relay.clone());
    let dispatcher = CommandDispatcher::new(ctx.clone(), relay);
    Harness {
        ctx,
        router,
        dispatcher,
        sender,
        transport,
        polls,
    }
}
