//! Collaborator seams consumed by the relay core
//!
//! The core never performs I/O directly; the outbound chat client, socket
//! transport, poll creation, and config persistence are injected behind these
//! traits so every component can be exercised with in-memory doubles.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::Result;

/// Outbound platform chat client.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Send `text` to `channel`, returning the platform-issued message id.
    ///
    /// `nonce` is a correlation token echoed back by the platform; `reply_id`
    /// threads the message under an existing one.
    async fn send(
        &self,
        channel: &str,
        text: &str,
        nonce: Option<&str>,
        reply_id: Option<&str>,
    ) -> Result<String>;

    /// Most recent request round-trip to the platform, when known.
    async fn latency(&self) -> Option<Duration> {
        None
    }
}

/// Control surface of the inbound site chat transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    async fn reconnect(&self) -> Result<()>;

    /// Write a raw protocol frame back to the site, e.g. a PONG echo.
    async fn send_frame(&self, text: &str) -> Result<()>;

    /// Most recent ping round-trip on the socket, when known.
    async fn latency(&self) -> Option<Duration> {
        None
    }
}

/// First-party poll creation capability.
#[async_trait]
pub trait PollCreator: Send + Sync {
    /// Create a poll with the given title and choice set; duration and vote
    /// cost are fixed constants owned by the implementation.
    async fn create_poll(&self, title: &str, choices: &[String]) -> Result<()>;
}

/// Persists the bot configuration on demand.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn persist(&self, settings: &Settings) -> Result<()>;
}

/// External pronoun id → display label table.
pub trait PronounDirectory: Send + Sync {
    fn label(&self, id: &str) -> Option<String>;
}
