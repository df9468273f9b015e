//! Outbound platform REST client
//!
//! Implements the chat-send and poll-creation collaborators over the
//! platform's HTTP API. Send returns the platform-issued message id used for
//! purge correlation. Poll duration and vote cost are fixed constants owned
//! here, not by the relay core.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_POLL_DURATION_SECONDS, DEFAULT_POLL_POINTS_COST};
use crate::error::{ChatMirrorError, Result};

use super::traits::{ChatSender, PollCreator};

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    channel: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parent_message_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    data: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: String,
}

#[derive(Serialize)]
struct PollChoice<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct CreatePollRequest<'a> {
    broadcaster_id: &'a str,
    title: &'a str,
    choices: Vec<PollChoice<'a>>,
    duration_seconds: u32,
    channel_points_voting_enabled: bool,
    channel_points_per_vote: u32,
}

pub struct RestChatClient {
    http: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
    auth_token: String,
    first_party_token: Option<String>,
    broadcaster_id: Option<String>,
    latency: Mutex<Option<Duration>>,
}

impl RestChatClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: Option<String>,
        auth_token: impl Into<String>,
        first_party_token: Option<String>,
        broadcaster_id: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id,
            auth_token: auth_token.into(),
            first_party_token,
            broadcaster_id,
            latency: Mutex::new(None),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        let request = request.bearer_auth(token);
        match &self.client_id {
            Some(client_id) => request.header("Client-Id", client_id),
            None => request,
        }
    }

    fn record_latency(&self, started: Instant) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = Some(started.elapsed());
    }
}

#[async_trait]
impl ChatSender for RestChatClient {
    async fn send(
        &self,
        channel: &str,
        text: &str,
        nonce: Option<&str>,
        reply_id: Option<&str>,
    ) -> Result<String> {
        let body = SendMessageRequest {
            channel,
            message: text,
            nonce,
            reply_parent_message_id: reply_id,
        };

        let started = Instant::now();
        let response = self
            .authorize(
                self.http.post(format!("{}/chat/messages", self.base_url)),
                &self.auth_token,
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatMirrorError::SendError(e.to_string()))?;
        self.record_latency(started);

        if !response.status().is_success() {
            return Err(ChatMirrorError::SendError(format!(
                "chat send returned {}",
                response.status()
            )));
        }

        let parsed: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| ChatMirrorError::SendError(e.to_string()))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|m| m.message_id)
            .ok_or_else(|| ChatMirrorError::SendError("no message id in response".to_string()))
    }

    async fn latency(&self) -> Option<Duration> {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PollCreator for RestChatClient {
    async fn create_poll(&self, title: &str, choices: &[String]) -> Result<()> {
        // Poll creation needs the resolved broadcaster id; without it the
        // call is a silent no-op, matching the relay's best-effort posture.
        let broadcaster_id = match self.broadcaster_id.as_deref() {
            Some(id) => id,
            None => return Ok(()),
        };
        let token = self
            .first_party_token
            .as_deref()
            .unwrap_or(&self.auth_token);

        let body = CreatePollRequest {
            broadcaster_id,
            title,
            choices: choices.iter().map(|c| PollChoice { title: c }).collect(),
            duration_seconds: DEFAULT_POLL_DURATION_SECONDS,
            channel_points_voting_enabled: true,
            channel_points_per_vote: DEFAULT_POLL_POINTS_COST,
        };

        let response = self
            .authorize(self.http.post(format!("{}/polls", self.base_url)), token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatMirrorError::PollError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatMirrorError::PollError(format!(
                "poll creation returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
