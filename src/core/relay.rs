//! Relay business rules
//!
//! Applies the filtering and formatting rules to decoded chat messages,
//! mirrors broadcasts, and services moderation purges. Every outbound text
//! passes through the command-stripping safeguard unless the call site
//! explicitly marks the send as an allowed platform action.

use std::sync::Arc;

use log::{debug, trace, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::constants::{
    ACTION_PREFIX, BROADCAST_NOOP_SENTINEL, DEFAULT_POLL_CHOICES, DELETE_COMMAND,
    MAX_MESSAGE_LENGTH, NONCE_LENGTH, TRUNCATION_MARKER, VOTE_COMMAND_PREFIX,
};
use crate::core::message::ChatMessage;
use crate::platform::context::BotContext;

/// Character that opens a platform command; mirrored content must never
/// start with it unless the send is an explicit action.
const PLATFORM_COMMAND_CHAR: char = '/';
const SITE_COMMAND_CHAR: char = '!';

pub struct RelayEngine {
    ctx: Arc<BotContext>,
}

impl RelayEngine {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    /// Relay a standard chat message, subject to the configured filters.
    pub async fn handle_message(&self, message: ChatMessage) {
        let config = &self.ctx.config;

        let nick = match message.nick.as_deref() {
            Some(nick) => nick,
            None => return, // cannot attribute or format
        };
        if config.ignore_bots() && message.is_bot() {
            return;
        }
        if config.subs_only() && !message.is_privileged() {
            return;
        }

        if message.data.starts_with(PLATFORM_COMMAND_CHAR)
            || message.data.starts_with(SITE_COMMAND_CHAR)
        {
            self.handle_chat_command(&message).await;
            return;
        }

        let required = config.required_any_features();
        if !required.is_empty() {
            let has_any = message
                .features
                .as_ref()
                .map(|features| features.iter().any(|f| required.contains(f)))
                .unwrap_or(false);
            if !has_any {
                trace!("Dropping message from {} lacking required features", nick);
                return;
            }
        }

        let pronoun = if config.include_pronouns() {
            message
                .pronouns
                .as_deref()
                .and_then(|id| self.ctx.pronouns.label(id))
                .map(|label| format!(" ({})", label))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let postfix = config.message_postfix();
        let assembled = format!(
            "{} {}{}: {}",
            config.message_prefix(),
            nick,
            pronoun,
            message.data
        );
        let limit = MAX_MESSAGE_LENGTH.saturating_sub(postfix.chars().count());
        let mut text: String = assembled.trim().chars().take(limit).collect();
        text.push_str(&postfix);

        let nonce = format!(
            "{}:{}",
            nick,
            message
                .timestamp
                .map(|t| t.to_string())
                .unwrap_or_else(|| generate_nonce(NONCE_LENGTH))
        );

        if let Some(message_id) = self.send_chat(&text, Some(&nonce), None, false).await {
            self.ctx.recent_ids.record_id(nick, message_id);
        }
    }

    /// Mirror a site broadcast as a platform action message.
    pub async fn handle_broadcast(&self, message: ChatMessage) {
        if !self.ctx.config.mirror_broadcasts() {
            return;
        }
        if message.data.starts_with(PLATFORM_COMMAND_CHAR) {
            return;
        }
        if message.data == BROADCAST_NOOP_SENTINEL {
            return;
        }

        let mut text = format!("{}{}", ACTION_PREFIX, message.data);
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            text = text.chars().take(MAX_MESSAGE_LENGTH - 1).collect();
            text.push(TRUNCATION_MARKER);
        }

        // Action prefix is the one permitted leading slash.
        self.send_chat(&text, None, None, true).await;
    }

    /// Purge everything the bot relayed for the user named by the frame body.
    pub async fn handle_purge(&self, message: ChatMessage) {
        self.purge_user(message.data.trim()).await;
    }

    /// Drain the user's recorded ids and issue one deletion per id.
    ///
    /// Best-effort: an id recorded by a racing relay send after the drain
    /// snapshot is simply picked up by the next purge.
    pub async fn purge_user(&self, name: &str) {
        if name.is_empty() {
            return;
        }

        let ids = self.ctx.recent_ids.drain(name);
        if ids.is_empty() {
            return;
        }
        if !self.ctx.config.is_moderator() {
            debug!("Skipping purge of {} ids for {}: not modded", ids.len(), name);
            return;
        }

        for id in ids {
            self.send_chat(&format!("{} {}", DELETE_COMMAND, id), None, None, true)
                .await;
        }
    }

    async fn handle_chat_command(&self, message: &ChatMessage) {
        if !(message.is_moderator() || message.is_admin()) {
            return;
        }
        if !self.ctx.config.should_mirror_polls() {
            return;
        }

        let title = message
            .data
            .strip_prefix(VOTE_COMMAND_PREFIX)
            .and_then(|rest| rest.strip_suffix('?'))
            .map(str::trim);
        let title = match title {
            Some(title) => title,
            None => return,
        };

        let choices: Vec<String> = DEFAULT_POLL_CHOICES.iter().map(|c| c.to_string()).collect();
        if let Err(e) = self.ctx.polls.create_poll(title, &choices).await {
            warn!("Failed to create poll '{}': {}", title, e);
        }
    }

    /// Send text to the platform channel, returning the new message id.
    ///
    /// Unless `allow_action` is set, text starting with the platform command
    /// character is dropped so mirrored content can never issue commands.
    pub async fn send_chat(
        &self,
        text: &str,
        nonce: Option<&str>,
        reply_id: Option<&str>,
        allow_action: bool,
    ) -> Option<String> {
        if !allow_action && text.starts_with(PLATFORM_COMMAND_CHAR) {
            debug!("Dropping outbound text that would issue a platform command");
            return None;
        }

        match self
            .ctx
            .sender
            .send(self.ctx.config.channel_name(), text, nonce, reply_id)
            .await
        {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                warn!("Failed to send chat message: {}", e);
                None
            }
        }
    }
}

fn generate_nonce(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::config::Settings;
    use crate::core::recent_ids::RecentIdCache;
    use crate::core::worker_pool::create_worker_pool;
    use crate::error::{ChatMirrorError, Result};
    use crate::platform::pronouns::StaticPronouns;
    use crate::platform::traits::{ChatSender, ConfigStore, PollCreator, Transport};

    #[derive(Debug, Clone, PartialEq)]
    pub struct Sent {
        pub text: String,
        pub nonce: Option<String>,
    }

    #[derive(Default)]
    pub struct MockSender {
        pub sent: Mutex<Vec<Sent>>,
        next_id: AtomicUsize,
        pub fail: bool,
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
            if self.fail {
                return Err(ChatMirrorError::SendError("mock failure".to_string()));
            }
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

    #[derive(Default)]
    pub struct MockStore;

    #[async_trait]
    impl ConfigStore for MockStore {
        async fn persist(&self, _settings: &Settings) -> Result<()> {
            Ok(())
        }
    }

    pub fn base_settings() -> Settings {
        let mut settings = Settings::default();
        settings.channel_name = "somechannel".to_string();
        settings.auth_token = Some("tok".to_string());
        settings.chat_socket_url = "wss://example.test/ws".to_string();
        settings.first_party_token = Some("fp".to_string());
        settings
    }

    pub struct Harness {
        pub ctx: Arc<BotContext>,
        pub sender: Arc<MockSender>,
        pub transport: Arc<MockTransport>,
        pub polls: Arc<MockPolls>,
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
            Arc::new(MockStore),
            create_worker_pool(100),
        ));
        Harness {
            ctx,
            sender,
            transport,
            polls,
        }
    }

    fn msg(json: &str) -> ChatMessage {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_relays_plain_message_and_records_id() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(r#"{"data":"hello","nick":"Ann","timestamp":123}"#))
            .await;

        let sent = h.sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "[GGchat] Ann: hello");
        assert_eq!(sent[0].nonce.as_deref(), Some("Ann:123"));

        assert_eq!(h.ctx.recent_ids.drain("ann"), vec!["id-1".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_timestamp_uses_random_nonce() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_message(msg(r#"{"data":"hi","nick":"Ann"}"#)).await;

        let sent = h.sender.sent.lock().unwrap().clone();
        let nonce = sent[0].nonce.clone().unwrap();
        assert!(nonce.starts_with("Ann:"));
        assert_eq!(nonce.len(), "Ann:".len() + NONCE_LENGTH);
    }

    #[tokio::test]
    async fn test_drops_message_without_sender() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_message(msg(r#"{"data":"hello"}"#)).await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignore_bots_drops_bot_messages() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(r#"{"data":"beep","nick":"botty","features":["bot"]}"#))
            .await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subs_only_requires_privileged_sender() {
        let h = harness(base_settings());
        h.ctx.config.set_subs_only(true);
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_message(msg(r#"{"data":"pleb","nick":"norm"}"#)).await;
        relay
            .handle_message(msg(r#"{"data":"sub msg","nick":"paid","sub":"1"}"#))
            .await;

        let sent = h.sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "[GGchat] paid: sub msg");
    }

    #[tokio::test]
    async fn test_required_features_disjoint_drops() {
        let mut settings = base_settings();
        settings.required_any_features =
            Some(["subscriber".to_string(), "protected".to_string()].into());
        let h = harness(settings);
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(r#"{"data":"no flair","nick":"a","features":["bot"]}"#))
            .await;
        relay
            .handle_message(msg(r#"{"data":"flaired","nick":"b","features":["subscriber"]}"#))
            .await;

        let sent = h.sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("flaired"));
    }

    #[tokio::test]
    async fn test_pronoun_suffix_included_when_enabled() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(r#"{"data":"hey","nick":"Ann","pronouns":"sheher"}"#))
            .await;

        h.ctx.config.set_include_pronouns(false);
        relay
            .handle_message(msg(r#"{"data":"hey","nick":"Ann","pronouns":"sheher"}"#))
            .await;

        let sent = h.sender.sent.lock().unwrap().clone();
        assert_eq!(sent[0].text, "[GGchat] Ann (She/Her): hey");
        assert_eq!(sent[1].text, "[GGchat] Ann: hey");
    }

    #[tokio::test]
    async fn test_truncation_respects_postfix_and_limit() {
        let h = harness(base_settings());
        h.ctx.config.set_message_postfix(" [mirror]".to_string());
        let relay = RelayEngine::new(h.ctx.clone());

        let body = "x".repeat(600);
        relay
            .handle_message(msg(&format!(r#"{{"data":"{}","nick":"Ann"}}"#, body)))
            .await;

        let sent = h.sender.sent.lock().unwrap().clone();
        let text = &sent[0].text;
        assert_eq!(text.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(text.ends_with(" [mirror]"));
        assert!(text.starts_with("[GGchat] Ann: "));
    }

    #[tokio::test]
    async fn test_safeguard_drops_command_shaped_output() {
        let mut settings = base_settings();
        settings.message_prefix = "/sneaky".to_string();
        let h = harness(settings);
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_message(msg(r#"{"data":"hello","nick":"Ann"}"#)).await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_command_creates_poll_for_moderator() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(
                r#"{"data":"/vote Pineapple on pizza?","nick":"mod","features":["moderator"]}"#,
            ))
            .await;

        let created = h.polls.created.lock().unwrap().clone();
        assert_eq!(created, vec!["Pineapple on pizza".to_string()]);
        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_command_ignored_for_unprivileged_sender() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(r#"{"data":"/vote Pineapple on pizza?","nick":"pleb"}"#))
            .await;

        assert!(h.polls.created.lock().unwrap().is_empty());
        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_command_requires_poll_capability() {
        let mut settings = base_settings();
        settings.first_party_token = None;
        let h = harness(settings);
        let relay = RelayEngine::new(h.ctx.clone());

        relay
            .handle_message(msg(
                r#"{"data":"/vote Pineapple on pizza?","nick":"mod","features":["moderator"]}"#,
            ))
            .await;

        assert!(h.polls.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_site_command_trigger_never_relays() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_message(msg(r#"{"data":"!lore","nick":"Ann"}"#)).await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_mirrored_as_action() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_broadcast(msg(r#"{"data":"stream is live"}"#)).await;

        let sent = h.sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "/me stream is live");
    }

    #[tokio::test]
    async fn test_broadcast_skips_commands_sentinel_and_disabled() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_broadcast(msg(r#"{"data":"/timeout x"}"#)).await;
        relay.handle_broadcast(msg(r#"{"data":"null"}"#)).await;

        h.ctx.config.set_mirror_broadcasts(false);
        relay.handle_broadcast(msg(r#"{"data":"real news"}"#)).await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_truncated_with_ellipsis() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        let body = "y".repeat(600);
        relay
            .handle_broadcast(msg(&format!(r#"{{"data":"{}"}}"#, body)))
            .await;

        let sent = h.sender.sent.lock().unwrap().clone();
        let text = &sent[0].text;
        assert_eq!(text.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(text.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_purge_deletes_recorded_ids_newest_first() {
        let h = harness(base_settings());
        h.ctx.config.set_moderator(true);
        let relay = RelayEngine::new(h.ctx.clone());

        h.ctx.recent_ids.record_id("alice", "m1");
        h.ctx.recent_ids.record_id("alice", "m2");

        relay.handle_purge(msg(r#"{"data":"alice"}"#)).await;

        let sent = h.sender.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text, "/delete m2");
        assert_eq!(sent[1].text, "/delete m1");

        assert!(h.ctx.recent_ids.drain("alice").is_empty());
    }

    #[tokio::test]
    async fn test_purge_without_mod_status_sends_nothing() {
        let h = harness(base_settings());
        let relay = RelayEngine::new(h.ctx.clone());

        h.ctx.recent_ids.record_id("alice", "m1");
        relay.handle_purge(msg(r#"{"data":"alice"}"#)).await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_with_nothing_to_purge_is_silent() {
        let h = harness(base_settings());
        h.ctx.config.set_moderator(true);
        let relay = RelayEngine::new(h.ctx.clone());

        relay.handle_purge(msg(r#"{"data":"ghost"}"#)).await;
        relay.handle_purge(msg(r#"{"data":""}"#)).await;

        assert!(h.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_records_nothing() {
        let failing = Arc::new(MockSender {
            fail: true,
            ..Default::default()
        });
        let ctx = Arc::new(BotContext::new(
            base_settings(),
            Arc::new(RecentIdCache::new()),
            failing,
            Arc::new(MockTransport::default()),
            Arc::new(MockPolls::default()),
            Arc::new(StaticPronouns::new()),
            Arc::new(MockStore),
            create_worker_pool(100),
        ));
        let relay = RelayEngine::new(ctx.clone());

        relay.handle_message(msg(r#"{"data":"hello","nick":"Ann"}"#)).await;

        assert!(ctx.recent_ids.drain("ann").is_empty());
    }
}
