//! Bot configuration module
//!
//! `Settings` is the persisted snake_case JSON form loaded at startup;
//! `RelayConfig` is the shared runtime form whose mutable fields are guarded
//! per-field (atomics for flags, locks for strings) so concurrent readers on
//! the worker pool never observe torn updates.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CONFIG_PATH;
use crate::error::{ChatMirrorError, Result};
use crate::platform::traits::ConfigStore;

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    "[GGchat]".to_string()
}

fn default_trigger() -> String {
    "-".to_string()
}

/// Persisted configuration, mirrored to disk by [`FileConfigStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client_id: Option<String>,
    pub auth_token: Option<String>,
    pub first_party_token: Option<String>,
    pub chat_socket_url: String,
    pub channel_name: String,
    pub broadcaster_id: Option<String>,
    pub api_base_url: Option<String>,
    pub moderator: bool,
    pub subs_only: bool,
    #[serde(default = "default_true")]
    pub ignore_bots: bool,
    #[serde(default = "default_true")]
    pub include_pronouns: bool,
    #[serde(default = "default_true")]
    pub mirror_broadcasts: bool,
    #[serde(default = "default_true")]
    pub mirror_polls: bool,
    #[serde(default = "default_prefix")]
    pub message_prefix: String,
    pub message_postfix: String,
    #[serde(default = "default_trigger")]
    pub command_trigger: String,
    pub required_any_features: Option<HashSet<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: None,
            auth_token: None,
            first_party_token: None,
            chat_socket_url: String::new(),
            channel_name: String::new(),
            broadcaster_id: None,
            api_base_url: None,
            moderator: false,
            subs_only: false,
            ignore_bots: true,
            include_pronouns: true,
            mirror_broadcasts: true,
            mirror_polls: true,
            message_prefix: default_prefix(),
            message_postfix: String::new(),
            command_trigger: default_trigger(),
            required_any_features: None,
        }
    }
}

impl Settings {
    /// Resolve the config file path, honoring the `CHAT_MIRROR_CONFIG` override.
    pub fn resolve_path() -> PathBuf {
        std::env::var("CHAT_MIRROR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Read and parse settings from a JSON file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ChatMirrorError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        log::trace!("Read config contents: {}", text);
        serde_json::from_str(&text).map_err(|e| {
            ChatMirrorError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Validate the minimum fields required to start the bot.
    pub fn validate(&self) -> Result<()> {
        if self.chat_socket_url.trim().is_empty() {
            return Err(ChatMirrorError::ConfigError(
                "chat_socket_url must not be blank".to_string(),
            ));
        }
        let socket_url = url::Url::parse(&self.chat_socket_url).map_err(|e| {
            ChatMirrorError::ConfigError(format!("chat_socket_url is not a valid URL: {}", e))
        })?;
        if !matches!(socket_url.scheme(), "ws" | "wss") {
            return Err(ChatMirrorError::ConfigError(
                "chat_socket_url must use the ws or wss scheme".to_string(),
            ));
        }
        if self.channel_name.trim().is_empty() {
            return Err(ChatMirrorError::ConfigError(
                "channel_name must not be blank".to_string(),
            ));
        }
        if self.auth_token.as_deref().unwrap_or("").trim().is_empty() {
            return Err(ChatMirrorError::ConfigError(
                "auth_token must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_first_party_token(&self) -> bool {
        !self.first_party_token.as_deref().unwrap_or("").trim().is_empty()
    }
}

/// Shared runtime configuration.
///
/// Constructed once from [`Settings`], outlives every other component, and is
/// mutated only by the command dispatcher and the moderator-status tracker.
pub struct RelayConfig {
    channel_name: String,
    command_trigger: String,
    required_any_features: HashSet<String>,

    ignore_bots: AtomicBool,
    subs_only: AtomicBool,
    include_pronouns: AtomicBool,
    mirror_broadcasts: AtomicBool,
    mirror_polls: AtomicBool,
    moderator: AtomicBool,
    poll_capable: AtomicBool,

    message_prefix: RwLock<String>,
    message_postfix: RwLock<String>,
}

impl RelayConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            channel_name: settings.channel_name.clone(),
            command_trigger: settings.command_trigger.clone(),
            required_any_features: settings.required_any_features.clone().unwrap_or_default(),
            ignore_bots: AtomicBool::new(settings.ignore_bots),
            subs_only: AtomicBool::new(settings.subs_only),
            include_pronouns: AtomicBool::new(settings.include_pronouns),
            mirror_broadcasts: AtomicBool::new(settings.mirror_broadcasts),
            mirror_polls: AtomicBool::new(settings.mirror_polls),
            moderator: AtomicBool::new(settings.moderator),
            poll_capable: AtomicBool::new(settings.has_first_party_token()),
            message_prefix: RwLock::new(settings.message_prefix.clone()),
            message_postfix: RwLock::new(settings.message_postfix.clone()),
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn command_trigger(&self) -> &str {
        &self.command_trigger
    }

    pub fn required_any_features(&self) -> &HashSet<String> {
        &self.required_any_features
    }

    pub fn ignore_bots(&self) -> bool {
        self.ignore_bots.load(Ordering::Relaxed)
    }

    pub fn set_ignore_bots(&self, value: bool) {
        self.ignore_bots.store(value, Ordering::Relaxed);
    }

    pub fn subs_only(&self) -> bool {
        self.subs_only.load(Ordering::Relaxed)
    }

    pub fn set_subs_only(&self, value: bool) {
        self.subs_only.store(value, Ordering::Relaxed);
    }

    pub fn include_pronouns(&self) -> bool {
        self.include_pronouns.load(Ordering::Relaxed)
    }

    pub fn set_include_pronouns(&self, value: bool) {
        self.include_pronouns.store(value, Ordering::Relaxed);
    }

    pub fn mirror_broadcasts(&self) -> bool {
        self.mirror_broadcasts.load(Ordering::Relaxed)
    }

    pub fn set_mirror_broadcasts(&self, value: bool) {
        self.mirror_broadcasts.store(value, Ordering::Relaxed);
    }

    pub fn mirror_polls(&self) -> bool {
        self.mirror_polls.load(Ordering::Relaxed)
    }

    pub fn set_mirror_polls(&self, value: bool) {
        self.mirror_polls.store(value, Ordering::Relaxed);
    }

    /// Whether the bot currently holds moderator privilege on the platform.
    pub fn is_moderator(&self) -> bool {
        self.moderator.load(Ordering::Relaxed)
    }

    /// Called by the moderator-status tracker when the platform reports a change.
    pub fn set_moderator(&self, value: bool) {
        if self.moderator.swap(value, Ordering::Relaxed) != value {
            log::info!(
                "Bot platform status changed to: {}",
                if value { "modded" } else { "not modded" }
            );
        }
    }

    /// Poll mirroring requires both the flag and the first-party capability.
    pub fn should_mirror_polls(&self) -> bool {
        self.mirror_polls() && self.poll_capable.load(Ordering::Relaxed)
    }

    pub fn message_prefix(&self) -> String {
        self.message_prefix.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn set_message_prefix(&self, value: String) {
        if let Ok(mut prefix) = self.message_prefix.write() {
            *prefix = value;
        }
    }

    pub fn message_postfix(&self) -> String {
        self.message_postfix.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn set_message_postfix(&self, value: String) {
        if let Ok(mut postfix) = self.message_postfix.write() {
            *postfix = value;
        }
    }

    /// Merge the current mutable state back into a persisted form.
    pub fn apply_to(&self, settings: &mut Settings) {
        settings.moderator = self.is_moderator();
        settings.subs_only = self.subs_only();
        settings.ignore_bots = self.ignore_bots();
        settings.include_pronouns = self.include_pronouns();
        settings.mirror_broadcasts = self.mirror_broadcasts();
        settings.mirror_polls = self.mirror_polls();
        settings.message_prefix = self.message_prefix();
        settings.message_postfix = self.message_postfix();
    }
}

/// Persists settings to the JSON file they were loaded from.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn persist(&self, settings: &Settings) -> Result<()> {
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| ChatMirrorError::ConfigError(format!("Failed to encode config: {}", e)))?;
        fs::write(&self.path, text).map_err(|e| {
            ChatMirrorError::ConfigError(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            ))
        })?;
        log::debug!("Successfully wrote latest config file");
        Ok(())
    }
}
