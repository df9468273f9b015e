//! Moderator command dispatch
//!
//! Platform chat commands arrive with the trigger already stripped. Only
//! moderator/broadcaster senders are processed; everyone else is silently
//! ignored so the bot leaks nothing about its internals. The keyword set is a
//! closed enum so authorization and dispatch stay exhaustively reviewable.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::core::relay::RelayEngine;
use crate::platform::context::BotContext;

/// Privilege markers attached to the sender of a platform chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandPermission {
    Broadcaster,
    Moderator,
    Vip,
    Subscriber,
}

/// A trigger-prefixed platform chat command, trigger already stripped.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub text: String,
    pub permissions: HashSet<CommandPermission>,
}

impl CommandEvent {
    pub fn new(text: impl Into<String>, permissions: HashSet<CommandPermission>) -> Self {
        Self {
            text: text.into(),
            permissions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFlag {
    SubsOnly,
    /// Inverted onto `ignore_bots`: enabling bots clears the ignore flag.
    Bots,
    Pronouns,
    Broadcasts,
    Polls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetMode {
    Enable,
    Disable,
    Toggle,
}

/// Closed set of recognized command keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Connect,
    Disconnect,
    Reconnect,
    Save,
    SetPrefix,
    SetPostfix,
    Purge,
    Ping,
    Set(ConfigFlag, SetMode),
}

impl Command {
    fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "connect" => return Some(Self::Connect),
            "disconnect" => return Some(Self::Disconnect),
            "reconnect" => return Some(Self::Reconnect),
            "save" => return Some(Self::Save),
            "setprefix" => return Some(Self::SetPrefix),
            "setpostfix" => return Some(Self::SetPostfix),
            "purge" => return Some(Self::Purge),
            "ping" => return Some(Self::Ping),
            _ => {}
        }

        let (mode, flag) = if let Some(rest) = keyword.strip_prefix("enable") {
            (SetMode::Enable, rest)
        } else if let Some(rest) = keyword.strip_prefix("disable") {
            (SetMode::Disable, rest)
        } else if let Some(rest) = keyword.strip_prefix("toggle") {
            (SetMode::Toggle, rest)
        } else {
            return None;
        };

        let flag = match flag {
            "subsonly" => ConfigFlag::SubsOnly,
            "bots" => ConfigFlag::Bots,
            "pronouns" => ConfigFlag::Pronouns,
            "broadcasts" => ConfigFlag::Broadcasts,
            "polls" => ConfigFlag::Polls,
            _ => return None,
        };
        Some(Self::Set(flag, mode))
    }
}

pub struct CommandDispatcher {
    ctx: Arc<BotContext>,
    relay: Arc<RelayEngine>,
}

impl CommandDispatcher {
    pub fn new(ctx: Arc<BotContext>, relay: Arc<RelayEngine>) -> Self {
        Self { ctx, relay }
    }

    /// Authorize and execute one command event.
    pub async fn accept(&self, event: CommandEvent) {
        if !event.permissions.contains(&CommandPermission::Moderator)
            && !event.permissions.contains(&CommandPermission::Broadcaster)
        {
            return;
        }

        let (keyword, argument) = match event.text.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest),
            None => (event.text.as_str(), ""),
        };

        let command = match Command::parse(&keyword.to_lowercase()) {
            Some(command) => command,
            None => {
                debug!("Ignoring unknown command keyword: {}", keyword);
                return;
            }
        };

        match command {
            Command::Connect => {
                if let Err(e) = self.ctx.transport.connect().await {
                    warn!("Failed to connect transport: {}", e);
                }
            }
            Command::Disconnect => {
                if let Err(e) = self.ctx.transport.disconnect().await {
                    warn!("Failed to disconnect transport: {}", e);
                }
            }
            Command::Reconnect => {
                if let Err(e) = self.ctx.transport.reconnect().await {
                    warn!("Failed to reconnect transport: {}", e);
                }
            }
            Command::Save => {
                if let Err(e) = self.ctx.save_config().await {
                    warn!("Failed to persist config: {}", e);
                }
            }
            Command::SetPrefix => {
                self.ctx.config.set_message_prefix(argument.to_string());
            }
            Command::SetPostfix => {
                self.ctx.config.set_message_postfix(argument.to_string());
            }
            Command::Purge => {
                self.relay.purge_user(argument.trim()).await;
            }
            Command::Ping => {
                let socket = format_latency(self.ctx.transport.latency().await);
                let platform = format_latency(self.ctx.sender.latency().await);
                let reply = format!(
                    "Pong! socket latency: {}, platform latency: {}",
                    socket, platform
                );
                self.relay.send_chat(&reply, None, None, false).await;
            }
            Command::Set(flag, mode) => self.apply_flag(flag, mode),
        }
    }

    fn apply_flag(&self, flag: ConfigFlag, mode: SetMode) {
        let config = &self.ctx.config;
        // `bots` is exposed to moderators as "are bot messages mirrored",
        // the inverse of the stored ignore flag.
        let current = match flag {
            ConfigFlag::SubsOnly => config.subs_only(),
            ConfigFlag::Bots => !config.ignore_bots(),
            ConfigFlag::Pronouns => config.include_pronouns(),
            ConfigFlag::Broadcasts => config.mirror_broadcasts(),
            ConfigFlag::Polls => config.mirror_polls(),
        };
        let next = match mode {
            SetMode::Enable => true,
            SetMode::Disable => false,
            SetMode::Toggle => !current,
        };
        match flag {
            ConfigFlag::SubsOnly => config.set_subs_only(next),
            ConfigFlag::Bots => config.set_ignore_bots(!next),
            ConfigFlag::Pronouns => config.set_include_pronouns(next),
            ConfigFlag::Broadcasts => config.set_mirror_broadcasts(next),
            ConfigFlag::Polls => config.set_mirror_polls(next),
        }
    }
}

fn format_latency(latency: Option<std::time::Duration>) -> String {
    latency
        .map(|d| format!("{}ms", d.as_millis()))
        .unwrap_or_else(|| "n/a".to_string())
}
