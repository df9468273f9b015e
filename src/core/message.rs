//! Inbound protocol frames and the site chat message model

use serde::{Deserialize, Serialize};

pub const FEATURE_BOT: &str = "bot";
pub const FEATURE_SUBSCRIBER: &str = "subscriber";
pub const FEATURE_PROTECTED: &str = "protected";
pub const FEATURE_MODERATOR: &str = "moderator";
pub const FEATURE_ADMIN: &str = "admin";

/// Frame types declared by the site chat protocol.
///
/// Only `Msg`, `Broadcast`, `Ban`, and `Mute` carry JSON payloads; `Ping` and
/// `Refresh` carry opaque payloads; the rest are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Aware,
    Ban,
    Unban,
    Mute,
    Unmute,
    Names,
    Join,
    Quit,
    Refresh,
    Ping,
    Msg,
    Broadcast,
    Unknown,
}

impl FrameType {
    /// Case-sensitive exact match against the protocol token; anything else
    /// maps to [`FrameType::Unknown`].
    pub fn parse(token: &str) -> Self {
        match token {
            "AWARE" => Self::Aware,
            "BAN" => Self::Ban,
            "UNBAN" => Self::Unban,
            "MUTE" => Self::Mute,
            "UNMUTE" => Self::Unmute,
            "NAMES" => Self::Names,
            "JOIN" => Self::Join,
            "QUIT" => Self::Quit,
            "REFRESH" => Self::Refresh,
            "PING" => Self::Ping,
            "MSG" => Self::Msg,
            "BROADCAST" => Self::Broadcast,
            _ => Self::Unknown,
        }
    }
}

/// One line of inbound transport text, split into type token and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolFrame<'a> {
    pub frame_type: FrameType,
    pub payload: &'a str,
}

impl<'a> ProtocolFrame<'a> {
    /// Split `raw` on the first space. Frames with no space, or with nothing
    /// after it, are malformed and yield `None`.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let space = raw.find(' ')?;
        let payload = &raw[space + 1..];
        if payload.is_empty() {
            return None;
        }
        Some(Self {
            frame_type: FrameType::parse(&raw[..space]),
            payload,
        })
    }
}

/// Case-folded, trimmed sender name used as the recent-id cache key.
pub fn user_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Decoded site chat message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message body.
    pub data: String,
    /// Sender name; absent for system-originated payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Subscriber marker, "1" or "true".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    /// Pronoun id, resolved through an external directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronouns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ChatMessage {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features
            .as_ref()
            .map(|f| f.iter().any(|x| x == feature))
            .unwrap_or(false)
    }

    pub fn is_bot(&self) -> bool {
        self.has_feature(FEATURE_BOT)
    }

    pub fn is_sub(&self) -> bool {
        matches!(self.sub.as_deref(), Some("1") | Some("true"))
            || self.has_feature(FEATURE_SUBSCRIBER)
    }

    pub fn is_moderator(&self) -> bool {
        self.has_feature(FEATURE_MODERATOR)
    }

    pub fn is_admin(&self) -> bool {
        self.has_feature(FEATURE_ADMIN)
    }

    /// Whether the sender carries any privileged marker.
    pub fn is_privileged(&self) -> bool {
        self.is_bot()
            || self.is_sub()
            || self.has_feature(FEATURE_PROTECTED)
            || self.is_moderator()
            || self.is_admin()
    }

    /// Cache key derived from the sender name, when present.
    pub fn user_key(&self) -> Option<String> {
        self.nick.as_deref().map(user_key)
    }
}
