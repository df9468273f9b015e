use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum ChatMirrorError {
    // Frame/message errors
    MessageParseError(String),
    MessageTooLarge(usize),

    // Outbound send errors
    SendError(String),
    SendRejected,

    // Transport errors
    TransportError(String),
    TransportClosed,

    // Poll errors
    PollError(String),

    // Configuration errors
    ConfigError(String),

    // System errors
    CacheLock(String),
    SystemError(String),
}

impl fmt::Display for ChatMirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} chars", size),
            Self::SendError(msg) => write!(f, "Send error: {}", msg),
            Self::SendRejected => write!(f, "Send rejected by command safeguard"),
            Self::TransportError(msg) => write!(f, "Transport error: {}", msg),
            Self::TransportClosed => write!(f, "Transport closed unexpectedly"),
            Self::PollError(msg) => write!(f, "Poll error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::CacheLock(msg) => write!(f, "Cache lock error: {}", msg),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
        }
    }
}

impl Error for ChatMirrorError {}

// Converting from PoisonError to facilitate poisoned lock handling
impl<T> From<PoisonError<T>> for ChatMirrorError {
    fn from(err: PoisonError<T>) -> Self {
        ChatMirrorError::CacheLock(format!("Lock poisoned: {}", err))
    }
}

// Generic result type for chat-mirror
pub type Result<T> = std::result::Result<T, ChatMirrorError>;
