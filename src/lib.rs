//! Chat Mirror - relays an external site chat feed into a platform chat channel
//!
//! This library provides the relay core: frame classification, message
//! filtering and formatting, best-effort moderation purge, and the live
//! moderator command surface.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod platform;

// Re-export main components
pub use config::*;
pub use constants::*;
