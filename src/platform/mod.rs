//! Platform collaborators and service wiring

pub mod context;
pub mod pronouns;
pub mod rest;
pub mod site;
pub mod traits;

pub use context::BotContext;
pub use pronouns::StaticPronouns;
pub use rest::RestChatClient;
pub use site::SiteTransport;
pub use traits::{ChatSender, ConfigStore, PollCreator, PronounDirectory, Transport};
