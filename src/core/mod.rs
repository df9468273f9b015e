//! Core functionality for the chat relay

pub mod bounded_deque;
pub mod commands;
pub mod message;
pub mod recent_ids;
pub mod relay;
pub mod router;
pub mod worker_pool;

// Re-export main components for convenience
pub use bounded_deque::{BoundedDeque, EvictionPolicy};
pub use commands::{CommandDispatcher, CommandEvent, CommandPermission};
pub use message::{ChatMessage, FrameType, ProtocolFrame};
pub use recent_ids::RecentIdCache;
pub use relay::RelayEngine;
pub use router::MessageRouter;
pub use worker_pool::{create_worker_pool, SharedWorkerPool, WorkerPool};
