// Platform chat limits
pub const MAX_MESSAGE_LENGTH: usize = 500;
pub const ACTION_PREFIX: &str = "/me ";
pub const DELETE_COMMAND: &str = "/delete";
pub const TRUNCATION_MARKER: char = '…';

// Recent-message cache sizing
pub const RECENT_ID_TTL_SECONDS: u64 = 120;
pub const RECENT_ID_LIMIT_PER_USER: usize = 16;
pub const MAX_TRACKED_SENDERS: usize = 65536;

// Relay behavior
pub const NONCE_LENGTH: usize = 6;
pub const VOTE_COMMAND_PREFIX: &str = "/vote ";
// Broadcast body emitted by the site feed for an empty slot; never mirrored
pub const BROADCAST_NOOP_SENTINEL: &str = "null";

// Poll defaults owned by the poll-creation collaborator
pub const DEFAULT_POLL_DURATION_SECONDS: u32 = 60;
pub const DEFAULT_POLL_POINTS_COST: u32 = 1000;
pub const DEFAULT_POLL_CHOICES: [&str; 2] = ["Yes (1)", "No (2)"];

// Transport configuration
pub const WS_PING_PERIOD_SECONDS: u64 = 30;
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

// Admin server configuration
pub const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
pub const DEFAULT_ADMIN_PORT: u16 = 3030;

// Worker pool configuration constants
pub const DEFAULT_MAX_QUEUED_TASKS: usize = 1000;
