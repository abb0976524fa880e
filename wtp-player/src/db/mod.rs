//! Database access layer
//!
//! SQLite holds the durable key-value records (sessions, preferences) and
//! the runtime `settings` overrides.

pub mod init;
pub mod kv;
pub mod settings;

pub use init::{init_database, init_memory_database};
pub use kv::SqliteStorage;
pub use settings::{get_setting, load_player_config, load_sequencer_policy, set_setting};
