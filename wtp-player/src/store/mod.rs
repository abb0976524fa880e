//! Durable local state: session records and user preferences

pub mod preferences;
pub mod session;
pub mod storage;
pub mod writer;

pub use preferences::{Preferences, Tip};
pub use session::{PersistedSession, SessionStore};
pub use storage::{DurableStorage, MemoryStorage};
pub use writer::SessionWriter;
