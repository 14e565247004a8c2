/// Connection settings for session providers.
pub mod config;

/// SQLite session and session provider built on SQLx.
pub mod sqlite_session;

pub use config::DatabaseConfig;
pub use sqlite_session::{SqliteSession, SqliteSessionProvider};
