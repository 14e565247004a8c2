use std::{fmt, str::FromStr};

use libsqlite3_sys::sqlite3_get_autocommit;
use log::{debug, warn};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection},
    ConnectOptions, Connection,
};
use tokio::runtime::{Builder, Runtime};

use crate::{
    core::{
        session::{Session, SessionProvider, SessionResult},
        statement::Value,
    },
    BatchError,
};

use super::config::DatabaseConfig;

/// A [`Session`] over one SQLite connection, driven through SQLx.
///
/// The session owns a single-threaded tokio runtime and blocks on it for every
/// call, so it must be used from synchronous code (use
/// `tokio::task::spawn_blocking` from async code).
///
/// Auto-commit follows JDBC semantics:
/// - disabling auto-commit opens a transaction right away (`BEGIN`), which also
///   proves the connection is alive;
/// - statements executed while auto-commit is off open a new transaction when
///   none is open, e.g. after a commit;
/// - restoring auto-commit rolls back a transaction that is still open, so a
///   batch whose rollback failed is never made durable.
///
/// Whether a transaction is open is always asked to SQLite, which may end one
/// by itself (`INSERT OR ROLLBACK`, `RAISE(ROLLBACK)`, `SQLITE_FULL`).
///
/// SQLite has no users: the credentials of the [`DatabaseConfig`] are ignored.
///
/// # Examples
///
/// ```no_run
/// use batch_tx::core::{batch::Batch, executor::TransactionalExecutor, statement::{Statement, Value}};
/// use batch_tx::rdbc::{config::DatabaseConfig, sqlite_session::SqliteSession};
///
/// # fn main() -> Result<(), batch_tx::BatchError> {
/// let mut session = SqliteSession::connect(&DatabaseConfig::new("sqlite://bank.db"))?;
///
/// let batch = Batch::new()
///     .with(Statement::new("update accounts set balance=balance-? where id=?", vec![Value::from(100.0), Value::from(1)])?)
///     .with(Statement::new("update accounts set balance=balance+? where id=?", vec![Value::from(100.0), Value::from(2)])?);
///
/// let result = TransactionalExecutor::new().run(&mut session, batch)?;
/// assert!(result.committed());
/// # Ok(())
/// # }
/// ```
pub struct SqliteSession {
    runtime: Runtime,
    connection: SqliteConnection,
    auto_commit: bool,
}

impl SqliteSession {
    /// Opens a connection to the database described by `config`.
    ///
    /// # Errors
    /// - `BatchError::Configuration` when the URL cannot be parsed
    /// - `BatchError::SessionUnavailable` when the connection cannot be established
    pub fn connect(config: &DatabaseConfig) -> Result<Self, BatchError> {
        let options = SqliteConnectOptions::from_str(config.url())
            .map_err(|e| BatchError::Configuration(format!("invalid sqlite url: {}", e)))?
            .create_if_missing(config.creates_if_missing())
            .busy_timeout(config.busy_timeout());

        if config.user().is_some() {
            debug!("SQLite ignores credentials, user setting not used");
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BatchError::SessionUnavailable(format!("cannot start runtime: {}", e)))?;

        let connection = runtime
            .block_on(options.connect())
            .map_err(|e| BatchError::SessionUnavailable(e.to_string()))?;

        debug!("Connected to {}", config.url());

        Ok(Self {
            runtime,
            connection,
            auto_commit: true,
        })
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Whether the connection has an open transaction, as SQLite reports it.
    ///
    /// SQLite ends a transaction on its own after `INSERT OR ROLLBACK`, a
    /// `RAISE(ROLLBACK)` trigger or some I/O errors, so the state is read from
    /// the connection and never cached.
    pub fn in_transaction(&mut self) -> SessionResult<bool> {
        let mut handle = self
            .runtime
            .block_on(self.connection.lock_handle())
            .map_err(|e| BatchError::Session(e.to_string()))?;
        // SAFETY: the raw handle stays valid while `handle` holds the connection lock.
        let auto_commit = unsafe { sqlite3_get_autocommit(handle.as_raw_handle().as_ptr()) };
        Ok(auto_commit == 0)
    }

    /// Closes the connection gracefully. Dropping the session also closes it.
    pub fn close(self) -> SessionResult<()> {
        let Self {
            runtime,
            connection,
            ..
        } = self;
        runtime
            .block_on(connection.close())
            .map_err(|e| BatchError::Session(e.to_string()))
    }

    fn execute_raw(&mut self, sql: &str) -> SessionResult<u64> {
        let result = self
            .runtime
            .block_on(sqlx::query(sql).execute(&mut self.connection))
            .map_err(|e| BatchError::Session(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

impl Session for SqliteSession {
    fn disable_auto_commit(&mut self) -> SessionResult<bool> {
        self.runtime
            .block_on(self.connection.ping())
            .map_err(|e| BatchError::SessionUnavailable(e.to_string()))?;

        match (self.in_transaction()?, self.auto_commit) {
            (false, _) => {
                self.execute_raw("BEGIN")?;
            }
            // Left open by a run whose cleanup failed: nothing of it may be committed.
            (true, true) => {
                warn!("Discarding a transaction left open by an earlier run");
                self.execute_raw("ROLLBACK")?;
                self.execute_raw("BEGIN")?;
            }
            (true, false) => debug!("Auto-commit already off, joining the open transaction"),
        }

        let prior = self.auto_commit;
        self.auto_commit = false;
        Ok(prior)
    }

    /// Restores `prior`. Re-enabling auto-commit rolls back a transaction that
    /// is still open: the executor closes every transaction it commits, so an
    /// open one is what a failed rollback left behind.
    fn restore_auto_commit(&mut self, prior: bool) -> SessionResult<()> {
        self.auto_commit = prior;
        if prior && self.in_transaction()? {
            warn!("Auto-commit restored over an open transaction, rolling it back");
            self.execute_raw("ROLLBACK")?;
        }
        Ok(())
    }

    fn commit(&mut self) -> SessionResult<()> {
        if self.in_transaction()? {
            self.execute_raw("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> SessionResult<()> {
        if self.in_transaction()? {
            self.execute_raw("ROLLBACK")?;
        } else {
            debug!("No open transaction, nothing to roll back");
        }
        Ok(())
    }

    fn execute_statement(&mut self, template: &str, parameters: &[Value]) -> SessionResult<u64> {
        if !self.auto_commit && !self.in_transaction()? {
            self.execute_raw("BEGIN")?;
        }

        let mut query = sqlx::query(template);
        for value in parameters {
            query = match value {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(v) => query.bind(*v),
                Value::Int(v) => query.bind(*v),
                Value::Double(v) => query.bind(*v),
                Value::Text(v) => query.bind(v.clone()),
                Value::Bytes(v) => query.bind(v.clone()),
                Value::Timestamp(v) => query.bind(*v),
            };
        }

        let result = self
            .runtime
            .block_on(query.execute(&mut self.connection))
            .map_err(|e| BatchError::Session(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

impl fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSession")
            .field("auto_commit", &self.auto_commit)
            .finish_non_exhaustive()
    }
}

/// Opens a new [`SqliteSession`] on every [`SessionProvider::acquire`].
#[derive(Debug, Clone)]
pub struct SqliteSessionProvider {
    config: DatabaseConfig,
}

impl SqliteSessionProvider {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

impl SessionProvider for SqliteSessionProvider {
    type Session = SqliteSession;

    fn acquire(&self) -> SessionResult<SqliteSession> {
        SqliteSession::connect(&self.config)
    }
}
