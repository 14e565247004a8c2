use log::{debug, error, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::BatchError;

use super::{
    batch::Batch,
    reporter::{ExecutionResult, ResultReporter, StatementOutcome},
    session::{Session, SessionProvider, SessionResult},
    statement::Statement,
};

/// Type alias for executor results.
///
/// An `Err` is always fatal: either no transaction could be opened or the
/// transaction could not be closed cleanly. A failed statement is not an
/// `Err`, it is reported inside the [`ExecutionResult`].
pub type ExecutorResult = Result<ExecutionResult, BatchError>;

/// Lifecycle of the transaction opened by one run.
///
/// `Idle → TransactionOpen → {Committed | RolledBack | RollbackFailed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionState {
    /// Auto-commit has not been disabled yet.
    Idle,
    /// Auto-commit is disabled and statements are running.
    TransactionOpen,
    /// Every statement succeeded and the commit went through.
    Committed,
    /// A statement or the commit failed and the rollback went through.
    RolledBack,
    /// The rollback itself failed. The store may be inconsistent.
    RollbackFailed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed
                | TransactionState::RolledBack
                | TransactionState::RollbackFailed
        )
    }
}

/// Runs batches as single all-or-nothing transactions.
///
/// The executor holds no state between runs: it can be shared between threads,
/// each thread running its own batches on its own sessions.
///
/// # Examples
///
/// ```no_run
/// use batch_tx::core::{
///     batch::Batch,
///     executor::TransactionalExecutor,
///     session::Session,
///     statement::{Statement, Value},
/// };
///
/// # fn transfer(session: &mut impl Session) -> Result<(), batch_tx::BatchError> {
/// let batch = Batch::new()
///     .with(Statement::new("update accounts set balance=balance-? where id=?", vec![Value::from(100.0), Value::from(1)])?)
///     .with(Statement::new("update accounts set balance=balance+? where id=?", vec![Value::from(100.0), Value::from(2)])?);
///
/// let executor = TransactionalExecutor::new().name("transfer");
/// let result = executor.run(session, batch)?;
///
/// if !result.committed() {
///     eprintln!("transfer rolled back: {:?}", result.failure());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionalExecutor {
    name: String,
}

impl Default for TransactionalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionalExecutor {
    pub fn new() -> Self {
        Self {
            name: "batch".to_string(),
        }
    }

    /// Sets the name written in the log lines of each run.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Executes `batch` on `session` as one transaction.
    ///
    /// This method:
    /// 1. Returns a committed, empty result for an empty batch without touching the session
    /// 2. Disables auto-commit on the session
    /// 3. Executes each statement in order, recording the rows it affected
    /// 4. Stops at the first failing statement and rolls back
    /// 5. Commits when every statement succeeded
    /// 6. Restores the prior auto-commit mode on every exit path, panics included
    ///
    /// # Errors
    /// - `BatchError::SessionUnavailable` when auto-commit could not be disabled
    /// - `BatchError::RollbackFailed` when a rollback did not go through
    /// - `BatchError::CommitFailed` when the commit failed (the transaction was rolled back)
    pub fn run<S>(&self, session: &mut S, batch: Batch) -> ExecutorResult
    where
        S: Session + ?Sized,
    {
        let id = Uuid::new_v4();

        if batch.is_empty() {
            debug!("Empty batch: {}, id: {}, nothing to execute", self.name, id);
            return Ok(ResultReporter::new().finish(id, TransactionState::Committed));
        }

        info!(
            "Start of batch: {}, id: {}, statements: {}",
            self.name,
            id,
            batch.len()
        );

        let mut reporter = ResultReporter::with_capacity(batch.len());
        let mut transaction = TransactionGuard::begin(session)?;

        for (index, statement) in batch.iter().enumerate() {
            match transaction.execute(statement) {
                Ok(rows) => {
                    debug!("Statement {} affected {} row(s)", index, rows);
                    reporter.record(index, StatementOutcome::RowsAffected(rows));
                }
                Err(err) => {
                    let message = describe(err);
                    warn!("Statement {} failed: {}, rolling back", index, message);
                    let cause = format!("statement {} failed: {}", index, message);
                    reporter.record(index, StatementOutcome::Failed(message));

                    transaction.rollback(Some(index), cause)?;

                    info!(
                        "End of batch: {}, id: {}, rolled back at statement {}",
                        self.name, id, index
                    );
                    return Ok(reporter.finish(id, transaction.state()));
                }
            }
        }

        transaction.commit()?;

        info!("End of batch: {}, id: {}, committed", self.name, id);
        Ok(reporter.finish(id, transaction.state()))
    }

    /// Acquires a fresh session from `provider`, runs `batch` on it and releases it.
    pub fn run_with<P>(&self, provider: &P, batch: Batch) -> ExecutorResult
    where
        P: SessionProvider + ?Sized,
    {
        let mut session = provider
            .acquire()
            .map_err(|err| BatchError::SessionUnavailable(describe(err)))?;
        self.run(&mut session, batch)
    }
}

/// Message of an error reported by a session.
fn describe(err: BatchError) -> String {
    match err {
        BatchError::Session(message) | BatchError::SessionUnavailable(message) => message,
        other => other.to_string(),
    }
}

/// Scope of one transaction on a borrowed session.
///
/// Dropping the guard rolls back a transaction that is still open (a panic
/// unwinding through the run) and always restores the prior auto-commit mode.
struct TransactionGuard<'s, S: Session + ?Sized> {
    session: &'s mut S,
    prior_auto_commit: bool,
    state: TransactionState,
}

impl<'s, S: Session + ?Sized> TransactionGuard<'s, S> {
    fn begin(session: &'s mut S) -> Result<Self, BatchError> {
        let prior_auto_commit = session
            .disable_auto_commit()
            .map_err(|err| BatchError::SessionUnavailable(describe(err)))?;

        debug!(
            "Transaction open, prior auto-commit mode: {}",
            prior_auto_commit
        );

        Ok(Self {
            session,
            prior_auto_commit,
            state: TransactionState::TransactionOpen,
        })
    }

    fn state(&self) -> TransactionState {
        self.state
    }

    fn execute(&mut self, statement: &Statement) -> SessionResult<u64> {
        debug!("Executing statement: {}", statement);
        self.session
            .execute_statement(statement.template(), statement.parameters())
    }

    fn commit(&mut self) -> Result<(), BatchError> {
        match self.session.commit() {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(err) => {
                let message = describe(err);
                warn!("Commit failed: {}, rolling back", message);
                self.rollback(None, format!("commit failed: {}", message))?;
                Err(BatchError::CommitFailed(message))
            }
        }
    }

    fn rollback(&mut self, failure_index: Option<usize>, cause: String) -> Result<(), BatchError> {
        match self.session.rollback() {
            Ok(()) => {
                self.state = TransactionState::RolledBack;
                Ok(())
            }
            Err(err) => {
                self.state = TransactionState::RollbackFailed;
                let rollback_error = describe(err);
                error!(
                    "Rollback failed after {}: {}. The store may hold a partially applied batch",
                    cause, rollback_error
                );
                Err(BatchError::RollbackFailed {
                    failure_index,
                    cause,
                    rollback_error,
                })
            }
        }
    }
}

impl<S: Session + ?Sized> Drop for TransactionGuard<'_, S> {
    fn drop(&mut self) {
        if self.state == TransactionState::TransactionOpen {
            warn!("Transaction left open, rolling back");
            match self.session.rollback() {
                Ok(()) => self.state = TransactionState::RolledBack,
                Err(err) => {
                    self.state = TransactionState::RollbackFailed;
                    error!("Rollback of abandoned transaction failed: {}", err);
                }
            }
        }

        if self.state == TransactionState::RollbackFailed {
            warn!("Restoring auto-commit after a failed rollback");
        }

        if let Err(err) = self.session.restore_auto_commit(self.prior_auto_commit) {
            warn!("Non-fatal error: auto-commit mode not restored: {}", err);
        }
    }
}
