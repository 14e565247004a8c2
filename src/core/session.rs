use crate::BatchError;

use super::statement::Value;

/// Type alias for the results of session operations.
pub type SessionResult<T> = Result<T, BatchError>;

/// A connection-like resource to a backing store.
///
/// A session is handed to the executor already opened and authenticated. The
/// executor borrows it mutably for the whole of one run, so a session is never
/// shared between concurrent batches.
///
/// The contract follows JDBC's `Connection`: while auto-commit is enabled every
/// statement is its own transaction; once disabled, statements accumulate in a
/// transaction that ends with [`Session::commit`] or [`Session::rollback`].
///
/// Every method may block on I/O.
pub trait Session {
    /// Leaves auto-commit mode and returns the mode the session was in before.
    fn disable_auto_commit(&mut self) -> SessionResult<bool>;

    /// Puts the session back in the auto-commit mode returned by
    /// [`Session::disable_auto_commit`].
    ///
    /// It is also called after a failed rollback, so it must never make a
    /// still-open transaction durable: discard it or leave it open.
    fn restore_auto_commit(&mut self, prior: bool) -> SessionResult<()>;

    /// Durably applies the current transaction.
    fn commit(&mut self) -> SessionResult<()>;

    /// Undoes every change of the current transaction.
    fn rollback(&mut self) -> SessionResult<()>;

    /// Binds `parameters` to the placeholders of `template`, executes it and
    /// returns the number of rows affected.
    fn execute_statement(&mut self, template: &str, parameters: &[Value]) -> SessionResult<u64>;
}

impl<S: Session + ?Sized> Session for &mut S {
    fn disable_auto_commit(&mut self) -> SessionResult<bool> {
        (**self).disable_auto_commit()
    }

    fn restore_auto_commit(&mut self, prior: bool) -> SessionResult<()> {
        (**self).restore_auto_commit(prior)
    }

    fn commit(&mut self) -> SessionResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> SessionResult<()> {
        (**self).rollback()
    }

    fn execute_statement(&mut self, template: &str, parameters: &[Value]) -> SessionResult<u64> {
        (**self).execute_statement(template, parameters)
    }
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn disable_auto_commit(&mut self) -> SessionResult<bool> {
        (**self).disable_auto_commit()
    }

    fn restore_auto_commit(&mut self, prior: bool) -> SessionResult<()> {
        (**self).restore_auto_commit(prior)
    }

    fn commit(&mut self) -> SessionResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> SessionResult<()> {
        (**self).rollback()
    }

    fn execute_statement(&mut self, template: &str, parameters: &[Value]) -> SessionResult<u64> {
        (**self).execute_statement(template, parameters)
    }
}

/// Supplies open sessions. Pooling, credentials and reconnection live behind
/// this trait, never in the executor.
pub trait SessionProvider {
    type Session: Session;

    fn acquire(&self) -> SessionResult<Self::Session>;
}
