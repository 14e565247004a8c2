use std::fmt::Debug;

use log::{debug, info, warn};

use crate::core::{
    session::{Session, SessionResult},
    statement::Value,
};

/// Wraps a session and logs every call before forwarding it.
#[derive(Debug)]
pub struct LoggingSession<S> {
    inner: S,
}

impl<S: Session> LoggingSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

fn log_result<T: Debug>(operation: &str, result: &SessionResult<T>) {
    match result {
        Ok(value) => debug!("{} -> {:?}", operation, value),
        Err(err) => warn!("{} failed: {}", operation, err),
    }
}

impl<S: Session> Session for LoggingSession<S> {
    fn disable_auto_commit(&mut self) -> SessionResult<bool> {
        info!("Disabling auto-commit");
        let result = self.inner.disable_auto_commit();
        log_result("disable_auto_commit", &result);
        result
    }

    fn restore_auto_commit(&mut self, prior: bool) -> SessionResult<()> {
        info!("Restoring auto-commit: {}", prior);
        let result = self.inner.restore_auto_commit(prior);
        log_result("restore_auto_commit", &result);
        result
    }

    fn commit(&mut self) -> SessionResult<()> {
        info!("Commit");
        let result = self.inner.commit();
        log_result("commit", &result);
        result
    }

    fn rollback(&mut self) -> SessionResult<()> {
        info!("Rollback");
        let result = self.inner.rollback();
        log_result("rollback", &result);
        result
    }

    fn execute_statement(&mut self, template: &str, parameters: &[Value]) -> SessionResult<u64> {
        info!("Statement:{} Parameters:{:?}", template, parameters);
        let result = self.inner.execute_statement(template, parameters);
        log_result("execute_statement", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{batch::Batch, executor::TransactionalExecutor, statement::Statement},
        BatchError,
    };

    #[derive(Default)]
    struct CountingSession {
        executed: Vec<String>,
        committed: bool,
    }

    impl Session for CountingSession {
        fn disable_auto_commit(&mut self) -> SessionResult<bool> {
            Ok(true)
        }

        fn restore_auto_commit(&mut self, _prior: bool) -> SessionResult<()> {
            Ok(())
        }

        fn commit(&mut self) -> SessionResult<()> {
            self.committed = true;
            Ok(())
        }

        fn rollback(&mut self) -> SessionResult<()> {
            Err(BatchError::Session("not expected".to_string()))
        }

        fn execute_statement(&mut self, template: &str, _parameters: &[Value]) -> SessionResult<u64> {
            self.executed.push(template.to_string());
            Ok(2)
        }
    }

    #[test]
    fn forwards_every_call() {
        let mut session = LoggingSession::new(CountingSession::default());
        let batch = Batch::new()
            .with(Statement::raw("delete from a").unwrap())
            .with(Statement::raw("delete from b").unwrap());

        let result = TransactionalExecutor::new().run(&mut session, batch).unwrap();

        assert_eq!(result.rows_affected(), vec![2, 2]);
        let inner = session.into_inner();
        assert_eq!(inner.executed, vec!["delete from a", "delete from b"]);
        assert!(inner.committed);
    }

    #[test]
    fn forwards_errors_unchanged() {
        let mut session = LoggingSession::new(CountingSession::default());

        assert_eq!(
            session.rollback(),
            Err(BatchError::Session("not expected".to_string()))
        );
    }
}
