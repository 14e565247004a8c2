mod common;

use common::{batch_of, MockSession};

use batch_tx::{
    core::{executor::TransactionalExecutor, statement::Value},
    BatchError,
};
use mockall::predicate::eq;

#[test]
fn rollback_failure_is_distinct_from_statement_failure() {
    let mut session = MockSession::new();
    session.expect_disable_auto_commit().times(1).returning(|| Ok(true));
    session
        .expect_execute_statement()
        .times(1)
        .returning(|_: &str, _: &[Value]| Err(BatchError::Session("constraint violated".to_string())));
    session
        .expect_rollback()
        .times(1)
        .returning(|| Err(BatchError::Session("connection lost".to_string())));
    session.expect_commit().never();
    session
        .expect_restore_auto_commit()
        .with(eq(true))
        .times(1)
        .returning(|_| Ok(()));

    let result = TransactionalExecutor::new().run(&mut session, batch_of(&["update A", "update B"]));

    match result {
        Err(BatchError::RollbackFailed {
            failure_index,
            cause,
            rollback_error,
        }) => {
            assert_eq!(failure_index, Some(0));
            assert!(cause.contains("constraint violated"));
            assert_eq!(rollback_error, "connection lost");
        }
        Err(BatchError::StatementExecutionFailed { .. }) => {
            panic!("rollback failure reported as a statement failure")
        }
        other => panic!("expected RollbackFailed, got {:?}", other),
    }
}

#[test]
fn unreachable_session_fails_before_any_statement() {
    let mut session = MockSession::new();
    session
        .expect_disable_auto_commit()
        .times(1)
        .returning(|| Err(BatchError::Session("broken pipe".to_string())));
    session.expect_execute_statement().never();
    session.expect_commit().never();
    session.expect_rollback().never();
    session.expect_restore_auto_commit().never();

    let result = TransactionalExecutor::new().run(&mut session, batch_of(&["update A"]));

    assert_eq!(
        result,
        Err(BatchError::SessionUnavailable("broken pipe".to_string()))
    );
}

#[test]
fn failed_commit_is_rolled_back() {
    let mut session = MockSession::new();
    session.expect_disable_auto_commit().returning(|| Ok(true));
    session
        .expect_execute_statement()
        .times(2)
        .returning(|_, _| Ok(3));
    session
        .expect_commit()
        .times(1)
        .returning(|| Err(BatchError::Session("database is locked".to_string())));
    session.expect_rollback().times(1).returning(|| Ok(()));
    session
        .expect_restore_auto_commit()
        .times(1)
        .returning(|_| Ok(()));

    let result = TransactionalExecutor::new().run(&mut session, batch_of(&["update A", "update B"]));

    assert_eq!(
        result,
        Err(BatchError::CommitFailed("database is locked".to_string()))
    );
}

#[test]
fn restore_failure_is_not_fatal() {
    let mut session = MockSession::new();
    session.expect_disable_auto_commit().returning(|| Ok(true));
    session.expect_execute_statement().returning(|_, _| Ok(1));
    session.expect_commit().times(1).returning(|| Ok(()));
    session
        .expect_restore_auto_commit()
        .times(1)
        .returning(|_| Err(BatchError::Session("read-only connection".to_string())));

    let result = TransactionalExecutor::new()
        .run(&mut session, batch_of(&["update A"]))
        .unwrap();

    assert!(result.committed());
}

#[test]
fn malformed_statement_never_reaches_the_executor() {
    let result = batch_tx::core::statement::Statement::new(
        "insert into transactions (transaction_amount, transaction_date) values (?, ?)",
        vec![Value::Double(-100.0)],
    );

    assert_eq!(
        result,
        Err(BatchError::MalformedStatement {
            template: "insert into transactions (transaction_amount, transaction_date) values (?, ?)"
                .to_string(),
            expected: 2,
            actual: 1,
        })
    );
}
