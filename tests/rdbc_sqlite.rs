use batch_tx::{
    core::{
        batch::Batch,
        executor::TransactionalExecutor,
        session::{Session, SessionProvider},
        statement::{Statement, StatementTemplate, Value},
    },
    rdbc::{DatabaseConfig, SqliteSessionProvider},
    session::logger::LoggingSession,
};
use chrono::NaiveDate;
use sqlx::{Connection, SqliteConnection};
use tempfile::NamedTempFile;

const SCHEMA: &str = "CREATE TABLE transactions (
    id INTEGER PRIMARY KEY,
    account TEXT NOT NULL,
    transaction_amount REAL NOT NULL,
    transaction_date TEXT NOT NULL
)";

fn prepare_database(file: &NamedTempFile) -> anyhow::Result<SqliteSessionProvider> {
    let url = format!("sqlite://{}", file.path().display());
    let provider = SqliteSessionProvider::new(DatabaseConfig::new(&url));

    let mut session = provider.acquire()?;
    session.execute_statement(SCHEMA, &[])?;
    session.execute_statement(
        "INSERT INTO transactions (id, account, transaction_amount, transaction_date) VALUES
            (341, 'account1', 10.0, '2009-06-01 00:00:00'),
            (342, 'account1', 20.0, '2009-07-01 00:00:00'),
            (343, 'account2', 30.0, '2011-01-01 00:00:00')",
        &[],
    )?;
    session.close()?;

    Ok(provider)
}

/// Reads the amounts from a separate connection, outside any session of the crate.
fn amounts(provider: &SqliteSessionProvider) -> anyhow::Result<Vec<f64>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let url = provider.config().url().to_string();
    let amounts = runtime.block_on(async move {
        let mut connection = SqliteConnection::connect(&url).await?;
        sqlx::query_scalar::<_, f64>("SELECT transaction_amount FROM transactions ORDER BY id")
            .fetch_all(&mut connection)
            .await
    })?;
    Ok(amounts)
}

#[test]
fn committed_batch_is_visible_from_another_connection() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let file = NamedTempFile::new()?;
    let provider = prepare_database(&file)?;

    let update = StatementTemplate::new("update transactions set transaction_amount=? where id=?")?;
    let mut batch = Batch::new();
    batch.add_all(
        &update,
        [(341, 123.4), (342, 234.5), (343, 345.6)]
            .into_iter()
            .map(|(id, amount): (i64, f64)| vec![Value::from(amount), Value::from(id)]),
    )?;

    let result = TransactionalExecutor::new()
        .name("batch-update")
        .run_with(&provider, batch)?;

    assert!(result.committed());
    assert_eq!(result.rows_affected(), vec![1, 1, 1]);
    assert_eq!(amounts(&provider)?, vec![123.4, 234.5, 345.6]);
    Ok(())
}

#[test]
fn failed_transfer_is_rolled_back() -> anyhow::Result<()> {
    let file = NamedTempFile::new()?;
    let provider = prepare_database(&file)?;
    let now = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("valid date");

    let insert = StatementTemplate::new(
        "insert into transactions (account, transaction_amount, transaction_date) values (?, ?, ?)",
    )?;
    let batch = Batch::new()
        .with(insert.bind(vec!["account1".into(), Value::Double(-100.0), now.into()])?)
        // NULL account violates the NOT NULL constraint
        .with(insert.bind(vec![Value::Null, Value::Double(100.0), now.into()])?);

    let mut session = LoggingSession::new(provider.acquire()?);
    let result = TransactionalExecutor::new()
        .name("transfer")
        .run(&mut session, batch)?;

    assert!(!result.committed());
    assert_eq!(result.failure_index(), Some(1));
    assert_eq!(result.rows_affected(), vec![1]);
    assert!(session.get_ref().is_auto_commit());
    let mut session = session.into_inner();
    assert!(!session.in_transaction()?);
    session.close()?;

    assert_eq!(amounts(&provider)?, vec![10.0, 20.0, 30.0]);
    Ok(())
}

#[test]
fn independent_sessions_run_in_parallel() -> anyhow::Result<()> {
    let executor = TransactionalExecutor::new().name("parallel");
    let provider = SqliteSessionProvider::new(DatabaseConfig::new("sqlite::memory:"));

    let results = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker: i64| {
                let executor = &executor;
                let provider = &provider;
                scope.spawn(move || {
                    let batch = Batch::new()
                        .with(Statement::raw("CREATE TABLE t (id INTEGER PRIMARY KEY, worker INTEGER)")?)
                        .with(Statement::new("INSERT INTO t (worker) VALUES (?)", vec![Value::Int(worker)])?)
                        .with(Statement::new("INSERT INTO t (worker) VALUES (?)", vec![Value::Int(worker)])?);
                    executor.run_with(provider, batch)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker panicked"))
            .collect::<Vec<_>>()
    });

    for result in results {
        let result = result?;
        assert!(result.committed());
        assert_eq!(result.rows_affected(), vec![0, 1, 1]);
    }
    Ok(())
}

#[test]
fn trigger_rollback_keeps_the_session_atomic() -> anyhow::Result<()> {
    let file = NamedTempFile::new()?;
    let provider = prepare_database(&file)?;

    let mut session = provider.acquire()?;
    session.execute_statement(
        "CREATE TRIGGER no_overdraft BEFORE INSERT ON transactions
         WHEN NEW.transaction_amount < -1000
         BEGIN SELECT RAISE(ROLLBACK, 'overdraft'); END",
        &[],
    )?;

    let update = StatementTemplate::new("update transactions set transaction_amount=? where id=?")?;
    let executor = TransactionalExecutor::new().name("overdraft");

    // The trigger ends the transaction inside SQLite before the executor rolls back.
    let batch = Batch::new()
        .with(update.bind(vec![Value::Double(99.0), Value::Int(341)])?)
        .with(Statement::raw(
            "insert into transactions (account, transaction_amount, transaction_date) values ('account1', -5000.0, '2024-03-01 09:00:00')",
        )?);
    let result = executor.run(&mut session, batch)?;
    assert_eq!(result.failure_index(), Some(1));
    assert!(!session.in_transaction()?);

    // A later failing batch on the same session must not leave its first update behind.
    let batch = Batch::new()
        .with(update.bind(vec![Value::Double(7.0), Value::Int(342)])?)
        .with(Statement::raw("update missing_table set amount = 0")?);
    let result = executor.run(&mut session, batch)?;
    assert_eq!(result.failure_index(), Some(1));

    let batch = Batch::new().with(update.bind(vec![Value::Double(31.0), Value::Int(343)])?);
    assert!(executor.run(&mut session, batch)?.committed());
    session.close()?;

    assert_eq!(amounts(&provider)?, vec![10.0, 20.0, 31.0]);
    Ok(())
}
