use batch_tx::{
    core::{
        batch::Batch,
        executor::TransactionalExecutor,
        session::Session,
        statement::{StatementTemplate, Value},
    },
    rdbc::{DatabaseConfig, SqliteSession},
    session::logger::LoggingSession,
    BatchError,
};

const SCHEMA: &str = "CREATE TABLE transactions (
    id INTEGER PRIMARY KEY,
    account TEXT NOT NULL,
    transaction_amount REAL NOT NULL,
    transaction_date TEXT NOT NULL
)";

/// Debits `from` and credits `to` with the same amount, at the same instant.
fn transfer(
    insert: &StatementTemplate,
    from: Option<&str>,
    to: &str,
    amount: f64,
) -> Result<Batch, BatchError> {
    let now = chrono::Local::now().naive_local();
    let debit = insert.bind(vec![from.into(), Value::Double(-amount), now.into()])?;
    let credit = insert.bind(vec![to.into(), Value::Double(amount), now.into()])?;
    Ok(Batch::new().with(debit).with(credit))
}

fn main() -> Result<(), BatchError> {
    env_logger::init();

    let config = DatabaseConfig::new("sqlite::memory:");
    let mut session = LoggingSession::new(SqliteSession::connect(&config)?);
    session.execute_statement(SCHEMA, &[])?;

    let insert = StatementTemplate::new(
        "insert into transactions (account, transaction_amount, transaction_date) values (?, ?, ?)",
    )?;
    let executor = TransactionalExecutor::new().name("account-transfer");

    let mut stored: u64 = 0;

    let result = executor.run(&mut session, transfer(&insert, Some("account1"), "account2", 100.0)?)?;
    if result.committed() {
        stored += result.rows_affected().iter().sum::<u64>();
    }
    println!(
        "first transfer: committed={}, rows affected={:?}",
        result.committed(),
        result.rows_affected()
    );

    // The debit has no account: the credit never runs and nothing is kept.
    let result = executor.run(&mut session, transfer(&insert, None, "account2", 50.0)?)?;
    match result.failure() {
        Some(error) => println!("second transfer rolled back: {}", error),
        None => {
            stored += result.rows_affected().iter().sum::<u64>();
            println!("second transfer committed");
        }
    }

    println!("transactions stored: {}", stored);

    session.into_inner().close()
}
