#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # batch-tx

 Execute a batch of parameterized statements as a single all-or-nothing transaction.

 Statements are grouped and sent together, but a database still executes each of
 them individually: when a later statement fails, the earlier ones are already
 applied. `batch-tx` runs the whole batch inside one transaction so that a failure
 rolls every statement back and the store never holds half a batch.

 ## Core Concepts

- **Statement:** A SQL template with `?` placeholders and the values bound to them. The parameter count is checked when the statement is built.
- **Batch:** An ordered list of statements. Insertion order is execution order.
- **Session:** The connection-like resource a batch runs against. It is borrowed exclusively for the whole run.
- **TransactionalExecutor:** Disables auto-commit, runs each statement in order, commits when all succeed, rolls back at the first failure and restores the previous auto-commit mode on every exit path.
- **ExecutionResult:** What a run did: rows affected per statement, whether it committed, and the index of the failing statement.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| rdbc-sqlite   | Enables a `Session` and `SessionProvider` for SQLite (SQLx)   |
| logger        | Enables a `Session` decorator logging every call              |
| full          | Enables all available features                                |

 ## Getting Started
 Make sure you activated the suitable features crate on Cargo.toml:

```toml
[dependencies]
batch-tx = { version = "<version>", features = ["<full|rdbc-sqlite|logger>"] }
```

Then, on your main.rs:

```rust,no_run
# #[cfg(feature = "rdbc-sqlite")]
# fn main() -> Result<(), batch_tx::BatchError> {
use batch_tx::{
    core::{
        batch::Batch,
        executor::TransactionalExecutor,
        statement::{StatementTemplate, Value},
    },
    rdbc::{DatabaseConfig, SqliteSessionProvider},
};

let provider = SqliteSessionProvider::new(DatabaseConfig::new("sqlite://bank.db"));

let update = StatementTemplate::new("update transactions set transaction_amount=? where id=?")?;
let mut batch = Batch::new();
batch.add_all(
    &update,
    vec![
        vec![Value::from(123.4), Value::from(341)],
        vec![Value::from(234.5), Value::from(342)],
        vec![Value::from(345.6), Value::from(343)],
    ],
)?;

let result = TransactionalExecutor::new().run_with(&provider, batch)?;

match result.failure() {
    None => println!("committed: {:?}", result.rows_affected()),
    Some(error) => println!("rolled back: {}", error),
}
# Ok(())
# }
# #[cfg(not(feature = "rdbc-sqlite"))]
# fn main() {}
```

 ## Error Handling

 A failing statement is not an error of the run: it is reported inside the
 `ExecutionResult` and the transaction is rolled back. Errors returned by
 `run` are fatal:

 - `SessionUnavailable`: auto-commit could not be disabled, no transaction was opened.
 - `RollbackFailed`: the rollback itself failed, the store may hold a partial batch.
 - `CommitFailed`: every statement succeeded but the commit did not; the transaction was rolled back.

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch execution
pub mod core;

/// Error types for batch execution
pub mod error;

#[doc(inline)]
pub use error::*;

/// Session decorators
pub mod session;

#[cfg(feature = "rdbc-sqlite")]
/// Relational database sessions (SQLite via SQLx)
pub mod rdbc;
