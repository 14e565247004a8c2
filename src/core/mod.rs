/// Parameter values, statements and reusable statement templates.
pub mod statement;

/// Ordered groups of statements.
pub mod batch;

/// The connection-like collaborator a batch runs against.
pub mod session;

/// Per-statement outcomes and the result of a run.
pub mod reporter;

/// All-or-nothing execution of a batch.
pub mod executor;
