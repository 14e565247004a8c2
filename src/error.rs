use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
/// Batch error
pub enum BatchError {
    /// The number of bound parameters does not match the placeholders of the template.
    #[error("Malformed statement `{template}`: expected {expected} parameter(s), got {actual}")]
    MalformedStatement {
        template: String,
        expected: usize,
        actual: usize,
    },

    /// The template uses a placeholder that cannot be bound by position.
    #[error("Malformed statement `{template}`: unsupported placeholder `{placeholder}`, use `?`, `?NNN` or `$NNN`")]
    UnsupportedPlaceholder {
        template: String,
        placeholder: String,
    },

    /// The session could not be reached or could not leave auto-commit mode.
    /// No transaction was opened.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// Raw error reported by a session operation.
    #[error("Session error: {0}")]
    Session(String),

    /// A statement of the batch failed. The transaction was rolled back.
    #[error("Statement {index} failed: {message}")]
    StatementExecutionFailed { index: usize, message: String },

    /// Rolling back after a failure did not succeed: the store may hold a
    /// partially applied batch.
    /// `failure_index` is `None` when the rollback followed a failed commit.
    #[error("Rollback failed after {cause}: {rollback_error}")]
    RollbackFailed {
        failure_index: Option<usize>,
        cause: String,
        rollback_error: String,
    },

    /// Every statement succeeded but the commit did not. The transaction was rolled back.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_message() {
        let err = BatchError::Session("database is locked".to_string());
        assert_eq!(err.to_string(), "Session error: database is locked");
    }

    #[test]
    fn unsupported_placeholder_message_names_the_placeholder() {
        let err = BatchError::UnsupportedPlaceholder {
            template: "delete from t where id = :id".to_string(),
            placeholder: ":id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed statement `delete from t where id = :id`: unsupported placeholder `:id`, use `?`, `?NNN` or `$NNN`"
        );
    }
}
