use serde::Serialize;
use uuid::Uuid;

use crate::BatchError;

use super::executor::TransactionState;

/// Outcome of one statement of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatementOutcome {
    /// The statement ran and touched this many rows.
    RowsAffected(u64),
    /// The statement failed with this error message.
    Failed(String),
}

impl StatementOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StatementOutcome::RowsAffected(_))
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            StatementOutcome::RowsAffected(rows) => Some(*rows),
            StatementOutcome::Failed(_) => None,
        }
    }
}

/// What a run did to the store.
///
/// When `committed` is true every outcome is a success. Otherwise the outcomes
/// before `failure_index` succeeded and were rolled back, the outcome at
/// `failure_index` is the failure, and no later statement ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    id: Uuid,
    outcomes: Vec<StatementOutcome>,
    committed: bool,
    failure_index: Option<usize>,
    state: TransactionState,
}

impl ExecutionResult {
    /// Identifier of the run, as written in the logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn outcomes(&self) -> &[StatementOutcome] {
        &self.outcomes
    }

    pub fn committed(&self) -> bool {
        self.committed
    }

    pub fn failure_index(&self) -> Option<usize> {
        self.failure_index
    }

    /// Terminal state of the transaction: `Committed` or `RolledBack`.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Rows affected by each statement that ran successfully.
    pub fn rows_affected(&self) -> Vec<u64> {
        self.outcomes
            .iter()
            .filter_map(StatementOutcome::rows_affected)
            .collect()
    }

    /// The failed statement as a `StatementExecutionFailed` error, if any.
    pub fn failure(&self) -> Option<BatchError> {
        let index = self.failure_index?;
        match self.outcomes.get(index) {
            Some(StatementOutcome::Failed(message)) => Some(BatchError::StatementExecutionFailed {
                index,
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

/// Collects statement outcomes while a batch runs.
///
/// Recording never fails and never changes the executor's control flow.
#[derive(Debug, Default)]
pub struct ResultReporter {
    outcomes: Vec<StatementOutcome>,
}

impl ResultReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    /// Appends the outcome of statement `index`. Statements are recorded in
    /// execution order, so `index` is always the number of outcomes recorded so far.
    pub fn record(&mut self, index: usize, outcome: StatementOutcome) {
        debug_assert_eq!(index, self.outcomes.len(), "outcomes must be recorded in order");
        self.outcomes.push(outcome);
    }

    pub fn summary(&self) -> &[StatementOutcome] {
        &self.outcomes
    }

    /// Index of the first failed outcome.
    pub fn failure_index(&self) -> Option<usize> {
        self.outcomes.iter().position(|o| !o.is_success())
    }

    /// Closes the report once the transaction reached a terminal state.
    pub(crate) fn finish(self, id: Uuid, state: TransactionState) -> ExecutionResult {
        let failure_index = self.failure_index();
        ExecutionResult {
            id,
            committed: state == TransactionState::Committed,
            failure_index,
            outcomes: self.outcomes,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_order() {
        let mut reporter = ResultReporter::new();
        reporter.record(0, StatementOutcome::RowsAffected(1));
        reporter.record(1, StatementOutcome::RowsAffected(4));

        assert_eq!(
            reporter.summary(),
            &[StatementOutcome::RowsAffected(1), StatementOutcome::RowsAffected(4)]
        );
        assert_eq!(reporter.failure_index(), None);
    }

    #[test]
    fn finish_committed() {
        let mut reporter = ResultReporter::with_capacity(2);
        reporter.record(0, StatementOutcome::RowsAffected(1));
        reporter.record(1, StatementOutcome::RowsAffected(2));

        let result = reporter.finish(Uuid::new_v4(), TransactionState::Committed);

        assert!(result.committed());
        assert_eq!(result.failure_index(), None);
        assert_eq!(result.rows_affected(), vec![1, 2]);
        assert_eq!(result.failure(), None);
    }

    #[test]
    fn finish_rolled_back() {
        let mut reporter = ResultReporter::new();
        reporter.record(0, StatementOutcome::RowsAffected(1));
        reporter.record(1, StatementOutcome::Failed("no such table: b".to_string()));

        let result = reporter.finish(Uuid::new_v4(), TransactionState::RolledBack);

        assert!(!result.committed());
        assert_eq!(result.state(), TransactionState::RolledBack);
        assert_eq!(result.failure_index(), Some(1));
        assert_eq!(result.rows_affected(), vec![1]);
        assert_eq!(
            result.failure(),
            Some(BatchError::StatementExecutionFailed {
                index: 1,
                message: "no such table: b".to_string()
            })
        );
    }
}
