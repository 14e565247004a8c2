use serde::{Deserialize, Serialize};

use crate::BatchError;

use super::statement::{Statement, StatementTemplate, Value};

/// An ordered group of statements submitted together.
///
/// Insertion order is execution order. A batch is handed by value to
/// [`TransactionalExecutor::run`](crate::core::executor::TransactionalExecutor::run),
/// so each run consumes its own batch.
///
/// # Examples
///
/// ```
/// use batch_tx::core::batch::Batch;
/// use batch_tx::core::statement::Statement;
///
/// let mut batch = Batch::new();
/// batch.add(Statement::raw("update transactions set transaction_amount=1 where id=341").unwrap());
/// batch.add(Statement::raw("update transactions set transaction_amount=2 where id=342").unwrap());
///
/// assert_eq!(batch.len(), 2);
/// assert!(!batch.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    statements: Vec<Statement>,
}

impl Batch {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }

    /// Appends a statement at the end of the batch.
    pub fn add(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Chainable variant of [`Batch::add`].
    pub fn with(mut self, statement: Statement) -> Self {
        self.add(statement);
        self
    }

    /// Binds every row of parameters against `template` and appends the resulting statements.
    ///
    /// Rows are validated before anything is appended: when one row does not
    /// fill the template, the batch is left untouched.
    ///
    /// # Errors
    ///
    /// `BatchError::MalformedStatement` for the first row whose parameter count is wrong.
    pub fn add_all<I>(&mut self, template: &StatementTemplate, rows: I) -> Result<(), BatchError>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let bound = rows
            .into_iter()
            .map(|row| template.bind(row))
            .collect::<Result<Vec<_>, _>>()?;
        self.statements.extend(bound);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Reads a batch from a JSON array of statements, validating each one.
    pub fn from_json_str(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json).map_err(|e| BatchError::Configuration(e.to_string()))
    }
}

impl FromIterator<Statement> for Batch {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
