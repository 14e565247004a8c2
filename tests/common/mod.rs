mod mocks;

#[allow(unused_imports)]
pub use mocks::*;

use batch_tx::core::{batch::Batch, statement::Statement};

/// Batch of parameterless statements, in the given order.
#[allow(dead_code)]
pub fn batch_of(templates: &[&str]) -> Batch {
    templates
        .iter()
        .map(|t| Statement::raw(*t).expect("valid statement"))
        .collect()
}
