//! Mock version of a database session.
use batch_tx::core::{
    session::{Session, SessionResult},
    statement::Value,
};
use mockall::mock;

mock! {
    pub Session {}
    impl Session for Session {
        fn disable_auto_commit(&mut self) -> SessionResult<bool>;
        fn restore_auto_commit(&mut self, prior: bool) -> SessionResult<()>;
        fn commit(&mut self) -> SessionResult<()>;
        fn rollback(&mut self) -> SessionResult<()>;
        fn execute_statement(&mut self, template: &str, parameters: &[Value]) -> SessionResult<u64>;
    }
}
