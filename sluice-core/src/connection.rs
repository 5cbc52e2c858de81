use crate::{Result, Statement, future::BoxFuture};

/// A live connection to the backend.
///
/// The executor reaches the connection only through `&mut dyn Connection`, one statement at a
/// time, so implementations never see two commands in flight.
pub trait Connection: Send {
    /// Create an executable command for already resolved SQL text.
    fn create_statement(&mut self, sql: &str) -> Result<Box<dyn Statement>>;
    /// Start an explicit transaction, the connection leaves auto-commit mode.
    fn begin(&mut self) -> BoxFuture<'_, Result<()>>;
    fn commit(&mut self) -> BoxFuture<'_, Result<()>>;
    fn rollback(&mut self) -> BoxFuture<'_, Result<()>>;
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}
