use crate::{DataType, QueryResult, Result, Value, stream::BoxStream};
use std::{fmt::Display, time::Duration};

/// A driver command with its parameters, ready to run.
///
/// Bind indexes start from 0. `execute` consumes the command so it can run only once, dropping
/// the returned stream must release every resource the command holds on the driver side.
pub trait Statement: Send + Display {
    fn bind(&mut self, index: usize, value: Value) -> Result<()>;
    /// Bind a NULL, drivers usually need its type.
    fn bind_null(&mut self, index: usize, data_type: DataType) -> Result<()>;
    /// Number of placeholders in the SQL text, when the driver knows it.
    fn parameter_count(&self) -> Option<usize> {
        None
    }
    fn fetch_size(&mut self, _rows: u32) -> Result<()> {
        Ok(())
    }
    fn timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
    /// Ask the backend to return the generated values of these columns as rows.
    fn return_generated_values(&mut self, _columns: &[String]) -> Result<()> {
        Ok(())
    }
    fn execute(self: Box<Self>) -> BoxStream<'static, Result<QueryResult>>;
}
