use crate::{ExecutedStatement, MockDriver, script::ScriptItem};
use async_stream::stream;
use sluice_core::{
    DataType, Error, QueryResult, Result, Statement, Value, printable,
    stream::{BoxStream, StreamExt},
};
use std::{
    fmt::{self, Display},
    time::Duration,
};

/// One bind call received by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Null(DataType),
}

/// Counts the stream as disposed when dropped, exhausted or not.
struct DisposeGuard(MockDriver);

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.0.state().disposed += 1;
    }
}

pub struct MockStatement {
    driver: MockDriver,
    executed: ExecutedStatement,
}

impl MockStatement {
    pub(crate) fn new(driver: MockDriver, sql: &str) -> Self {
        let placeholders = sql.chars().filter(|c| *c == '?').count();
        Self {
            driver,
            executed: ExecutedStatement {
                sql: sql.to_string(),
                bindings: vec![None; placeholders],
                ..Default::default()
            },
        }
    }

    fn set(&mut self, index: usize, binding: Binding) -> Result<()> {
        let count = self.executed.bindings.len();
        let Some(slot) = self.executed.bindings.get_mut(index) else {
            let error = Error::msg(format!(
                "Bind index {index} is out of range, the statement has {count} placeholders"
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        *slot = Some(binding);
        Ok(())
    }
}

impl Display for MockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printable(&self.executed.sql))
    }
}

impl Statement for MockStatement {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        self.set(index, Binding::Value(value))
    }

    fn bind_null(&mut self, index: usize, data_type: DataType) -> Result<()> {
        self.set(index, Binding::Null(data_type))
    }

    fn parameter_count(&self) -> Option<usize> {
        Some(self.executed.bindings.len())
    }

    fn fetch_size(&mut self, rows: u32) -> Result<()> {
        self.executed.fetch_size = Some(rows);
        Ok(())
    }

    fn timeout(&mut self, timeout: Duration) -> Result<()> {
        self.executed.timeout = Some(timeout);
        Ok(())
    }

    fn return_generated_values(&mut self, columns: &[String]) -> Result<()> {
        self.executed.generated_columns = columns.to_vec();
        Ok(())
    }

    fn execute(self: Box<Self>) -> BoxStream<'static, Result<QueryResult>> {
        let MockStatement { driver, executed } = *self;
        let guard = DisposeGuard(driver.clone());
        stream! {
            let _guard = guard;
            let unbound = executed.bindings.iter().position(Option::is_none);
            let script = {
                let mut state = driver.state();
                state.executed.push(executed);
                state.scripts.pop_front().unwrap_or_default()
            };
            if let Some(index) = unbound {
                yield Err(Error::msg(format!("Parameter #{index} was not bound")));
                return;
            }
            for item in script.items {
                match item {
                    ScriptItem::Result(v) => yield Ok(v),
                    ScriptItem::Error(message) => {
                        let error = Error::msg(message);
                        log::error!("{:#}", error);
                        yield Err(error);
                        return;
                    }
                }
            }
        }
        .boxed()
    }
}
