use crate::{Binding, MockConnection, Script};
use sluice_core::{Driver, Error, Result, Value};
use std::{
    borrow::Cow,
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use url::Url;

/// What the driver received for one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub bindings: Vec<Option<Binding>>,
    pub fetch_size: Option<u32>,
    pub timeout: Option<Duration>,
    pub generated_columns: Vec<String>,
}

impl ExecutedStatement {
    /// Bound value at `index`, NULLs come back as the typed empty value.
    pub fn value(&self, index: usize) -> Option<Value> {
        match self.bindings.get(index)?.as_ref()? {
            Binding::Value(v) => Some(v.clone()),
            Binding::Null(data_type) => Some(data_type.empty_value()),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) scripts: VecDeque<Script>,
    pub(crate) executed: Vec<ExecutedStatement>,
    pub(crate) connect_error: Option<String>,
    pub(crate) prepare_error: Option<String>,
    pub(crate) connects: usize,
    pub(crate) begins: usize,
    pub(crate) commits: usize,
    pub(crate) rollbacks: usize,
    pub(crate) closes: usize,
    pub(crate) disposed: usize,
}

/// In memory driver answering every statement with the next queued [`Script`].
///
/// Clones share the same state, keep one in the test to inspect what the pipeline did.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the response of the next executed statement. Statements without a queued script
    /// return nothing.
    pub fn respond(&self, script: Script) -> &Self {
        self.state().scripts.push_back(script);
        self
    }

    pub fn fail_connect(&self, message: impl Into<String>) -> &Self {
        self.state().connect_error = Some(message.into());
        self
    }

    pub fn fail_prepare(&self, message: impl Into<String>) -> &Self {
        self.state().prepare_error = Some(message.into());
        self
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state().executed.clone()
    }
    pub fn last_executed(&self) -> Option<ExecutedStatement> {
        self.state().executed.last().cloned()
    }
    pub fn connects(&self) -> usize {
        self.state().connects
    }
    pub fn begins(&self) -> usize {
        self.state().begins
    }
    pub fn commits(&self) -> usize {
        self.state().commits
    }
    pub fn rollbacks(&self) -> usize {
        self.state().rollbacks
    }
    pub fn closes(&self) -> usize {
        self.state().closes
    }
    /// Result streams released, either exhausted or dropped.
    pub fn disposed(&self) -> usize {
        self.state().disposed
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    const NAME: &'static str = "mock";

    async fn connect(&self, url: Cow<'static, str>) -> Result<MockConnection> {
        let prefix = format!("{}://", <Self as Driver>::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "Mock connection url must start with `{}`, found `{}`",
                &prefix, url
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Url::parse(&url).map_err(|e| Error::new(e).context(format!("Invalid url `{}`", url)))?;
        let mut state = self.state();
        state.connects += 1;
        if let Some(message) = &state.connect_error {
            return Err(Error::msg(message.clone()));
        }
        Ok(MockConnection::new(self.clone()))
    }
}
