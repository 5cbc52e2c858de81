use crate::{
    Configuration, Driver, Error, ErrorKind, Executor, Parameter, Result, ResultItem, RowBounds,
    Transaction,
    stream::{Stream, StreamExt, TryStreamExt},
};
use async_stream::try_stream;
use std::{
    any::Any,
    borrow::Cow,
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Unit of work over one executor, addressing statements by id.
///
/// Tracks whether something was modified so `commit` and `rollback` only reach the connection
/// when there is something to finish.
pub struct Session<D: Driver> {
    configuration: Arc<Configuration>,
    executor: Executor<D>,
    auto_commit: bool,
    dirty: AtomicBool,
}

impl<D: Driver> Session<D> {
    pub fn new(
        configuration: Arc<Configuration>,
        driver: D,
        url: impl Into<Cow<'static, str>>,
        auto_commit: bool,
    ) -> Self {
        Self::with_transaction(configuration, Transaction::new(driver, url, auto_commit))
    }

    pub fn with_transaction(configuration: Arc<Configuration>, transaction: Transaction<D>) -> Self {
        let auto_commit = transaction.is_auto_commit();
        Self {
            executor: Executor::new(configuration.clone(), transaction),
            configuration,
            auto_commit,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn executor(&self) -> &Executor<D> {
        &self.executor
    }

    /// At most one mapped row, more than one is an error.
    pub async fn select_one<T: Any + Send, P: Parameter>(
        &self,
        id: &str,
        parameter: &P,
    ) -> Result<Option<T>> {
        let mut rows = self
            .select::<T, P>(id, parameter, RowBounds::default())
            .take(2)
            .try_collect::<Vec<_>>()
            .await?;
        if rows.len() > 1 {
            return Err(Error::new(ErrorKind::Mapping(format!(
                "Expected one result (or none) to be returned by `{id}`, but found more"
            ))));
        }
        Ok(rows.pop())
    }

    pub async fn select_list<T: Any + Send, P: Parameter>(
        &self,
        id: &str,
        parameter: &P,
        row_bounds: RowBounds,
    ) -> Result<Vec<T>> {
        self.select::<T, P>(id, parameter, row_bounds)
            .try_collect()
            .await
    }

    pub fn select<'a, T: Any + Send, P: Parameter>(
        &'a self,
        id: &'a str,
        parameter: &'a P,
        row_bounds: RowBounds,
    ) -> impl Stream<Item = Result<T>> + Send + 'a {
        try_stream! {
            let statement = self.configuration.mapped_statement(id)?;
            let mut stream = pin!(self.executor.query::<T, P>(statement, parameter, row_bounds));
            while let Some(value) = stream.next().await {
                yield value?;
            }
        }
    }

    /// Every result item of a statement declaring several result maps.
    pub fn select_results<'a, P: Parameter>(
        &'a self,
        id: &'a str,
        parameter: &'a P,
        row_bounds: RowBounds,
    ) -> impl Stream<Item = Result<ResultItem>> + Send + 'a {
        try_stream! {
            let statement = self.configuration.mapped_statement(id)?;
            let mut stream = pin!(self.executor.query_results(statement, parameter, row_bounds));
            while let Some(value) = stream.next().await {
                yield value?;
            }
        }
    }

    pub async fn insert<P: Parameter>(&self, id: &str, parameter: &mut P) -> Result<u64> {
        self.update(id, parameter).await
    }

    pub async fn update<P: Parameter>(&self, id: &str, parameter: &mut P) -> Result<u64> {
        self.dirty.store(true, Ordering::Release);
        let statement = self.configuration.mapped_statement(id)?;
        self.executor.update(statement, parameter).await
    }

    pub async fn delete<P: Parameter>(&self, id: &str, parameter: &mut P) -> Result<u64> {
        self.update(id, parameter).await
    }

    pub async fn commit(&self, force: bool) -> Result<()> {
        self.executor.commit(self.is_commit_or_rollback_required(force)).await?;
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    pub async fn rollback(&self, force: bool) -> Result<()> {
        self.executor.rollback(self.is_commit_or_rollback_required(force)).await?;
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Roll back pending modifications and release the connection.
    pub async fn close(&self) -> Result<()> {
        let result = self
            .executor
            .close(self.is_commit_or_rollback_required(false))
            .await;
        self.dirty.store(false, Ordering::Release);
        result
    }

    pub fn clear_cache(&self) {
        self.executor.clear_local_cache();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn is_commit_or_rollback_required(&self, force: bool) -> bool {
        (!self.auto_commit && self.is_dirty()) || force
    }
}
