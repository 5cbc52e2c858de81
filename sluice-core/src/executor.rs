use crate::{
    AutoMappingCache, Configuration, Driver, Error, ErrorKind, MappedStatement, Parameter, Result,
    ResultItem, RowBounds, Transaction, prepare_statement,
    stream::{Stream, StreamExt, TryStreamExt},
};
use anyhow::Context;
use async_stream::try_stream;
use std::{
    any::Any,
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::Mutex;

/// Runs mapped statements over the connection of its transaction.
///
/// Statements are serialized on the transaction lock, a query keeps the lock until its stream
/// is exhausted or dropped.
pub struct Executor<D: Driver> {
    configuration: Arc<Configuration>,
    transaction: Mutex<Transaction<D>>,
    closed: AtomicBool,
    local_cache: AutoMappingCache,
}

impl<D: Driver> Executor<D> {
    pub fn new(configuration: Arc<Configuration>, transaction: Transaction<D>) -> Self {
        Self {
            configuration,
            transaction: Mutex::new(transaction),
            closed: AtomicBool::new(false),
            local_cache: Default::default(),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn local_cache(&self) -> &AutoMappingCache {
        &self.local_cache
    }

    pub fn clear_local_cache(&self) {
        self.local_cache.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::new(ErrorKind::Execution(
                "The executor was closed".into(),
            )));
        }
        Ok(())
    }

    /// Run an insert, update or delete and return the number of affected rows.
    ///
    /// Generated keys are written back into `parameter`.
    pub async fn update<P: Parameter>(
        &self,
        statement: &MappedStatement,
        parameter: &mut P,
    ) -> Result<u64> {
        let result = async {
            self.ensure_open()?;
            self.clear_local_cache();
            let mut handler = self.configuration.new_statement_handler(
                statement,
                &*parameter,
                RowBounds::default(),
                self.local_cache.clone(),
            )?;
            let mut transaction = self.transaction.lock().await;
            let timeout = transaction.timeout();
            let connection = transaction.connection().await?;
            let prepared = prepare_statement(handler.as_mut(), connection, timeout, &*parameter)?;
            handler.update(prepared, parameter).await
        }
        .await;
        result.inspect_err(|e| log::error!("{:#}", e))
    }

    /// Run a query with a single result map and stream the mapped rows.
    pub fn query<'a, T: Any + Send, P: Parameter>(
        &'a self,
        statement: &'a MappedStatement,
        parameter: &'a P,
        row_bounds: RowBounds,
    ) -> impl Stream<Item = Result<T>> + Send + 'a {
        try_stream! {
            single_result_map(statement)?;
            let mut stream = pin!(self.query_results(statement, parameter, row_bounds));
            while let Some(item) = stream.next().await {
                yield item?.into_row::<T>()?;
            }
        }
    }

    /// Run a query and stream every result item, for statements declaring several result sets.
    pub fn query_results<'a, P: Parameter>(
        &'a self,
        statement: &'a MappedStatement,
        parameter: &'a P,
        row_bounds: RowBounds,
    ) -> impl Stream<Item = Result<ResultItem>> + Send + 'a {
        try_stream! {
            self.ensure_open()?;
            let mut handler = self.configuration.new_statement_handler(
                statement,
                parameter,
                row_bounds,
                self.local_cache.clone(),
            )?;
            let mut transaction = self.transaction.lock().await;
            let timeout = transaction.timeout();
            let connection = transaction.connection().await?;
            let prepared = prepare_statement(handler.as_mut(), connection, timeout, parameter)?;
            let mut stream = handler.query(prepared);
            while let Some(item) = stream.next().await {
                yield item?;
            }
        }
        .inspect_err(|e| log::error!("{:#}", e))
    }

    pub async fn commit(&self, required: bool) -> Result<()> {
        self.ensure_open().context("Cannot commit")?;
        self.clear_local_cache();
        if required {
            self.transaction.lock().await.commit().await?;
        }
        Ok(())
    }

    pub async fn rollback(&self, required: bool) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.clear_local_cache();
        if required {
            self.transaction.lock().await.rollback().await?;
        }
        Ok(())
    }

    /// Roll back when asked, then release the connection. Closing twice does nothing.
    pub async fn close(&self, force_rollback: bool) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.clear_local_cache();
        let mut transaction = self.transaction.lock().await;
        let rollback = if force_rollback {
            transaction.rollback().await
        } else {
            Ok(())
        };
        if let Err(e) = &rollback {
            log::warn!("Unexpected error rolling back while closing: {:#}", e);
        }
        let closed = transaction.close().await;
        rollback.and(closed)
    }
}

fn single_result_map(statement: &MappedStatement) -> Result<()> {
    if statement.result_maps.len() > 1 {
        return Err(Error::new(ErrorKind::Configuration(format!(
            "`{}` declares {} result maps, read it with `query_results`",
            statement.id,
            statement.result_maps.len()
        ))));
    }
    Ok(())
}
