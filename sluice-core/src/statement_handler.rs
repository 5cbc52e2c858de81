use crate::{
    AutoMappingCache, BoundSql, Classify, Configuration, Connection, Error, ErrorKind,
    GeneratedKeyPropagator, KeyPropagator, MappedStatement, Parameter, ParameterBinder,
    QueryResult, Result, ResultItem, ResultMapper, RowBounds, SqlCommandType, Statement,
    StatementType,
    future::BoxFuture,
    rows_affected,
    stream::{self, BoxStream, StreamExt, TryStreamExt},
};
use std::{future, sync::Arc, time::Duration};

/// Drives one statement execution: prepare, parameterize, then update or query.
///
/// Interceptors decorate this trait, a decorator can change the bound SQL and the row bounds
/// before `prepare` is called.
pub trait StatementHandler: Send {
    fn mapped_statement(&self) -> &MappedStatement;
    fn bound_sql(&self) -> &BoundSql;
    fn bound_sql_mut(&mut self) -> &mut BoundSql;
    fn row_bounds(&self) -> RowBounds;
    fn set_row_bounds(&mut self, row_bounds: RowBounds);
    /// Create the driver command, applying timeout, fetch size and generated columns.
    fn prepare(
        &mut self,
        connection: &mut dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> Result<Box<dyn Statement>>;
    fn parameterize(&mut self, statement: &mut dyn Statement, parameter: &dyn Parameter)
    -> Result<()>;
    /// Run a modify command, propagate the generated keys and return the affected rows.
    fn update<'a>(
        self: Box<Self>,
        statement: Box<dyn Statement>,
        parameter: &'a mut dyn Parameter,
    ) -> BoxFuture<'a, Result<u64>>;
    /// Run a query, the stream yields the mapped rows.
    fn query(self: Box<Self>, statement: Box<dyn Statement>) -> BoxStream<'static, Result<ResultItem>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Uninitialized,
    Prepared,
    Parameterized,
    Executed,
    Done,
    Failed,
}

/// Statement handler for placeholder based statements.
pub struct PreparedStatementHandler {
    configuration: Arc<Configuration>,
    statement: MappedStatement,
    bound_sql: BoundSql,
    row_bounds: RowBounds,
    binder: Box<dyn ParameterBinder>,
    mapper: Box<dyn ResultMapper>,
    propagator: Box<dyn KeyPropagator>,
    state: HandlerState,
}

impl PreparedStatementHandler {
    pub fn new(
        configuration: &Arc<Configuration>,
        statement: &MappedStatement,
        parameter: &dyn Parameter,
        row_bounds: RowBounds,
        cache: AutoMappingCache,
    ) -> Result<Self> {
        let bound_sql = statement.bound_sql(parameter).classify(|| {
            ErrorKind::Configuration(format!("Could not resolve the SQL of `{}`", statement.id))
        })?;
        Ok(Self {
            configuration: configuration.clone(),
            statement: statement.clone(),
            bound_sql,
            row_bounds,
            binder: configuration.new_parameter_binder(),
            mapper: configuration.new_result_mapper(statement, cache),
            propagator: Box::new(GeneratedKeyPropagator::new(configuration.clone())),
            state: HandlerState::Uninitialized,
        })
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    fn expect(&self, state: HandlerState, operation: &str) -> Result<()> {
        if self.state != state {
            return Err(Error::new(ErrorKind::Execution(format!(
                "Cannot {} `{}` while {:?}, expected {:?}",
                operation, self.statement.id, self.state, state
            ))));
        }
        Ok(())
    }

    fn advance<T>(&mut self, result: Result<T>, state: HandlerState) -> Result<T> {
        self.state = if result.is_ok() {
            state
        } else {
            HandlerState::Failed
        };
        result
    }

    fn returns_generated_keys(&self) -> bool {
        !self.statement.key_properties.is_empty()
            && self.statement.command_type != SqlCommandType::Select
    }

    /// Statement timeout, else the configured default, never above the transaction timeout.
    fn timeout(&self, transaction_timeout: Option<Duration>) -> Option<Duration> {
        let timeout = self
            .statement
            .timeout
            .or(self.configuration.default_statement_timeout);
        match (timeout, transaction_timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn instantiate_statement(
        &self,
        connection: &mut dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> Result<Box<dyn Statement>> {
        let mut statement = connection.create_statement(&self.bound_sql.sql)?;
        if self.returns_generated_keys() {
            let columns = (0..self.statement.key_properties.len())
                .filter_map(|i| self.statement.key_column(i))
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            statement.return_generated_values(&columns)?;
        }
        if let Some(timeout) = self.timeout(transaction_timeout) {
            statement.timeout(timeout)?;
        }
        if let Some(rows) = self
            .statement
            .fetch_size
            .or(self.configuration.default_fetch_size)
        {
            statement.fetch_size(rows)?;
        }
        Ok(statement)
    }

    fn executed(&self, statement: Box<dyn Statement>) -> BoxStream<'static, Result<QueryResult>> {
        let id = self.statement.id.clone();
        statement
            .execute()
            .map(move |v| {
                v.classify(|| ErrorKind::Execution(format!("Error executing `{}`", id)))
            })
            .boxed()
    }
}

impl StatementHandler for PreparedStatementHandler {
    fn mapped_statement(&self) -> &MappedStatement {
        &self.statement
    }
    fn bound_sql(&self) -> &BoundSql {
        &self.bound_sql
    }
    fn bound_sql_mut(&mut self) -> &mut BoundSql {
        &mut self.bound_sql
    }
    fn row_bounds(&self) -> RowBounds {
        self.row_bounds
    }
    fn set_row_bounds(&mut self, row_bounds: RowBounds) {
        self.row_bounds = row_bounds;
    }

    fn prepare(
        &mut self,
        connection: &mut dyn Connection,
        transaction_timeout: Option<Duration>,
    ) -> Result<Box<dyn Statement>> {
        self.expect(HandlerState::Uninitialized, "prepare")?;
        log::debug!("Preparing `{}`: {}", self.statement.id, self.bound_sql);
        let result = self
            .instantiate_statement(connection, transaction_timeout)
            .classify(|| {
                ErrorKind::Execution(format!("Error preparing `{}`", self.statement.id))
            });
        self.advance(result, HandlerState::Prepared)
    }

    fn parameterize(
        &mut self,
        statement: &mut dyn Statement,
        parameter: &dyn Parameter,
    ) -> Result<()> {
        self.expect(HandlerState::Prepared, "parameterize")?;
        let result = self.binder.bind(statement, &self.bound_sql, parameter);
        self.advance(result, HandlerState::Parameterized)
    }

    fn update<'a>(
        self: Box<Self>,
        statement: Box<dyn Statement>,
        parameter: &'a mut dyn Parameter,
    ) -> BoxFuture<'a, Result<u64>> {
        let mut handler = *self;
        Box::pin(async move {
            handler.expect(HandlerState::Parameterized, "update")?;
            if handler.returns_generated_keys() {
                let result = handler.propagator.verify(&handler.statement, &*parameter);
                handler.advance(result, HandlerState::Parameterized)?;
            }
            handler.state = HandlerState::Executed;
            let results = handler
                .executed(statement)
                .try_collect::<Vec<_>>()
                .await;
            let results = handler.advance(results, HandlerState::Executed)?;
            let affected = rows_affected(&results);
            if handler.returns_generated_keys() {
                let result = handler
                    .propagator
                    .propagate(&handler.statement, &results, parameter);
                handler.advance(result, HandlerState::Executed)?;
            }
            handler.state = HandlerState::Done;
            log::debug!(
                "`{}` affected {} rows",
                handler.statement.id,
                affected.rows_affected
            );
            Ok(affected.rows_affected)
        })
    }

    fn query(self: Box<Self>, statement: Box<dyn Statement>) -> BoxStream<'static, Result<ResultItem>> {
        let mut handler = *self;
        if let Err(e) = handler.expect(HandlerState::Parameterized, "query") {
            return stream::once(future::ready(Err(e))).boxed();
        }
        handler.state = HandlerState::Executed;
        let results = handler.executed(statement);
        handler.mapper.handle_result_sets(results, handler.row_bounds)
    }
}

/// Pick the statement handler for the statement kind. Only prepared statements run, the other
/// kinds fail here, before any connection is opened.
pub fn route_statement_handler(
    configuration: &Arc<Configuration>,
    statement: &MappedStatement,
    parameter: &dyn Parameter,
    row_bounds: RowBounds,
    cache: AutoMappingCache,
) -> Result<Box<dyn StatementHandler>> {
    match statement.statement_type {
        StatementType::Prepared => Ok(Box::new(PreparedStatementHandler::new(
            configuration,
            statement,
            parameter,
            row_bounds,
            cache,
        )?)),
        other => Err(Error::new(ErrorKind::Unsupported(format!(
            "`{}` is a {:?} statement, only prepared statements can be executed",
            statement.id, other
        )))),
    }
}

/// Prepare and parameterize, the handler ends ready for `update` or `query`.
pub fn prepare_statement(
    handler: &mut dyn StatementHandler,
    connection: &mut dyn Connection,
    transaction_timeout: Option<Duration>,
    parameter: &dyn Parameter,
) -> Result<Box<dyn Statement>> {
    let mut statement = handler.prepare(connection, transaction_timeout)?;
    handler.parameterize(statement.as_mut(), parameter)?;
    Ok(statement)
}
