#[cfg(test)]
mod tests {
    use futures::{StreamExt, TryStreamExt};
    use sluice::{
        AsValue, AutoMappingCache, Configuration, DataType, Driver, Executor, HandlerState, Mapped,
        MappedStatement, ParameterMapping, PreparedStatementHandler, ResultMap, ResultType,
        RowBounds, SqlCommandType, StatementHandler, StatementType, StaticSqlSource, Transaction,
        Value, error_kind,
    };
    use sluice_mock::{Binding, MockDriver, Script, init_logs};
    use std::{collections::HashMap, sync::Arc, time::Duration};

    #[derive(Mapped, Default, Debug, PartialEq)]
    struct User {
        id: Option<i64>,
        name: String,
    }

    fn executor(configuration: Configuration, driver: &MockDriver) -> Executor<MockDriver> {
        Executor::new(
            Arc::new(configuration),
            Transaction::new(driver.clone(), "mock://memory", true),
        )
    }

    fn select_user() -> MappedStatement {
        MappedStatement::new(
            "selectUser",
            SqlCommandType::Select,
            StaticSqlSource::new(
                "SELECT id, name FROM users WHERE id = ?",
                vec![ParameterMapping::new("id")],
            ),
        )
        .with_result_map(ResultMap::new("user", ResultType::of::<User>()))
    }

    fn insert_user() -> MappedStatement {
        MappedStatement::new(
            "insertUser",
            SqlCommandType::Insert,
            StaticSqlSource::new(
                "INSERT INTO users (name) VALUES (?)",
                vec![ParameterMapping::new("name")],
            ),
        )
        .with_keys(["id"], ["id"])
    }

    #[tokio::test]
    async fn select_by_id() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64), ("name", DataType::Varchar)])
                .row([42i64.as_value(), Value::from("x")]),
        );
        let executor = executor(Configuration::new(), &driver);
        let rows = executor
            .query::<User, _>(&select_user(), &42i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        assert_eq!(
            rows,
            [User {
                id: Some(42),
                name: "x".into()
            }]
        );
        let executed = driver.last_executed().expect("Nothing executed");
        assert_eq!(executed.sql, "SELECT id, name FROM users WHERE id = ?");
        assert_eq!(
            executed.bindings,
            [Some(Binding::Value(Value::Int64(Some(42))))]
        );
        assert_eq!(driver.connects(), 1);
        assert_eq!(driver.begins(), 0);
        assert_eq!(driver.disposed(), 1);
    }

    #[tokio::test]
    async fn bind_from_properties() {
        init_logs();
        let driver = MockDriver::new();
        let executor = executor(Configuration::new(), &driver);
        let statement = MappedStatement::new(
            "search",
            SqlCommandType::Select,
            StaticSqlSource::new(
                "SELECT id, name FROM users WHERE name = ? AND id > ?",
                vec![
                    ParameterMapping::new("name"),
                    ParameterMapping::typed("id", DataType::Int32),
                ],
            ),
        )
        .with_result_map(ResultMap::new("user", ResultType::of::<User>()));
        let parameter = User {
            id: Some(10),
            name: "x".into(),
        };
        let rows = executor
            .query::<User, _>(&statement, &parameter, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        assert!(rows.is_empty());
        let executed = driver.last_executed().expect("Nothing executed");
        assert_eq!(
            executed.bindings,
            [
                Some(Binding::Value(Value::from("x"))),
                Some(Binding::Value(Value::Int32(Some(10)))),
            ]
        );
    }

    #[tokio::test]
    async fn bind_nulls() {
        init_logs();
        let driver = MockDriver::new();
        let executor = executor(Configuration::new(), &driver);
        let statement = MappedStatement::new(
            "nulls",
            SqlCommandType::Update,
            StaticSqlSource::new(
                "UPDATE users SET name = ?, nickname = ?, note = ? WHERE id = ?",
                vec![
                    ParameterMapping::typed("name", DataType::Varchar),
                    ParameterMapping::new("nickname"),
                    ParameterMapping::new("note"),
                    ParameterMapping::new("id"),
                ],
            ),
        );
        let mut parameter = HashMap::from([
            ("name".to_string(), Value::Null),
            ("nickname".to_string(), Value::Varchar(None)),
            ("id".to_string(), 1i64.as_value()),
        ]);
        executor
            .update(&statement, &mut parameter)
            .await
            .expect("Update failed");
        let executed = driver.last_executed().expect("Nothing executed");
        assert_eq!(
            executed.bindings,
            [
                Some(Binding::Null(DataType::Varchar)),
                Some(Binding::Null(DataType::Varchar)),
                Some(Binding::Null(DataType::Unknown)),
                Some(Binding::Value(Value::Int64(Some(1)))),
            ]
        );
    }

    #[tokio::test]
    async fn handler_states() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64), ("name", DataType::Varchar)])
                .row([1i64.as_value(), Value::from("a")]),
        );
        let configuration = Arc::new(Configuration::new());
        let statement = select_user();
        let mut connection = driver
            .connect("mock://memory".into())
            .await
            .expect("Could not connect");
        let mut handler = PreparedStatementHandler::new(
            &configuration,
            &statement,
            &1i64,
            RowBounds::default(),
            AutoMappingCache::new(),
        )
        .expect("Could not create the handler");
        assert_eq!(handler.state(), HandlerState::Uninitialized);
        let mut command = handler
            .prepare(&mut connection, None)
            .expect("Could not prepare");
        assert_eq!(handler.state(), HandlerState::Prepared);
        handler
            .parameterize(command.as_mut(), &1i64)
            .expect("Could not bind");
        assert_eq!(handler.state(), HandlerState::Parameterized);

        let error = handler
            .prepare(&mut connection, None)
            .err()
            .expect("Already prepared");
        assert!(error_kind(&error).expect("Classified").is_execution());
        assert_eq!(handler.state(), HandlerState::Parameterized);

        let rows = Box::new(handler)
            .query(command)
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        assert_eq!(rows.len(), 1);

        // A binding failure leaves the handler failed
        let mismatch = MappedStatement::new(
            "mismatch",
            SqlCommandType::Select,
            StaticSqlSource::new("SELECT id FROM users WHERE id = ? OR id = ?", vec![ParameterMapping::new("id")]),
        )
        .with_result_map(ResultMap::new("user", ResultType::of::<User>()));
        let mut handler = PreparedStatementHandler::new(
            &configuration,
            &mismatch,
            &1i64,
            RowBounds::default(),
            AutoMappingCache::new(),
        )
        .expect("Could not create the handler");
        let mut command = handler
            .prepare(&mut connection, None)
            .expect("Could not prepare");
        handler
            .parameterize(command.as_mut(), &1i64)
            .expect_err("Two placeholders but one parameter");
        assert_eq!(handler.state(), HandlerState::Failed);
    }

    #[tokio::test]
    async fn parameter_count_mismatch() {
        init_logs();
        let driver = MockDriver::new();
        let executor = executor(Configuration::new(), &driver);
        let statement = MappedStatement::new(
            "mismatch",
            SqlCommandType::Select,
            StaticSqlSource::new(
                "SELECT id, name FROM users WHERE id = ? OR id = ?",
                vec![ParameterMapping::new("id")],
            ),
        )
        .with_result_map(ResultMap::new("user", ResultType::of::<User>()));
        let error = executor
            .query::<User, _>(&statement, &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect_err("Two placeholders but one parameter");
        assert!(error_kind(&error).expect("Classified").is_binding());
        assert!(driver.executed().is_empty());
    }

    #[tokio::test]
    async fn unencodable_parameter() {
        init_logs();
        let driver = MockDriver::new();
        let executor = executor(Configuration::new(), &driver);
        let statement = MappedStatement::new(
            "typed",
            SqlCommandType::Select,
            StaticSqlSource::new(
                "SELECT id, name FROM users WHERE id = ?",
                vec![ParameterMapping::typed("id", DataType::Int64)],
            ),
        )
        .with_result_map(ResultMap::new("user", ResultType::of::<User>()));
        let error = executor
            .query::<User, _>(&statement, &"abc".to_string(), RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect_err("A text is not a number");
        assert!(error_kind(&error).expect("Classified").is_binding());
    }

    #[tokio::test]
    async fn generated_keys() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64)])
                .row([7i64.as_value()])
                .affected(1),
        );
        let executor = executor(Configuration::new(), &driver);
        let mut user = User {
            id: None,
            name: "x".into(),
        };
        let affected = executor
            .update(&insert_user(), &mut user)
            .await
            .expect("Insert failed");
        assert_eq!(affected, 1);
        assert_eq!(user.id, Some(7));
        let executed = driver.last_executed().expect("Nothing executed");
        assert_eq!(executed.generated_columns, ["id"]);
        assert_eq!(executed.bindings, [Some(Binding::Value(Value::from("x")))]);
    }

    #[tokio::test]
    async fn generated_keys_without_affected_rows() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(Script::new().affected(0));
        let executor = executor(Configuration::new(), &driver);
        let mut user = User {
            id: None,
            name: "x".into(),
        };
        let affected = executor
            .update(&insert_user(), &mut user)
            .await
            .expect("Insert failed");
        assert_eq!(affected, 0);
        assert_eq!(user.id, None);
    }

    #[tokio::test]
    async fn generated_key_from_last_affected_id() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(Script::new().affected_with_id(1, Some(9)));
        let executor = executor(Configuration::new(), &driver);
        let mut user = User::default();
        executor
            .update(&insert_user(), &mut user)
            .await
            .expect("Insert failed");
        assert_eq!(user.id, Some(9));
    }

    #[tokio::test]
    async fn generated_key_without_setter() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64)])
                .row([7i64.as_value()])
                .affected(1),
        );
        let executor = executor(Configuration::new(), &driver);
        let statement = insert_user().with_keys(["missing"], ["id"]);
        let mut user = User::default();
        let error = executor
            .update(&statement, &mut user)
            .await
            .expect_err("There is no `missing` property");
        assert!(error_kind(&error).expect("Classified").is_configuration());
        assert!(format!("{:#}", error).contains("No setter found"));
        assert!(driver.executed().is_empty());
    }

    #[tokio::test]
    async fn unsupported_statement_kinds() {
        init_logs();
        let driver = MockDriver::new();
        let executor = executor(Configuration::new(), &driver);
        for kind in [StatementType::Statement, StatementType::Callable] {
            let statement = select_user().with_statement_type(kind);
            let error = executor
                .query::<User, _>(&statement, &1i64, RowBounds::default())
                .try_collect::<Vec<_>>()
                .await
                .expect_err("Only prepared statements run");
            assert!(error_kind(&error).expect("Classified").is_unsupported());

            let statement = insert_user().with_statement_type(kind);
            let error = executor
                .update(&statement, &mut User::default())
                .await
                .expect_err("Only prepared statements run");
            assert!(error_kind(&error).expect("Classified").is_unsupported());
        }
        assert_eq!(driver.connects(), 0);
    }

    #[tokio::test]
    async fn dropping_the_stream_disposes_the_driver_stream() {
        init_logs();
        let driver = MockDriver::new();
        let mut script = Script::new().result_set([("n", DataType::Int64)]);
        for i in 0..100i64 {
            script = script.row([i.as_value()]);
        }
        driver.respond(script);
        let executor = executor(Configuration::new(), &driver);
        let statement = MappedStatement::new(
            "numbers",
            SqlCommandType::Select,
            StaticSqlSource::new("SELECT n FROM numbers", vec![]),
        )
        .with_result_map(ResultMap::new("n", ResultType::scalar::<i64>()));
        let mut stream = Box::pin(executor.query::<i64, _>(&statement, &(), RowBounds::default()));
        let first = stream.next().await.expect("One row").expect("Mapped row");
        assert_eq!(first, 0);
        assert_eq!(driver.disposed(), 0);
        drop(stream);
        assert_eq!(driver.disposed(), 1);

        // The executor is usable again
        driver.respond(
            Script::new()
                .result_set([("n", DataType::Int64)])
                .row([1i64.as_value()]),
        );
        let rows = executor
            .query::<i64, _>(&statement, &(), RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        assert_eq!(rows, [1]);
        assert_eq!(driver.disposed(), 2);
        assert_eq!(driver.connects(), 1);
    }

    #[tokio::test]
    async fn driver_errors() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64), ("name", DataType::Varchar)])
                .row([1i64.as_value(), Value::from("a")])
                .error("connection reset"),
        );
        let executor = executor(Configuration::new(), &driver);
        let statement = select_user();
        let mut stream = Box::pin(executor.query::<User, _>(&statement, &1i64, RowBounds::default()));
        assert!(stream.next().await.expect("First row").is_ok());
        let error = stream
            .next()
            .await
            .expect("Error item")
            .expect_err("The driver failed");
        assert!(error_kind(&error).expect("Classified").is_execution());
        assert!(format!("{:#}", error).contains("connection reset"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn prepare_and_connect_errors() {
        init_logs();
        let driver = MockDriver::new();
        driver.fail_prepare("syntax error");
        let executor = executor(Configuration::new(), &driver);
        let error = executor
            .query::<User, _>(&select_user(), &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect_err("Prepare fails");
        assert!(error_kind(&error).expect("Classified").is_execution());

        let driver = MockDriver::new();
        driver.fail_connect("refused");
        let executor = self::executor(Configuration::new(), &driver);
        let error = executor
            .query::<User, _>(&select_user(), &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect_err("Connect fails");
        assert!(format!("{:#}", error).contains("refused"));
    }

    #[tokio::test]
    async fn timeouts_and_fetch_size() {
        init_logs();
        let driver = MockDriver::new();
        let mut configuration = Configuration::new();
        configuration.default_fetch_size = Some(50);
        configuration.default_statement_timeout = Some(Duration::from_secs(30));
        let executor = Executor::new(
            Arc::new(configuration),
            Transaction::new(driver.clone(), "mock://memory", true)
                .with_timeout(Duration::from_secs(10)),
        );
        executor
            .query::<User, _>(&select_user(), &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        let executed = driver.last_executed().expect("Nothing executed");
        assert_eq!(executed.fetch_size, Some(50));
        assert_eq!(executed.timeout, Some(Duration::from_secs(10)));

        let statement = select_user()
            .with_fetch_size(5)
            .with_timeout(Duration::from_secs(2));
        executor
            .query::<User, _>(&statement, &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        let executed = driver.last_executed().expect("Nothing executed");
        assert_eq!(executed.fetch_size, Some(5));
        assert_eq!(executed.timeout, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn closed_executor() {
        init_logs();
        let driver = MockDriver::new();
        let executor = executor(Configuration::new(), &driver);
        executor
            .query::<User, _>(&select_user(), &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        executor.close(false).await.expect("Close failed");
        assert!(executor.is_closed());
        assert_eq!(driver.closes(), 1);
        executor.close(false).await.expect("Closing twice is fine");
        assert_eq!(driver.closes(), 1);
        let error = executor
            .query::<User, _>(&select_user(), &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect_err("The executor is closed");
        assert!(error_kind(&error).expect("Classified").is_execution());
        assert!(executor.commit(true).await.is_err());
    }

    #[tokio::test]
    async fn update_clears_the_local_cache() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64), ("name", DataType::Varchar)])
                .row([1i64.as_value(), Value::from("a")]),
        );
        let executor = executor(Configuration::new(), &driver);
        executor
            .query::<User, _>(&select_user(), &1i64, RowBounds::default())
            .try_collect::<Vec<_>>()
            .await
            .expect("Query failed");
        assert!(!executor.local_cache().is_empty());
        driver.respond(Script::new().affected(1));
        executor
            .update(&insert_user(), &mut User::default())
            .await
            .expect("Insert failed");
        assert!(executor.local_cache().is_empty());
    }
}
