#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use sluice_core::{
        AsValue, Connection, DataType, Driver, QueryResult, RowsAffected, Value,
    };
    use sluice_mock::{Binding, MockDriver, Script, init_logs};

    #[tokio::test]
    async fn connect() {
        init_logs();
        let driver = MockDriver::new();
        assert!(driver.connect("postgres://localhost".into()).await.is_err());
        assert!(driver.connect("mock://memory".into()).await.is_ok());
        assert_eq!(driver.connects(), 1);
        driver.fail_connect("refused");
        let Err(error) = driver.connect("mock://memory".into()).await else {
            panic!("Connect should fail");
        };
        assert_eq!(error.to_string(), "refused");
    }

    #[tokio::test]
    async fn transactions() {
        init_logs();
        let driver = MockDriver::new();
        let mut connection = driver.connect("mock://memory".into()).await.unwrap();
        assert!(connection.commit().await.is_err());
        connection.begin().await.unwrap();
        assert!(connection.in_transaction());
        assert!(connection.begin().await.is_err());
        connection.commit().await.unwrap();
        connection.begin().await.unwrap();
        connection.rollback().await.unwrap();
        assert!(connection.rollback().await.is_err());
        connection.close().await.unwrap();
        assert_eq!(driver.begins(), 2);
        assert_eq!(driver.commits(), 1);
        assert_eq!(driver.rollbacks(), 1);
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn script_playback() {
        init_logs();
        let driver = MockDriver::new();
        driver.respond(
            Script::new()
                .result_set([("id", DataType::Int64), ("name", DataType::Varchar)])
                .row([1_i64.as_value(), Value::from("a")])
                .labeled_row(["other"], [true.as_value()])
                .affected_with_id(1, Some(5)),
        );
        let mut connection = driver.connect("mock://memory".into()).await.unwrap();
        let mut statement = connection
            .create_statement("SELECT id, name FROM t WHERE id = ? AND name = ?")
            .unwrap();
        assert_eq!(statement.parameter_count(), Some(2));
        statement.bind(0, 1_i64.as_value()).unwrap();
        statement.bind_null(1, DataType::Varchar).unwrap();
        assert!(statement.bind(2, 1_i64.as_value()).is_err());
        let results = statement
            .execute()
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(results.len(), 4);
        let QueryResult::ResultSet(columns) = &results[0] else {
            panic!("Expected the result set announcement");
        };
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].name, "name");
        let QueryResult::Row(row) = &results[1] else {
            panic!("Expected a row");
        };
        assert_eq!(row.names(), ["id", "name"]);
        assert_eq!(row.get_column("NAME"), Some(&Value::from("a")));
        let QueryResult::Row(row) = &results[2] else {
            panic!("Expected a row");
        };
        assert_eq!(row.names(), ["other"]);
        let QueryResult::Affected(affected) = &results[3] else {
            panic!("Expected the affected rows");
        };
        assert_eq!(
            *affected,
            RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(5)
            }
        );

        let executed = driver.last_executed().unwrap();
        assert_eq!(
            executed.bindings,
            [
                Some(Binding::Value(Value::Int64(Some(1)))),
                Some(Binding::Null(DataType::Varchar)),
            ]
        );
        assert_eq!(executed.value(1), Some(Value::Varchar(None)));
        assert_eq!(executed.value(2), None);
        assert_eq!(driver.disposed(), 1);
    }

    #[tokio::test]
    async fn unbound_parameters() {
        init_logs();
        let driver = MockDriver::new();
        let mut connection = driver.connect("mock://memory".into()).await.unwrap();
        let mut statement = connection
            .create_statement("DELETE FROM t WHERE a = ? AND b = ?")
            .unwrap();
        statement.bind(0, 1_i32.as_value()).unwrap();
        let mut stream = statement.execute();
        let error = stream.next().await.unwrap().unwrap_err();
        assert!(error.to_string().contains("#1"));
        assert!(stream.next().await.is_none());
        drop(stream);
        assert_eq!(driver.executed().len(), 1);
        assert_eq!(driver.disposed(), 1);
    }

    #[tokio::test]
    async fn scripted_errors() {
        init_logs();
        let driver = MockDriver::new();
        driver
            .respond(Script::new().affected(2).error("deadlock"))
            .respond(Script::new().affected(3));
        let mut connection = driver.connect("mock://memory".into()).await.unwrap();
        let mut stream = connection.create_statement("UPDATE t SET a = 1").unwrap().execute();
        assert!(matches!(
            stream.next().await,
            Some(Ok(QueryResult::Affected(RowsAffected {
                rows_affected: 2,
                ..
            })))
        ));
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());

        let results = connection
            .create_statement("UPDATE t SET a = 2")
            .unwrap()
            .execute()
            .collect::<Vec<_>>()
            .await;
        assert_eq!(results.len(), 1);

        driver.fail_prepare("syntax error");
        assert!(connection.create_statement("UPDATE").is_err());
    }

    #[tokio::test]
    async fn dropped_before_polling() {
        init_logs();
        let driver = MockDriver::new();
        let mut connection = driver.connect("mock://memory".into()).await.unwrap();
        let stream = connection.create_statement("SELECT 1").unwrap().execute();
        drop(stream);
        assert_eq!(driver.disposed(), 1);
        assert!(driver.executed().is_empty());
    }
}
