#[cfg(test)]
mod tests {
    use sluice::{
        AutoMappingBehavior, AutoMappingUnknownColumnBehavior, Configuration, DataType,
        MappedStatement, ResultMap, ResultType, SqlCommandType, StaticSqlSource, error_kind,
    };
    use std::time::Duration;

    #[test]
    fn defaults() {
        let configuration = Configuration::new();
        assert_eq!(
            configuration.auto_mapping_behavior,
            AutoMappingBehavior::Partial
        );
        assert_eq!(
            configuration.auto_mapping_unknown_column_behavior,
            AutoMappingUnknownColumnBehavior::None
        );
        assert!(!configuration.map_underscore_to_camel_case);
        assert!(!configuration.call_setters_on_nulls);
        assert!(!configuration.return_instance_for_empty_row);
        assert_eq!(configuration.default_fetch_size, None);
        assert_eq!(configuration.default_statement_timeout, None);
        assert_eq!(configuration.data_type_for_null, DataType::Unknown);
        assert!(configuration.interceptors().is_empty());
        assert!(configuration.type_registry().has_handler(DataType::Int64));
    }

    #[test]
    fn from_url() {
        let configuration = Configuration::from_url(
            "mock://memory?auto_mapping_behavior=FULL&auto_mapping_unknown_column_behavior=warning\
             &map_underscore_to_camel_case=true&call_setters_on_nulls=1\
             &return_instance_for_empty_row=false&default_fetch_size=100\
             &default_statement_timeout=30&data_type_for_null=varchar",
        )
        .expect("Valid configuration");
        assert_eq!(configuration.auto_mapping_behavior, AutoMappingBehavior::Full);
        assert_eq!(
            configuration.auto_mapping_unknown_column_behavior,
            AutoMappingUnknownColumnBehavior::Warning
        );
        assert!(configuration.map_underscore_to_camel_case);
        assert!(configuration.call_setters_on_nulls);
        assert!(!configuration.return_instance_for_empty_row);
        assert_eq!(configuration.default_fetch_size, Some(100));
        assert_eq!(
            configuration.default_statement_timeout,
            Some(Duration::from_secs(30))
        );
        assert_eq!(configuration.data_type_for_null, DataType::Varchar);
    }

    #[test]
    fn invalid_settings() {
        let mut configuration = Configuration::new();
        let error = configuration.set("lazy_loading_enabled", "true").unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        let error = configuration
            .set("auto_mapping_behavior", "sometimes")
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        let error = configuration.set("default_fetch_size", "many").unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        let error = configuration
            .set("call_setters_on_nulls", "maybe")
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        assert!(Configuration::from_url("not a url").is_err());
        assert!(Configuration::from_url("mock://memory?unknown=1").is_err());
        configuration
            .set("default_fetch_size", "10")
            .unwrap()
            .set("auto_mapping_behavior", "none")
            .unwrap();
        assert_eq!(configuration.default_fetch_size, Some(10));
        assert_eq!(configuration.auto_mapping_behavior, AutoMappingBehavior::None);
    }

    #[test]
    fn registrations() {
        let mut configuration = Configuration::new();
        configuration
            .add_result_map(ResultMap::new("count", ResultType::scalar::<i64>()))
            .unwrap();
        let error = configuration
            .add_result_map(ResultMap::new("count", ResultType::scalar::<i32>()))
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        assert_eq!(
            configuration.result_map("count").unwrap().result_type.data_type(),
            Some(DataType::Int64)
        );
        assert!(configuration.result_map("sum").is_err());

        let statement = || {
            MappedStatement::new(
                "countAll",
                SqlCommandType::Select,
                StaticSqlSource::new("SELECT COUNT(*) FROM t", vec![]),
            )
        };
        configuration.add_mapped_statement(statement()).unwrap();
        let error = configuration
            .add_mapped_statement(statement())
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        assert_eq!(
            configuration.mapped_statement("countAll").unwrap().id,
            "countAll"
        );
        let error = configuration.mapped_statement("countNone").unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
    }

    #[test]
    fn unknown_column_behavior() {
        assert!(
            AutoMappingUnknownColumnBehavior::None
                .handle("s", "c", "p", None)
                .is_ok()
        );
        assert!(
            AutoMappingUnknownColumnBehavior::Warning
                .handle("s", "c", "p", Some(DataType::Int32))
                .is_ok()
        );
        let error = AutoMappingUnknownColumnBehavior::Failing
            .handle("s", "c", "p", Some(DataType::Int32))
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_mapping());
        assert!(
            error
                .to_string()
                .contains("[column: c, property: p, type: INTEGER]")
        );
    }
}
