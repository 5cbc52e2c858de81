#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sluice_core::{
        AsValue, Classify, ColumnMetadata, ColumnRef, DataType, Error, ErrorKind, RowAccess,
        RowAdapter, RowLabeled, TypeRegistry, Value, error_kind, printable,
    };
    use std::{str::FromStr, sync::Arc};
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    #[test]
    fn value_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Int32(Some(1)), Value::Null);
        assert!(Value::Null.is_null());
        assert!(Value::Varchar(None).is_null());
        assert!(!Value::Varchar(Some("".into())).is_null());
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn value_integers() {
        let val = 42_i32.as_value();
        assert_eq!(val, Value::Int32(Some(42)));
        assert_eq!(i64::try_from_value(val.clone()).unwrap(), 42);
        assert_eq!(u8::try_from_value(val).unwrap(), 42);
        assert!(u8::try_from_value(300_i32.as_value()).is_err());
        assert!(i8::try_from_value((-129_i64).as_value()).is_err());
        assert!(u32::try_from_value((-1_i64).as_value()).is_err());
        assert_eq!(
            i64::try_from_value(Value::Decimal(Some(Decimal::new(120, 1)))).unwrap(),
            12
        );
        assert!(i64::try_from_value(Value::Decimal(Some(Decimal::new(125, 1)))).is_err());
        assert!(i64::try_from_value(Value::Varchar(Some("12".into()))).is_err());
        assert_eq!(i64::try_from_value(Value::Unknown(Some("12".into()))).unwrap(), 12);
        assert_eq!(i32::parse("-17").unwrap(), -17);
        assert_eq!(i32::parse("'5'").unwrap(), 5);
        assert!(i32::parse("5 apples").is_err());
        assert!(i32::parse("apples").is_err());
        assert!(u8::parse("256").is_err());
    }

    #[test]
    fn value_bool() {
        assert_eq!(true.as_value(), Value::Boolean(Some(true)));
        assert!(bool::try_from_value(1_i8.as_value()).unwrap());
        assert!(!bool::try_from_value(0_u64.as_value()).unwrap());
        assert!(bool::try_from_value(0.5_f32.as_value()).is_err());
        assert!(bool::parse("TRUE").unwrap());
        assert!(!bool::parse("f").unwrap());
        assert!(bool::parse("yes").is_err());
        assert!(bool::parse("").is_err());
    }

    #[test]
    fn value_floats() {
        assert_eq!(f64::try_from_value(2_i32.as_value()).unwrap(), 2.0);
        assert_eq!(f64::try_from_value(1.5_f32.as_value()).unwrap(), 1.5);
        assert_eq!(f32::parse("2.25").unwrap(), 2.25);
        assert!(f64::parse("2.25.1").is_err());
        assert_eq!(
            Decimal::try_from_value(7_i64.as_value()).unwrap(),
            Decimal::new(7, 0)
        );
        assert_eq!(Decimal::parse("3.14").unwrap(), Decimal::new(314, 2));
    }

    #[test]
    fn value_text() {
        assert_eq!(Value::from("abc"), Value::Varchar(Some("abc".into())));
        assert_eq!(String::try_from_value('x'.as_value()).unwrap(), "x");
        assert_eq!(char::try_from_value(Value::from("y")).unwrap(), 'y');
        assert!(char::try_from_value(Value::from("yz")).is_err());
        assert_eq!(String::parse("'it''s'").unwrap(), "it's");
        assert_eq!(String::parse("plain").unwrap(), "plain");
        assert!(String::parse("'open").is_err());
        assert!(String::try_from_value(1_i32.as_value()).is_err());
    }

    #[test]
    fn value_temporal() {
        assert_eq!(
            time::Date::try_from_value(Value::from("2024-02-29")).unwrap(),
            date!(2024 - 02 - 29)
        );
        assert_eq!(<time::Time as AsValue>::parse("10:30").unwrap(), time!(10:30));
        assert_eq!(
            <time::PrimitiveDateTime as AsValue>::parse("2024-01-02 03:04:05").unwrap(),
            datetime!(2024-01-02 03:04:05)
        );
        assert_eq!(
            <time::OffsetDateTime as AsValue>::parse("2024-01-02T03:04:05+02:00").unwrap(),
            datetime!(2024-01-02 03:04:05 +2)
        );
        assert_eq!(
            time::OffsetDateTime::try_from_value(Value::Timestamp(Some(datetime!(2024-01-02 03:04:05))))
                .unwrap(),
            datetime!(2024-01-02 03:04:05 UTC)
        );
        assert!(<time::Date as AsValue>::parse("2024-13-01").is_err());
    }

    #[test]
    fn value_uuid_and_blob() {
        let uuid = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            Uuid::try_from_value(Value::from("67e55044-10b1-426f-9247-bb680e5fe0c8")).unwrap(),
            uuid
        );
        assert_eq!(
            <Box<[u8]>>::parse("\\xDEADBEEF").unwrap().as_ref(),
            &[0xde, 0xad, 0xbe, 0xef]
        );
        assert_eq!(
            Vec::<u8>::try_from_value(vec![1_u8, 2].as_value()).unwrap(),
            [1, 2]
        );
    }

    #[test]
    fn value_option() {
        assert_eq!(Option::<i32>::None.as_value(), Value::Int32(None));
        assert_eq!(Some(3_i32).as_value(), Value::Int32(Some(3)));
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::try_from_value(Value::Int8(Some(1))).unwrap(), Some(1));
        assert!(i64::try_from_value(Value::Int64(None)).is_err());
    }

    #[test]
    fn value_convert() {
        assert_eq!(
            Value::Int64(Some(5)).convert(DataType::Int32).unwrap(),
            Value::Int32(Some(5))
        );
        assert_eq!(
            Value::Varchar(None).convert(DataType::Int64).unwrap(),
            Value::Int64(None)
        );
        assert_eq!(
            Value::from("x").convert(DataType::Unknown).unwrap(),
            Value::from("x")
        );
        assert!(Value::Int64(Some(1 << 40)).convert(DataType::Int32).is_err());
        assert!(Value::from("x").convert(DataType::Null).is_err());
    }

    #[test]
    fn data_type() {
        assert_eq!(DataType::from_str("bigint").unwrap(), DataType::Int64);
        assert_eq!(DataType::from_str("int").unwrap(), DataType::Int32);
        assert_eq!(DataType::from_str("Text").unwrap(), DataType::Varchar);
        assert_eq!(
            DataType::from_str("timestamp_with_time_zone").unwrap(),
            DataType::TimestampWithTimezone
        );
        let error = DataType::from_str("geometry").unwrap_err();
        assert!(error_kind(&error).unwrap().is_configuration());
        assert_eq!(DataType::Float64.to_string(), "DOUBLE");
        assert_eq!(DataType::Uuid.empty_value(), Value::Uuid(None));
        assert!(DataType::Int64.is_coercible_from(DataType::Decimal));
        assert!(DataType::Varchar.is_coercible_from(DataType::Uuid));
        assert!(DataType::Timestamp.is_coercible_from(DataType::Date));
        assert!(!DataType::Int64.is_coercible_from(DataType::Varchar));
        assert!(!DataType::Blob.is_coercible_from(DataType::Varchar));
        assert!(DataType::Blob.is_coercible_from(DataType::Null));
    }

    fn row(values: Vec<Value>, columns: &[(&str, DataType)]) -> (RowLabeled, Vec<ColumnMetadata>) {
        let columns = columns
            .iter()
            .map(|(name, data_type)| ColumnMetadata::new(*name, *data_type))
            .collect::<Vec<_>>();
        let labels = columns.iter().map(|c| c.name.clone()).collect::<Arc<[_]>>();
        (RowLabeled::new(labels, values.into()), columns)
    }

    #[test]
    fn row_adapter() {
        let registry = TypeRegistry::new();
        let (row, columns) = row(
            vec![
                Value::Int32(Some(7)),
                Value::Varchar(None),
                Value::TimestampWithTimezone(Some(datetime!(2024-01-02 03:00:00 +1))),
                Value::Uuid(Some(Uuid::nil())),
            ],
            &[
                ("ID", DataType::Int32),
                ("name", DataType::Varchar),
                ("created", DataType::TimestampWithTimezone),
                ("token", DataType::Uuid),
            ],
        );
        let mut adapter = RowAdapter::new(&row, &columns, &registry);
        assert_eq!(
            adapter.get(ColumnRef::Name("id"), DataType::Int64).unwrap(),
            Value::Int64(Some(7))
        );
        assert!(!adapter.was_null());
        assert_eq!(
            adapter.get(ColumnRef::Index(1), DataType::Varchar).unwrap(),
            Value::Varchar(None)
        );
        assert!(adapter.was_null());
        assert_eq!(
            adapter.get("created".into(), DataType::Timestamp).unwrap(),
            Value::Timestamp(Some(datetime!(2024-01-02 02:00:00)))
        );
        assert_eq!(
            adapter.get("created".into(), DataType::Date).unwrap(),
            Value::Date(Some(date!(2024 - 01 - 02)))
        );
        assert_eq!(
            adapter.get("token".into(), DataType::Varchar).unwrap(),
            Value::from("00000000-0000-0000-0000-000000000000")
        );

        let error = adapter.get("id".into(), DataType::Blob).unwrap_err();
        assert!(error_kind(&error).unwrap().is_mapping());
        let error = adapter.get("missing".into(), DataType::Int32).unwrap_err();
        assert!(format!("{error:#}").contains("ID, name, created, token"));
        assert!(adapter.get(ColumnRef::Index(4), DataType::Int32).is_err());
    }

    #[test]
    fn row_adapter_range_checks() {
        let registry = TypeRegistry::new();
        let (row, columns) = row(vec![Value::Int64(Some(1_000))], &[("n", DataType::Int64)]);
        let mut adapter = RowAdapter::new(&row, &columns, &registry);
        let error = adapter.get("n".into(), DataType::Int8).unwrap_err();
        assert!(error_kind(&error).unwrap().is_mapping());
        assert_eq!(
            adapter.get("n".into(), DataType::Int16).unwrap(),
            Value::Int16(Some(1_000))
        );
    }

    #[test]
    fn registry_encode() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.encode(1_i64.as_value(), Some(DataType::Int16)).unwrap(),
            Value::Int16(Some(1))
        );
        assert_eq!(
            registry.encode(Value::from("a"), None).unwrap(),
            Value::from("a")
        );
        let registry = TypeRegistry::empty();
        let error = registry
            .encode(1_i64.as_value(), Some(DataType::Int16))
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_binding());
    }

    #[test]
    fn classify() {
        let result: sluice_core::Result<()> = Err(Error::msg("boom"));
        let error = result
            .classify(|| ErrorKind::Execution("running".into()))
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_execution());

        let result: sluice_core::Result<()> = Err(Error::new(ErrorKind::Mapping("inner".into())));
        let error = result
            .classify(|| ErrorKind::Execution("running".into()))
            .unwrap_err();
        assert!(error_kind(&error).unwrap().is_mapping());
        assert!(error_kind(&Error::msg("plain")).is_none());
    }

    #[test]
    fn printable_text() {
        assert_eq!(printable("SELECT 1"), "SELECT 1");
        let long = "x".repeat(600);
        let result = printable(&long);
        assert_eq!(result.len(), 500);
        assert!(result.ends_with("..."));
        let accented = "é".repeat(300);
        assert!(printable(&accented).ends_with("..."));
    }
}
