use crate::{
    ColumnMetadata, DataType, Error, ErrorKind, Result, RowLabeled, TypeRegistry, Value,
};
use std::fmt::{self, Display};
use time::{PrimitiveDateTime, UtcOffset};

/// Column reference, either by position (from 0) or by name (case insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl Display for ColumnRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "#{i}"),
            ColumnRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for ColumnRef<'_> {
    fn from(value: usize) -> Self {
        ColumnRef::Index(value)
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(value: &'a str) -> Self {
        ColumnRef::Name(value)
    }
}

/// Column access over a single row, the contract every [`crate::TypeHandler`] reads through.
pub trait RowAccess {
    fn columns(&self) -> &[ColumnMetadata];
    fn find_column(&self, column: ColumnRef<'_>) -> Option<usize> {
        match column {
            ColumnRef::Index(i) if i < self.columns().len() => Some(i),
            ColumnRef::Index(..) => None,
            ColumnRef::Name(name) => self
                .columns()
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name)),
        }
    }
    /// Read the column converted to `requested`. A NULL cell yields the typed NULL of
    /// `requested` and sets [`RowAccess::was_null`].
    fn get(&mut self, column: ColumnRef<'_>, requested: DataType) -> Result<Value>;
    /// Whether the last value returned by `get` was NULL.
    fn was_null(&self) -> bool;
}

/// Adapts one driver row to [`RowAccess`].
///
/// Conversions go through the registry coercion table first, then through the special cases
/// where the driver representation differs from the requested one.
pub struct RowAdapter<'a> {
    row: &'a RowLabeled,
    columns: &'a [ColumnMetadata],
    registry: &'a TypeRegistry,
    last: Option<Value>,
}

impl<'a> RowAdapter<'a> {
    pub fn new(row: &'a RowLabeled, columns: &'a [ColumnMetadata], registry: &'a TypeRegistry) -> Self {
        Self {
            row,
            columns,
            registry,
            last: None,
        }
    }

    fn convert(value: Value, requested: DataType) -> Result<Value> {
        Ok(match (requested, value) {
            (DataType::Timestamp, Value::TimestampWithTimezone(Some(v))) => {
                let v = v.to_offset(UtcOffset::UTC);
                Value::Timestamp(Some(PrimitiveDateTime::new(v.date(), v.time())))
            }
            (DataType::Date, Value::Timestamp(Some(v))) => Value::Date(Some(v.date())),
            (DataType::Date, Value::TimestampWithTimezone(Some(v))) => Value::Date(Some(v.date())),
            (DataType::Time, Value::Timestamp(Some(v))) => Value::Time(Some(v.time())),
            (DataType::Time, Value::TimestampWithTimezone(Some(v))) => Value::Time(Some(v.time())),
            (DataType::Timestamp, Value::Date(Some(v))) => Value::Timestamp(Some(v.midnight())),
            (DataType::Varchar, Value::Uuid(Some(v))) => Value::Varchar(Some(v.to_string())),
            (requested, value) => value.convert(requested)?,
        })
    }
}

impl RowAccess for RowAdapter<'_> {
    fn columns(&self) -> &[ColumnMetadata] {
        self.columns
    }

    fn get(&mut self, column: ColumnRef<'_>, requested: DataType) -> Result<Value> {
        let Some(index) = self.find_column(column) else {
            return Err(Error::new(ErrorKind::Mapping(format!(
                "Column `{}` does not exist in the row, available columns: {}",
                column,
                crate::join_display(self.columns.iter().map(|c| &c.name), ", ")
            ))));
        };
        let name = &self.columns[index].name;
        let Some(value) = self.row.values.get(index) else {
            return Err(Error::new(ErrorKind::Mapping(format!(
                "Row has {} values but column `{}` is at position {}",
                self.row.values.len(),
                name,
                index
            ))));
        };
        if value.is_null() {
            self.last = Some(Value::Null);
            return Ok(requested.empty_value());
        }
        let kind = value.data_type();
        if !self.registry.has_coercion(requested, kind) {
            return Err(Error::new(ErrorKind::Mapping(format!(
                "No coercion registered for {} from column `{}` of type {}",
                requested, name, kind
            ))));
        }
        let result = Self::convert(value.clone(), requested).map_err(|e| {
            e.context(ErrorKind::Mapping(format!(
                "Could not read column `{}` of type {} as {}",
                name, kind, requested
            )))
        })?;
        self.last = Some(result.clone());
        Ok(result)
    }

    fn was_null(&self) -> bool {
        self.last.as_ref().is_some_and(Value::is_null)
    }
}
