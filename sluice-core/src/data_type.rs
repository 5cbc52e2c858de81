use crate::{Error, ErrorKind, Result, Value};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// Type tag of a [`Value`].
///
/// Used as the target type of a coercion, the kind of a result column and the declared type of
/// a bind point. As a coercion target, `Unknown` means "keep whatever the driver produced".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Char,
    Varchar,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Uuid,
    Unknown,
}

impl DataType {
    pub const ALL: [DataType; 22] = [
        DataType::Null,
        DataType::Boolean,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
        DataType::Decimal,
        DataType::Char,
        DataType::Varchar,
        DataType::Blob,
        DataType::Date,
        DataType::Time,
        DataType::Timestamp,
        DataType::TimestampWithTimezone,
        DataType::Uuid,
        DataType::Unknown,
    ];

    /// Typed NULL of this type.
    pub fn empty_value(self) -> Value {
        match self {
            DataType::Null => Value::Null,
            DataType::Boolean => Value::Boolean(None),
            DataType::Int8 => Value::Int8(None),
            DataType::Int16 => Value::Int16(None),
            DataType::Int32 => Value::Int32(None),
            DataType::Int64 => Value::Int64(None),
            DataType::UInt8 => Value::UInt8(None),
            DataType::UInt16 => Value::UInt16(None),
            DataType::UInt32 => Value::UInt32(None),
            DataType::UInt64 => Value::UInt64(None),
            DataType::Float32 => Value::Float32(None),
            DataType::Float64 => Value::Float64(None),
            DataType::Decimal => Value::Decimal(None),
            DataType::Char => Value::Char(None),
            DataType::Varchar => Value::Varchar(None),
            DataType::Blob => Value::Blob(None),
            DataType::Date => Value::Date(None),
            DataType::Time => Value::Time(None),
            DataType::Timestamp => Value::Timestamp(None),
            DataType::TimestampWithTimezone => Value::TimestampWithTimezone(None),
            DataType::Uuid => Value::Uuid(None),
            DataType::Unknown => Value::Unknown(None),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                DataType::Float32 | DataType::Float64 | DataType::Decimal
            )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::Timestamp | DataType::TimestampWithTimezone
        )
    }

    /// Built in coercion table: can a column of kind `column` be read as `self`.
    ///
    /// Numeric conversions are still range checked when the value is read, this only answers
    /// whether a conversion exists.
    pub fn is_coercible_from(self, column: DataType) -> bool {
        if self == column || matches!(column, DataType::Null | DataType::Unknown) {
            return true;
        }
        match self {
            DataType::Unknown => true,
            DataType::Null => false,
            DataType::Boolean => column.is_integer(),
            v if v.is_numeric() => column.is_numeric(),
            DataType::Char => column == DataType::Varchar,
            DataType::Varchar => matches!(column, DataType::Char | DataType::Uuid),
            DataType::Blob => false,
            DataType::Date | DataType::Time => matches!(
                column,
                DataType::Timestamp | DataType::TimestampWithTimezone | DataType::Varchar
            ),
            DataType::Timestamp => matches!(
                column,
                DataType::TimestampWithTimezone | DataType::Date | DataType::Varchar
            ),
            DataType::TimestampWithTimezone => {
                matches!(column, DataType::Timestamp | DataType::Varchar)
            }
            DataType::Uuid => column == DataType::Varchar,
            _ => false,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Null => "NULL",
            DataType::Boolean => "BOOLEAN",
            DataType::Int8 => "TINYINT",
            DataType::Int16 => "SMALLINT",
            DataType::Int32 => "INTEGER",
            DataType::Int64 => "BIGINT",
            DataType::UInt8 => "UTINYINT",
            DataType::UInt16 => "USMALLINT",
            DataType::UInt32 => "UINTEGER",
            DataType::UInt64 => "UBIGINT",
            DataType::Float32 => "FLOAT",
            DataType::Float64 => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::Char => "CHAR",
            DataType::Varchar => "VARCHAR",
            DataType::Blob => "BLOB",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::TimestampWithTimezone => "TIMESTAMP WITH TIME ZONE",
            DataType::Uuid => "UUID",
            DataType::Unknown => "OTHER",
        })
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace(['_', ' '], "").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|v| v.to_string().replace(' ', "") == normalized)
            .or(match normalized.as_str() {
                "INT" => Some(DataType::Int32),
                "TEXT" | "STRING" => Some(DataType::Varchar),
                "TIMESTAMPTZ" => Some(DataType::TimestampWithTimezone),
                "REAL" => Some(DataType::Float32),
                "BOOL" => Some(DataType::Boolean),
                _ => None,
            })
            .ok_or_else(|| {
                Error::new(ErrorKind::Configuration(format!(
                    "Unknown data type `{}`",
                    s
                )))
            })
    }
}
