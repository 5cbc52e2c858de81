use crate::DataType;
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed database value.
///
/// Every variant wraps an `Option`: `Value::Int64(None)` is a NULL whose type is still known,
/// which is what drivers need when binding a null parameter. `Value::Null` is a NULL with no
/// type information at all.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Char(Option<char>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    /// Textual value the driver could not assign a type to.
    Unknown(Option<String>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Char(l), Self::Char(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::Unknown(l), Self::Unknown(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Boolean(..) => DataType::Boolean,
            Value::Int8(..) => DataType::Int8,
            Value::Int16(..) => DataType::Int16,
            Value::Int32(..) => DataType::Int32,
            Value::Int64(..) => DataType::Int64,
            Value::UInt8(..) => DataType::UInt8,
            Value::UInt16(..) => DataType::UInt16,
            Value::UInt32(..) => DataType::UInt32,
            Value::UInt64(..) => DataType::UInt64,
            Value::Float32(..) => DataType::Float32,
            Value::Float64(..) => DataType::Float64,
            Value::Decimal(..) => DataType::Decimal,
            Value::Char(..) => DataType::Char,
            Value::Varchar(..) => DataType::Varchar,
            Value::Blob(..) => DataType::Blob,
            Value::Date(..) => DataType::Date,
            Value::Time(..) => DataType::Time,
            Value::Timestamp(..) => DataType::Timestamp,
            Value::TimestampWithTimezone(..) => DataType::TimestampWithTimezone,
            Value::Uuid(..) => DataType::Uuid,
            Value::Unknown(..) => DataType::Unknown,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::UInt8(v) => v.is_none(),
            Value::UInt16(v) => v.is_none(),
            Value::UInt32(v) => v.is_none(),
            Value::UInt64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Char(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::TimestampWithTimezone(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::Unknown(v) => v.is_none(),
        }
    }

    /// Widens any integer variant, used for range checked conversions.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::Int8(Some(v)) => Some(v as _),
            Value::Int16(Some(v)) => Some(v as _),
            Value::Int32(Some(v)) => Some(v as _),
            Value::Int64(Some(v)) => Some(v as _),
            Value::UInt8(Some(v)) => Some(v as _),
            Value::UInt16(Some(v)) => Some(v as _),
            Value::UInt32(Some(v)) => Some(v as _),
            Value::UInt64(Some(v)) => Some(v as _),
            _ => None,
        }
    }
}
