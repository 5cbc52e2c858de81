use crate::{DataType, Error, Result, Value, consume_while, printable};
use anyhow::Context;
use atoi::FromRadix10SignedChecked;
use fast_float::parse_partial;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, str::FromStr};
use time::{OffsetDateTime, PrimitiveDateTime, format_description::parse_borrowed};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// This is the primitive the type registry builds on: reading a column as some Rust type ends
/// up in [`AsValue::try_from_value`], binding a parameter ends up in [`AsValue::as_value`].
///
/// # Parsing contract
/// - `parse` delegates to `extract` then verifies the input is exhausted.
/// - `extract` MUST update the input slice only on success.
///
/// # Examples
/// ```rust
/// use sluice_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Type tag of the values produced by `as_value`.
    const DATA_TYPE: DataType;
    /// True when NULL is a legal value for this type (`Option<T>`, `Value`).
    const NULLABLE: bool = false;

    /// Typed NULL for this type.
    fn as_empty_value() -> Value {
        Self::DATA_TYPE.empty_value()
    }
    fn as_value(self) -> Value;
    /// Convert a dynamic value into `Self`.
    ///
    /// Accepts the canonical variant, other variants that convert without loss (integers of
    /// any width are range checked) and `Value::Unknown` through [`AsValue::parse`].
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        let mut value = input.as_ref();
        let result = Self::extract(&mut value)?;
        if !value.is_empty() {
            return Err(Error::msg(format!(
                "Value `{}` parsed correctly as {} but it did not consume all the input (remaining: `{}`)",
                printable(input.as_ref()),
                any::type_name::<Self>(),
                printable(value),
            )));
        }
        Ok(result)
    }
    fn extract(value: &mut &str) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse '{value}' as {}",
            any::type_name::<Self>()
        )))
    }
}

fn strip_quote(value: &mut &str) -> &'static str {
    if value.starts_with('"') {
        *value = &value[1..];
        "\""
    } else if value.starts_with('\'') {
        *value = &value[1..];
        "'"
    } else {
        ""
    }
}

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $data_type:path) => {
        impl AsValue for $source {
            const DATA_TYPE: DataType = $data_type;
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    Value::Decimal(Some(v)) => {
                        if !v.is_integer() {
                            return Err(Error::msg(format!(
                                "Value {v}: Decimal is not an integer and does not fit into {}",
                                any::type_name::<Self>(),
                            )));
                        }
                        v.to_i128()
                            .and_then(|v| <$source>::try_from(v).ok())
                            .ok_or_else(|| Error::msg(format!(
                                "Value {v}: Decimal is out of range for {}",
                                any::type_name::<Self>(),
                            )))
                    }
                    Value::Unknown(Some(ref v)) => Self::parse(v),
                    ref other => match other.as_integer() {
                        Some(v) => <$source>::try_from(v).map_err(|_| {
                            Error::msg(format!(
                                "Value {v}: {} is out of range for {}",
                                other.data_type(),
                                any::type_name::<Self>(),
                            ))
                        }),
                        None => Err(Error::msg(format!(
                            "Cannot convert {value:?} to {}",
                            any::type_name::<Self>(),
                        ))),
                    },
                }
            }
            fn extract(input: &mut &str) -> Result<Self> {
                let mut value = *input;
                let quote = strip_quote(&mut value);
                let (num, len) = i128::from_radix_10_signed_checked(value.as_bytes());
                if !value[..len].chars().any(|c| c.is_ascii_digit()) {
                    return Err(Error::msg(format!(
                        "Cannot extract {} from `{}`",
                        any::type_name::<Self>(),
                        printable(input),
                    )));
                }
                let num = num
                    .and_then(|v| <$source>::try_from(v).ok())
                    .ok_or_else(|| Error::msg(format!(
                        "Value `{}` is out of range for {}",
                        &value[..len],
                        any::type_name::<Self>(),
                    )))?;
                value = &value[len..];
                if !value.starts_with(quote) {
                    return Err(Error::msg(format!(
                        "Unterminated value `{}`",
                        printable(input)
                    )));
                }
                *input = &value[quote.len()..];
                Ok(num)
            }
        }
    };
}
impl_as_value!(i8, Value::Int8, DataType::Int8);
impl_as_value!(i16, Value::Int16, DataType::Int16);
impl_as_value!(i32, Value::Int32, DataType::Int32);
impl_as_value!(i64, Value::Int64, DataType::Int64);
impl_as_value!(u8, Value::UInt8, DataType::UInt8);
impl_as_value!(u16, Value::UInt16, DataType::UInt16);
impl_as_value!(u32, Value::UInt32, DataType::UInt32);
impl_as_value!(u64, Value::UInt64, DataType::UInt64);

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $data_type:path, $extract:expr $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            const DATA_TYPE: DataType = $data_type;
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    Value::Unknown(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(Error::msg(format!(
                        "Cannot convert {value:?} to {}",
                        any::type_name::<Self>(),
                    ))),
                }
            }
            fn extract(value: &mut &str) -> Result<Self> {
                $extract(value)
            }
        }
    };
}
impl_as_value!(
    bool,
    Value::Boolean,
    DataType::Boolean,
    |input: &mut &str| {
        let mut value = *input;
        let result = consume_while(&mut value, |v| v.is_alphanumeric() || *v == '_');
        let result = match result {
            x if x.eq_ignore_ascii_case("true") || x.eq_ignore_ascii_case("t") || x.eq("1") => Ok(true),
            x if x.eq_ignore_ascii_case("false") || x.eq_ignore_ascii_case("f") || x.eq("0") => Ok(false),
            _ => return Err(Error::msg(format!("Cannot parse boolean from '{input}'"))),
        };
        *input = value;
        result
    },
    Value::Int8(Some(v)) => Ok(v != 0),
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
    Value::UInt8(Some(v)) => Ok(v != 0),
    Value::UInt16(Some(v)) => Ok(v != 0),
    Value::UInt32(Some(v)) => Ok(v != 0),
    Value::UInt64(Some(v)) => Ok(v != 0),
);

macro_rules! extract_float {
    ($input:expr) => {{
        let mut value = *$input;
        let quote = strip_quote(&mut value);
        let context = || {
            format!(
                "Cannot extract a floating point value from `{}`",
                printable($input)
            )
        };
        let (num, tail) = parse_partial(value).with_context(context)?;
        value = &value[tail..];
        if !value.starts_with(quote) {
            return Err(Error::msg(context()));
        }
        *$input = &value[quote.len()..];
        Ok(num)
    }};
}
impl_as_value!(
    f32,
    Value::Float32,
    DataType::Float32,
    |input: &mut &str| extract_float!(input),
    Value::Float64(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v
        .to_f32()
        .ok_or_else(|| Error::msg(format!("Value {v}: Decimal does not fit into f32"))),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
    Value::UInt8(Some(v)) => Ok(v as _),
    Value::UInt16(Some(v)) => Ok(v as _),
    Value::UInt32(Some(v)) => Ok(v as _),
    Value::UInt64(Some(v)) => Ok(v as _),
);
impl_as_value!(
    f64,
    Value::Float64,
    DataType::Float64,
    |input: &mut &str| extract_float!(input),
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v
        .to_f64()
        .ok_or_else(|| Error::msg(format!("Value {v}: Decimal does not fit into f64"))),
    Value::Int8(Some(v)) => Ok(v as _),
    Value::Int16(Some(v)) => Ok(v as _),
    Value::Int32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
    Value::UInt8(Some(v)) => Ok(v as _),
    Value::UInt16(Some(v)) => Ok(v as _),
    Value::UInt32(Some(v)) => Ok(v as _),
    Value::UInt64(Some(v)) => Ok(v as _),
);

impl_as_value!(
    char,
    Value::Char,
    DataType::Char,
    |input: &mut &str| {
        let mut value = *input;
        let quote = strip_quote(&mut value);
        let mut chars = value.chars();
        let Some(c) = chars.next() else {
            return Err(Error::msg("Cannot extract a char from an empty string"));
        };
        value = chars.as_str();
        if !value.starts_with(quote) {
            return Err(Error::msg(format!(
                "Cannot convert `{}` into a char, unterminated string",
                printable(input)
            )));
        }
        *input = &value[quote.len()..];
        Ok(c)
    },
    Value::Varchar(Some(ref v)) => {
        let mut chars = v.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::msg(format!(
                "Cannot convert Value::Varchar `{}` into a char, it must contain exactly one character",
                printable(v)
            ))),
        }
    },
);
impl_as_value!(
    String,
    Value::Varchar,
    DataType::Varchar,
    |input: &mut &str| {
        let mut value = *input;
        let delimiter = match value.chars().next() {
            Some(c @ ('\'' | '"')) => {
                value = &value[1..];
                Some(c)
            }
            _ => None,
        };
        let Some(delimiter) = delimiter else {
            *input = "";
            return Ok(value.to_string());
        };
        let mut result = String::with_capacity(value.len());
        let mut chars = value.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == delimiter {
                if let Some((_, next)) = chars.peek()
                    && *next == delimiter
                {
                    result.push(c);
                    chars.next();
                    continue;
                }
                *input = &value[i + c.len_utf8()..];
                return Ok(result);
            }
            result.push(c);
        }
        Err(Error::msg(format!(
            "Unterminated string `{}`",
            printable(input)
        )))
    },
    Value::Char(Some(v)) => Ok(v.into()),
    Value::Unknown(Some(v)) => Ok(v),
);
impl_as_value!(Box<[u8]>, Value::Blob, DataType::Blob, |input: &mut &str| {
    let mut value = *input;
    if value.len() >= 2 && value[0..2].eq_ignore_ascii_case("\\x") {
        value = &value[2..];
    }
    let hex = consume_while(&mut value, char::is_ascii_hexdigit);
    let result = hex::decode(hex).map(Into::into).with_context(|| {
        format!(
            "While decoding `{}` as {}",
            printable(input),
            any::type_name::<Self>()
        )
    })?;
    *input = value;
    Ok(result)
});
impl_as_value!(
    Uuid,
    Value::Uuid,
    DataType::Uuid,
    |input: &mut &str| {
        let mut value = *input;
        let quote = strip_quote(&mut value);
        let context = || format!("Cannot extract a uuid value from `{}`", printable(input));
        let Some(candidate) = value.get(0..36) else {
            return Err(Error::msg(context()));
        };
        let uuid = Uuid::parse_str(candidate).with_context(context)?;
        value = &value[36..];
        if !value.starts_with(quote) {
            return Err(Error::msg(context()));
        }
        *input = &value[quote.len()..];
        Ok(uuid)
    },
    Value::Varchar(Some(v)) => Self::parse(v),
);

impl AsValue for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Blob;
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        <Box<[u8]> as AsValue>::try_from_value(value).map(Into::into)
    }
    fn extract(value: &mut &str) -> Result<Self> {
        <Box<[u8]> as AsValue>::extract(value).map(Into::into)
    }
}

macro_rules! parse_time {
    ($value: ident, $($formats:literal),+ $(,)?) => {
        'value: {
            for format in [$($formats,)+] {
                let format = parse_borrowed::<2>(format)?;
                let mut parsed = time::parsing::Parsed::new();
                let remaining = parsed.parse_items($value.as_bytes(), &format);
                if let Ok(remaining) = remaining {
                    let result = parsed.try_into()?;
                    *$value = &$value[($value.len() - remaining.len())..];
                    break 'value Ok(result);
                }
            }
            Err(Error::msg(format!(
                "Cannot extract from `{}` as {}",
                printable($value),
                any::type_name::<Self>()
            )))
        }
    }
}

impl_as_value!(
    time::Date,
    Value::Date,
    DataType::Date,
    |v: &mut &str| {
        let result: time::Date = parse_time!(v, "[year]-[month]-[day]")?;
        Ok(result)
    },
    Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
);
impl_as_value!(
    time::Time,
    Value::Time,
    DataType::Time,
    |v: &mut &str| {
        let result: time::Time = parse_time!(
            v,
            "[hour]:[minute]:[second].[subsecond]",
            "[hour]:[minute]:[second]",
            "[hour]:[minute]",
        )?;
        Ok(result)
    },
    Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
);
impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    DataType::Timestamp,
    |v: &mut &str| {
        let result: PrimitiveDateTime = parse_time!(
            v,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day]T[hour]:[minute]:[second]",
            "[year]-[month]-[day]T[hour]:[minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day] [hour]:[minute]:[second]",
            "[year]-[month]-[day] [hour]:[minute]",
        )?;
        Ok(result)
    },
    Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
);
impl_as_value!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    DataType::TimestampWithTimezone,
    |v: &mut &str| {
        let result: OffsetDateTime = parse_time!(
            v,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]",
        )
        .or_else(|_: Error| <PrimitiveDateTime as AsValue>::extract(v).map(|v| v.assume_utc()))?;
        Ok(result)
    },
    Value::Timestamp(Some(timestamp)) => Ok(timestamp.assume_utc()),
    Value::Varchar(Some(v)) => <Self as AsValue>::parse(v),
);

impl AsValue for Decimal {
    const DATA_TYPE: DataType = DataType::Decimal;
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(Some(v)) => Ok(v),
            Value::Float32(Some(v)) => Decimal::from_f32(v)
                .ok_or_else(|| Error::msg(format!("Cannot convert {value:?} to Decimal"))),
            Value::Float64(Some(v)) => Decimal::from_f64(v)
                .ok_or_else(|| Error::msg(format!("Cannot convert {value:?} to Decimal"))),
            Value::Unknown(Some(ref v)) => Self::parse(v),
            ref v => v
                .as_integer()
                .and_then(Decimal::from_i128)
                .ok_or_else(|| Error::msg(format!("Cannot convert {value:?} to Decimal"))),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let mut value = *input;
        let number = consume_while(&mut value, |c| {
            c.is_ascii_digit() || matches!(*c, '-' | '+' | '.')
        });
        let result = Decimal::from_str(number).with_context(|| {
            format!("Cannot extract a Decimal from `{}`", printable(input))
        })?;
        *input = value;
        Ok(result)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    const DATA_TYPE: DataType = T::DATA_TYPE;
    const NULLABLE: bool = true;
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
    fn extract(value: &mut &str) -> Result<Self> {
        T::extract(value).map(Some)
    }
}

impl AsValue for Value {
    const DATA_TYPE: DataType = DataType::Unknown;
    const NULLABLE: bool = true;
    fn as_empty_value() -> Value {
        Value::Null
    }
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

impl Value {
    /// Converts this value into the canonical variant of `target`.
    ///
    /// NULL of any kind becomes the typed NULL of `target`, `DataType::Unknown` keeps the value as
    /// it is.
    pub fn convert(self, target: DataType) -> Result<Value> {
        if self.is_null() {
            return Ok(target.empty_value());
        }
        macro_rules! via {
            ($ty:ty) => {
                <$ty as AsValue>::try_from_value(self).map(AsValue::as_value)
            };
        }
        match target {
            DataType::Unknown => Ok(self),
            DataType::Null => Err(Error::msg(format!(
                "Cannot convert {self:?} to a NULL without type"
            ))),
            DataType::Boolean => via!(bool),
            DataType::Int8 => via!(i8),
            DataType::Int16 => via!(i16),
            DataType::Int32 => via!(i32),
            DataType::Int64 => via!(i64),
            DataType::UInt8 => via!(u8),
            DataType::UInt16 => via!(u16),
            DataType::UInt32 => via!(u32),
            DataType::UInt64 => via!(u64),
            DataType::Float32 => via!(f32),
            DataType::Float64 => via!(f64),
            DataType::Decimal => via!(Decimal),
            DataType::Char => via!(char),
            DataType::Varchar => via!(String),
            DataType::Blob => via!(Box<[u8]>),
            DataType::Date => via!(time::Date),
            DataType::Time => via!(time::Time),
            DataType::Timestamp => via!(PrimitiveDateTime),
            DataType::TimestampWithTimezone => via!(OffsetDateTime),
            DataType::Uuid => via!(Uuid),
        }
    }
}
