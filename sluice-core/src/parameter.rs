use crate::{AsValue, DataType, Error, ErrorKind, Result, Value};
use rust_decimal::Decimal;
use std::{any, collections::HashMap};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Parameter object of a statement.
///
/// Scalars are bound as they are, structured parameters expose named properties. Key
/// propagation writes generated values back through [`Parameter::set_property`].
pub trait Parameter: Send + Sync {
    fn type_name(&self) -> &'static str;
    /// The whole parameter as a single value, `None` for structured parameters.
    fn scalar(&self) -> Option<Value> {
        None
    }
    fn property(&self, name: &str) -> Result<Value> {
        Err(Error::new(ErrorKind::Binding(format!(
            "There is no getter for property named `{}` in `{}`",
            name,
            self.type_name()
        ))))
    }
    /// Type accepted by the setter of `name`, `None` when there is no such setter.
    fn setter_type(&self, _name: &str) -> Option<DataType> {
        None
    }
    fn set_property(&mut self, name: &str, _value: Value) -> Result<()> {
        Err(Error::new(ErrorKind::Configuration(format!(
            "No setter found for the property `{}` in `{}`",
            name,
            self.type_name()
        ))))
    }
}

macro_rules! impl_parameter {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Parameter for $ty {
                fn type_name(&self) -> &'static str {
                    any::type_name::<Self>()
                }
                fn scalar(&self) -> Option<Value> {
                    Some(AsValue::as_value(self.clone()))
                }
            }
            impl Parameter for Option<$ty> {
                fn type_name(&self) -> &'static str {
                    any::type_name::<Self>()
                }
                fn scalar(&self) -> Option<Value> {
                    Some(AsValue::as_value(self.clone()))
                }
            }
        )+
    };
}
impl_parameter!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    char,
    String,
    Box<[u8]>,
    Vec<u8>,
    Decimal,
    Date,
    Time,
    PrimitiveDateTime,
    OffsetDateTime,
    Uuid,
);

impl Parameter for Value {
    fn type_name(&self) -> &'static str {
        any::type_name::<Self>()
    }
    fn scalar(&self) -> Option<Value> {
        Some(self.clone())
    }
}

/// No parameter at all: every bind point resolves to NULL.
impl Parameter for () {
    fn type_name(&self) -> &'static str {
        "()"
    }
    fn scalar(&self) -> Option<Value> {
        Some(Value::Null)
    }
}

impl Parameter for HashMap<String, Value> {
    fn type_name(&self) -> &'static str {
        any::type_name::<Self>()
    }
    fn property(&self, name: &str) -> Result<Value> {
        Ok(self.get(name).cloned().unwrap_or_default())
    }
    fn setter_type(&self, _name: &str) -> Option<DataType> {
        Some(DataType::Unknown)
    }
    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.insert(name.to_string(), value);
        Ok(())
    }
}
