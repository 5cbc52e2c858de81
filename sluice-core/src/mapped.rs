use crate::{AsValue, DataType, Error, ErrorKind, Result, Value};
use std::{
    any::{self, Any},
    fmt::{self, Debug},
};

/// Value handed to a property setter or a constructor argument.
pub enum FieldValue {
    Value(Value),
    /// Result of a nested result map.
    Object(Box<dyn Any + Send>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Value(v) if v.is_null())
    }
    pub fn into_value<T: AsValue>(self) -> Result<T> {
        match self {
            FieldValue::Value(v) => T::try_from_value(v),
            FieldValue::Object(..) => Err(Error::msg(format!(
                "Expected a value of type {} but received a nested object",
                any::type_name::<T>()
            ))),
        }
    }
    pub fn into_object<T: Any>(self) -> Result<T> {
        self.into_optional_object()?.ok_or_else(|| {
            Error::msg(format!(
                "Expected an object of type {} but received NULL",
                any::type_name::<T>()
            ))
        })
    }
    pub fn into_optional_object<T: Any>(self) -> Result<Option<T>> {
        match self {
            FieldValue::Value(v) if v.is_null() => Ok(None),
            FieldValue::Value(v) => Err(Error::msg(format!(
                "Expected an object of type {} but received {:?}",
                any::type_name::<T>(),
                v
            ))),
            FieldValue::Object(v) => v.downcast::<T>().map(|v| Some(*v)).map_err(|_| {
                Error::msg(format!(
                    "Nested object is not of type {}",
                    any::type_name::<T>()
                ))
            }),
        }
    }
}

impl Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldValue::Object(..) => f.write_str("Object(..)"),
        }
    }
}

/// Mutable result object under construction.
pub trait Object: Any + Send {
    fn assign(&mut self, property: &str, value: FieldValue) -> Result<()>;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// Kind of a property or constructor parameter.
#[derive(Clone, Copy)]
pub enum PropertyKind {
    Value(DataType),
    /// Object built by a nested result map.
    Object(fn() -> ResultType),
}

impl Debug for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Value(v) => f.debug_tuple("Value").field(v).finish(),
            PropertyKind::Object(v) => f.debug_tuple("Object").field(&v().name()).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    pub name: &'static str,
    pub kind: PropertyKind,
    /// Setters of nullable properties are called with NULL when `call_setters_on_nulls` is on.
    pub nullable: bool,
}

pub type Constructor = fn(Vec<FieldValue>) -> Result<Box<dyn Object>>;

/// Compile time registered constructor.
#[derive(Debug, Clone, Copy)]
pub struct ConstructorDef {
    pub name: &'static str,
    /// Preferred over every other constructor when the type has to be built from arguments.
    pub marked: bool,
    pub params: &'static [PropertyKind],
    pub build: Constructor,
}

/// A type result rows can be mapped into, implemented by `#[derive(Mapped)]`.
pub trait Mapped: Object + Sized {
    fn properties() -> &'static [PropertyDef];
    fn constructors() -> &'static [ConstructorDef] {
        &[]
    }
    /// Empty instance whose properties are populated afterwards, `None` when the type can only
    /// be built through a constructor.
    fn instantiate() -> Option<Self> {
        None
    }
}

#[derive(Clone, Copy)]
enum Shape {
    Scalar {
        data_type: DataType,
        from_value: fn(Value) -> Result<Box<dyn Any + Send>>,
    },
    Object {
        properties: fn() -> &'static [PropertyDef],
        constructors: fn() -> &'static [ConstructorDef],
        instantiate: fn() -> Option<Box<dyn Object>>,
    },
}

/// Type erased handle over the Rust type a result map produces.
#[derive(Clone, Copy)]
pub struct ResultType {
    name: &'static str,
    shape: Shape,
}

fn scalar_from_value<T: AsValue + Send + 'static>(value: Value) -> Result<Box<dyn Any + Send>> {
    Ok(Box::new(T::try_from_value(value)?))
}

fn instantiate_object<T: Mapped>() -> Option<Box<dyn Object>> {
    T::instantiate().map(|v| Box::new(v) as Box<dyn Object>)
}

impl ResultType {
    pub fn of<T: Mapped>() -> Self {
        Self {
            name: any::type_name::<T>(),
            shape: Shape::Object {
                properties: T::properties,
                constructors: T::constructors,
                instantiate: instantiate_object::<T>,
            },
        }
    }
    /// A type converted directly from a single column.
    pub fn scalar<T: AsValue + Send + 'static>() -> Self {
        Self {
            name: any::type_name::<T>(),
            shape: Shape::Scalar {
                data_type: T::DATA_TYPE,
                from_value: scalar_from_value::<T>,
            },
        }
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    /// Data type of a scalar result, `None` for object results.
    pub fn data_type(&self) -> Option<DataType> {
        match self.shape {
            Shape::Scalar { data_type, .. } => Some(data_type),
            Shape::Object { .. } => None,
        }
    }
    pub fn scalar_from_value(&self, value: Value) -> Result<Box<dyn Any + Send>> {
        match self.shape {
            Shape::Scalar { from_value, .. } => from_value(value),
            Shape::Object { .. } => Err(Error::new(ErrorKind::Mapping(format!(
                "`{}` is not a scalar type",
                self.name
            )))),
        }
    }
    pub fn properties(&self) -> &'static [PropertyDef] {
        match self.shape {
            Shape::Scalar { .. } => &[],
            Shape::Object { properties, .. } => properties(),
        }
    }
    pub fn property(&self, name: &str) -> Option<&'static PropertyDef> {
        self.properties().iter().find(|p| p.name == name)
    }
    pub fn constructors(&self) -> &'static [ConstructorDef] {
        match self.shape {
            Shape::Scalar { .. } => &[],
            Shape::Object { constructors, .. } => constructors(),
        }
    }
    pub fn instantiate(&self) -> Option<Box<dyn Object>> {
        match self.shape {
            Shape::Scalar { .. } => None,
            Shape::Object { instantiate, .. } => instantiate(),
        }
    }
}

impl Debug for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultType").field(&self.name).finish()
    }
}
