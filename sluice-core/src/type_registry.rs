use crate::{ColumnRef, DataType, Error, ErrorKind, Result, RowAccess, Value};
use std::{collections::HashMap, fmt::Debug, sync::Arc};

/// Reads and writes values of one target type.
pub trait TypeHandler: Send + Sync + Debug {
    fn target(&self) -> DataType;
    /// Whether a column of kind `column` can be read by this handler.
    fn accepts(&self, column: DataType) -> bool {
        self.target().is_coercible_from(column)
    }
    fn get_result(&self, row: &mut dyn RowAccess, column: ColumnRef<'_>) -> Result<Value> {
        let value = row.get(column, self.target())?;
        if row.was_null() {
            return Ok(self.target().empty_value());
        }
        Ok(value)
    }
    /// Inverse direction: turn a parameter value into what the driver gets bound.
    fn encode(&self, value: Value) -> Result<Value> {
        value.convert(self.target())
    }
}

/// Handler backed by the built in [`crate::AsValue`] conversions.
#[derive(Debug, Clone, Copy)]
pub struct ValueHandler(pub DataType);

impl TypeHandler for ValueHandler {
    fn target(&self) -> DataType {
        self.0
    }
}

/// Owned table of type handlers, keyed by target type.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    handlers: HashMap<DataType, Arc<dyn TypeHandler>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry with a [`ValueHandler`] for every type.
    pub fn new() -> Self {
        let mut result = Self::empty();
        for data_type in DataType::ALL {
            if data_type != DataType::Null {
                result.register(ValueHandler(data_type));
            }
        }
        result
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add or replace the handler for its target type.
    pub fn register(&mut self, handler: impl TypeHandler + 'static) -> &mut Self {
        self.handlers.insert(handler.target(), Arc::new(handler));
        self
    }

    pub fn handler(&self, data_type: DataType) -> Option<&Arc<dyn TypeHandler>> {
        self.handlers.get(&data_type)
    }

    pub fn has_handler(&self, data_type: DataType) -> bool {
        self.handlers.contains_key(&data_type)
    }

    pub fn has_coercion(&self, data_type: DataType, column: DataType) -> bool {
        self.handler(data_type).is_some_and(|h| h.accepts(column))
    }

    fn require(&self, data_type: DataType) -> Result<&Arc<dyn TypeHandler>> {
        self.handler(data_type).ok_or_else(|| {
            Error::new(ErrorKind::Mapping(format!(
                "No type handler registered for {}",
                data_type
            )))
        })
    }

    pub fn extract(
        &self,
        row: &mut dyn RowAccess,
        column: ColumnRef<'_>,
        target: DataType,
    ) -> Result<Value> {
        self.require(target)?.get_result(row, column)
    }

    /// Convert a parameter value to the declared type, or to its own type when undeclared.
    pub fn encode(&self, value: Value, declared: Option<DataType>) -> Result<Value> {
        let data_type = declared.unwrap_or(value.data_type());
        if data_type == DataType::Null {
            return Ok(value);
        }
        self.require(data_type)
            .map_err(|e| e.context(ErrorKind::Binding(format!("Cannot encode {value:?}"))))?
            .encode(value)
    }
}
