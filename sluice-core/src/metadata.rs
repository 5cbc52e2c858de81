use crate::{DataType, Parameter, Result, ResultType, TypeHandler, Value, printable};
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Display},
    sync::Arc,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlCommandType {
    Select,
    Insert,
    Update,
    Delete,
}

/// How the statement text reaches the driver. Only `Prepared` is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatementType {
    /// Plain text, no placeholders.
    Statement,
    #[default]
    Prepared,
    /// Stored procedure call.
    Callable,
}

/// One bind point of the resolved SQL, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    pub property: String,
    pub data_type: Option<DataType>,
}

impl ParameterMapping {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            data_type: None,
        }
    }
    pub fn typed(property: impl Into<String>, data_type: DataType) -> Self {
        Self {
            property: property.into(),
            data_type: Some(data_type),
        }
    }
}

/// SQL text with its bind points, ready for the driver.
#[derive(Debug, Clone, Default)]
pub struct BoundSql {
    pub sql: String,
    pub parameter_mappings: Vec<ParameterMapping>,
    /// Values produced while resolving the text, looked up before the parameter object.
    pub additional_parameters: HashMap<String, Value>,
}

impl BoundSql {
    pub fn new(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self {
            sql: sql.into(),
            parameter_mappings,
            additional_parameters: HashMap::new(),
        }
    }
}

impl Display for BoundSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printable(&self.sql))
    }
}

/// Produces the SQL for a parameter object. Dynamic templating lives outside this crate and
/// plugs in here.
pub trait SqlSource: Send + Sync + Debug {
    fn bound_sql(&self, parameter: &dyn Parameter) -> Result<BoundSql>;
}

#[derive(Debug, Clone)]
pub struct StaticSqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl StaticSqlSource {
    pub fn new(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self {
            sql: sql.into(),
            parameter_mappings,
        }
    }
}

impl SqlSource for StaticSqlSource {
    fn bound_sql(&self, _parameter: &dyn Parameter) -> Result<BoundSql> {
        Ok(BoundSql::new(
            self.sql.clone(),
            self.parameter_mappings.clone(),
        ))
    }
}

/// Column to property rule of a result map.
#[derive(Debug, Clone, Default)]
pub struct ResultMapping {
    pub property: String,
    pub column: Option<String>,
    pub data_type: Option<DataType>,
    pub type_handler: Option<Arc<dyn TypeHandler>>,
    pub nested_result_map_id: Option<String>,
    pub nested_query_id: Option<String>,
    pub column_prefix: Option<String>,
}

impl ResultMapping {
    pub fn new(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            column: Some(column.into()),
            ..Default::default()
        }
    }
    /// Constructor argument read from `column`.
    pub fn argument(column: impl Into<String>) -> Self {
        Self::new(String::new(), column)
    }
    /// Property (or constructor argument) built by another result map on the same row.
    pub fn nested(property: impl Into<String>, result_map_id: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            nested_result_map_id: Some(result_map_id.into()),
            ..Default::default()
        }
    }
    /// Property loaded by running another statement.
    pub fn nested_query(
        property: impl Into<String>,
        column: impl Into<String>,
        query_id: impl Into<String>,
    ) -> Self {
        Self {
            nested_query_id: Some(query_id.into()),
            ..Self::new(property, column)
        }
    }
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
    pub fn with_handler(mut self, handler: impl TypeHandler + 'static) -> Self {
        self.type_handler = Some(Arc::new(handler));
        self
    }
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.column_prefix = Some(prefix.into());
        self
    }
    pub fn is_nested(&self) -> bool {
        self.nested_result_map_id.is_some()
    }
}

/// Rules to convert the rows of one result set into objects.
#[derive(Debug, Clone)]
pub struct ResultMap {
    pub id: String,
    pub result_type: ResultType,
    pub property_mappings: Vec<ResultMapping>,
    pub constructor_mappings: Vec<ResultMapping>,
    /// Overrides the configuration auto mapping behavior for this map.
    pub auto_mapping: Option<bool>,
}

impl ResultMap {
    pub fn new(id: impl Into<String>, result_type: ResultType) -> Self {
        Self {
            id: id.into(),
            result_type,
            property_mappings: Vec::new(),
            constructor_mappings: Vec::new(),
            auto_mapping: None,
        }
    }
    pub fn with_property(mut self, mapping: ResultMapping) -> Self {
        self.property_mappings.push(mapping);
        self
    }
    pub fn with_argument(mut self, mapping: ResultMapping) -> Self {
        self.constructor_mappings.push(mapping);
        self
    }
    pub fn with_auto_mapping(mut self, auto_mapping: bool) -> Self {
        self.auto_mapping = Some(auto_mapping);
        self
    }
    /// Upper case names of the columns explicitly mapped, `prefix` included.
    pub fn mapped_columns(&self, prefix: &str) -> HashSet<String> {
        self.property_mappings
            .iter()
            .chain(self.constructor_mappings.iter())
            .filter(|m| !m.is_nested())
            .filter_map(|m| m.column.as_ref())
            .map(|c| format!("{prefix}{c}").to_uppercase())
            .collect()
    }
    pub fn mapped_properties(&self) -> HashSet<&str> {
        self.property_mappings
            .iter()
            .map(|m| m.property.as_str())
            .collect()
    }
}

/// In memory window applied to every mapped result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    pub const NO_ROW_OFFSET: usize = 0;
    pub const NO_ROW_LIMIT: usize = usize::MAX;

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::new(Self::NO_ROW_OFFSET, Self::NO_ROW_LIMIT)
    }
}

/// Compiled description of one named SQL operation.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    pub id: String,
    pub command_type: SqlCommandType,
    pub statement_type: StatementType,
    pub sql_source: Arc<dyn SqlSource>,
    pub result_maps: Vec<Arc<ResultMap>>,
    /// Properties of the parameter object receiving generated keys.
    pub key_properties: Vec<String>,
    /// Generated columns, aligned with `key_properties`. Empty means same names as the properties.
    pub key_columns: Vec<String>,
    pub fetch_size: Option<u32>,
    pub timeout: Option<Duration>,
}

impl MappedStatement {
    pub fn new(
        id: impl Into<String>,
        command_type: SqlCommandType,
        sql_source: impl SqlSource + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            command_type,
            statement_type: StatementType::default(),
            sql_source: Arc::new(sql_source),
            result_maps: Vec::new(),
            key_properties: Vec::new(),
            key_columns: Vec::new(),
            fetch_size: None,
            timeout: None,
        }
    }
    pub fn with_statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = statement_type;
        self
    }
    pub fn with_result_map(mut self, result_map: impl Into<Arc<ResultMap>>) -> Self {
        self.result_maps.push(result_map.into());
        self
    }
    pub fn with_keys<S: Into<String>>(
        mut self,
        properties: impl IntoIterator<Item = S>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.key_properties = properties.into_iter().map(Into::into).collect();
        self.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn bound_sql(&self, parameter: &dyn Parameter) -> Result<BoundSql> {
        self.sql_source.bound_sql(parameter)
    }
    /// Column holding the generated value of the i-th key property.
    pub fn key_column(&self, index: usize) -> Option<&str> {
        self.key_columns
            .get(index)
            .or(self.key_properties.get(index))
            .map(String::as_str)
    }
}
