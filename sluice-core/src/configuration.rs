use crate::{
    AsValue, AutoMappingCache, DataType, DefaultParameterBinder, DefaultResultMapper, Error,
    ErrorKind, Interceptor, InterceptorChain, MappedStatement, Parameter, ParameterBinder, Result,
    ResultMap, ResultMapper, RowBounds, StatementHandler, TypeRegistry, route_statement_handler,
};
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use url::Url;

/// Which result maps get their unmapped columns mapped automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoMappingBehavior {
    /// Never.
    None,
    /// Only result maps without nested result maps.
    #[default]
    Partial,
    /// Every result map, nested ones included.
    Full,
}

impl FromStr for AutoMappingBehavior {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            x if x.eq_ignore_ascii_case("none") => Ok(Self::None),
            x if x.eq_ignore_ascii_case("partial") => Ok(Self::Partial),
            x if x.eq_ignore_ascii_case("full") => Ok(Self::Full),
            _ => Err(Error::new(ErrorKind::Configuration(format!(
                "Unknown auto mapping behavior `{s}`, expected one of: none, partial, full"
            )))),
        }
    }
}

/// What to do with a column auto mapping cannot assign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoMappingUnknownColumnBehavior {
    #[default]
    None,
    Warning,
    Failing,
}

impl AutoMappingUnknownColumnBehavior {
    pub fn handle(
        &self,
        statement_id: &str,
        column: &str,
        property: &str,
        data_type: Option<DataType>,
    ) -> Result<()> {
        let message = || {
            format!(
                "Unknown column is detected on `{}` auto-mapping. Mapping parameters are [column: {}, property: {}, type: {}]",
                statement_id,
                column,
                property,
                data_type.map_or("unknown".to_string(), |v| v.to_string())
            )
        };
        match self {
            Self::None => Ok(()),
            Self::Warning => {
                log::warn!("{}", message());
                Ok(())
            }
            Self::Failing => Err(Error::new(ErrorKind::Mapping(message()))),
        }
    }
}

impl FromStr for AutoMappingUnknownColumnBehavior {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            x if x.eq_ignore_ascii_case("none") => Ok(Self::None),
            x if x.eq_ignore_ascii_case("warning") => Ok(Self::Warning),
            x if x.eq_ignore_ascii_case("failing") => Ok(Self::Failing),
            _ => Err(Error::new(ErrorKind::Configuration(format!(
                "Unknown column behavior `{s}`, expected one of: none, warning, failing"
            )))),
        }
    }
}

/// Settings and registries shared by every executor of a session factory.
///
/// Built once, then shared as `Arc<Configuration>`.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub auto_mapping_behavior: AutoMappingBehavior,
    pub auto_mapping_unknown_column_behavior: AutoMappingUnknownColumnBehavior,
    /// Match `user_name` columns with `userName` properties and the other way around.
    pub map_underscore_to_camel_case: bool,
    /// Call setters of nullable properties also when the column is NULL.
    pub call_setters_on_nulls: bool,
    /// Return an instance instead of skipping the row when every column is NULL.
    pub return_instance_for_empty_row: bool,
    pub default_fetch_size: Option<u32>,
    pub default_statement_timeout: Option<Duration>,
    /// Type tag used for NULL parameters without a declared type.
    pub data_type_for_null: DataType,
    type_registry: TypeRegistry,
    interceptors: InterceptorChain,
    result_maps: HashMap<String, Arc<ResultMap>>,
    mapped_statements: HashMap<String, Arc<MappedStatement>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            auto_mapping_behavior: Default::default(),
            auto_mapping_unknown_column_behavior: Default::default(),
            map_underscore_to_camel_case: false,
            call_setters_on_nulls: false,
            return_instance_for_empty_row: false,
            default_fetch_size: None,
            default_statement_timeout: None,
            data_type_for_null: DataType::Unknown,
            type_registry: Default::default(),
            interceptors: Default::default(),
            result_maps: Default::default(),
            mapped_statements: Default::default(),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Default::default()
    }

    /// Read the settings from the query string of a connection style URL, like
    /// `mock://memory?auto_mapping_behavior=full&default_fetch_size=100`.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| {
            Error::new(e).context(ErrorKind::Configuration(format!(
                "Cannot parse configuration URL `{url}`"
            )))
        })?;
        let mut result = Self::new();
        for (key, value) in url.query_pairs() {
            result.set(&key, &value)?;
        }
        Ok(result)
    }

    /// Change a setting by name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        let context = || ErrorKind::Configuration(format!("Invalid value `{value}` for `{key}`"));
        let flag = || bool::parse(value).map_err(|e| e.context(context()));
        match key {
            "auto_mapping_behavior" => self.auto_mapping_behavior = value.parse()?,
            "auto_mapping_unknown_column_behavior" => {
                self.auto_mapping_unknown_column_behavior = value.parse()?
            }
            "map_underscore_to_camel_case" => self.map_underscore_to_camel_case = flag()?,
            "call_setters_on_nulls" => self.call_setters_on_nulls = flag()?,
            "return_instance_for_empty_row" => self.return_instance_for_empty_row = flag()?,
            "default_fetch_size" => {
                self.default_fetch_size =
                    Some(u32::parse(value).map_err(|e| e.context(context()))?)
            }
            "default_statement_timeout" => {
                self.default_statement_timeout = Some(Duration::from_secs(
                    u64::parse(value).map_err(|e| e.context(context()))?,
                ))
            }
            "data_type_for_null" => self.data_type_for_null = value.parse()?,
            _ => {
                return Err(Error::new(ErrorKind::Configuration(format!(
                    "Unknown setting `{key}`"
                ))));
            }
        }
        Ok(self)
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.type_registry
    }
    pub fn type_registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.type_registry
    }

    /// Install an interceptor, the last one installed is the outermost.
    pub fn add_interceptor(&mut self, interceptor: impl Interceptor + 'static) -> &mut Self {
        self.interceptors.add_interceptor(interceptor);
        self
    }
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    pub fn add_result_map(&mut self, result_map: ResultMap) -> Result<&mut Self> {
        if self.result_maps.contains_key(&result_map.id) {
            return Err(Error::new(ErrorKind::Configuration(format!(
                "Result map `{}` is already registered",
                result_map.id
            ))));
        }
        self.result_maps
            .insert(result_map.id.clone(), Arc::new(result_map));
        Ok(self)
    }
    pub fn result_map(&self, id: &str) -> Result<&Arc<ResultMap>> {
        self.result_maps.get(id).ok_or_else(|| {
            Error::new(ErrorKind::Configuration(format!(
                "Result map `{id}` is not registered"
            )))
        })
    }

    pub fn add_mapped_statement(&mut self, statement: MappedStatement) -> Result<&mut Self> {
        if self.mapped_statements.contains_key(&statement.id) {
            return Err(Error::new(ErrorKind::Configuration(format!(
                "Mapped statement `{}` is already registered",
                statement.id
            ))));
        }
        self.mapped_statements
            .insert(statement.id.clone(), Arc::new(statement));
        Ok(self)
    }
    pub fn mapped_statement(&self, id: &str) -> Result<&Arc<MappedStatement>> {
        self.mapped_statements.get(id).ok_or_else(|| {
            Error::new(ErrorKind::Configuration(format!(
                "Mapped statement `{id}` is not registered"
            )))
        })
    }

    /// Statement handler for one execution, wrapped by the interceptors.
    pub fn new_statement_handler(
        self: &Arc<Self>,
        statement: &MappedStatement,
        parameter: &dyn Parameter,
        row_bounds: RowBounds,
        cache: AutoMappingCache,
    ) -> Result<Box<dyn StatementHandler>> {
        let handler = route_statement_handler(self, statement, parameter, row_bounds, cache)?;
        Ok(self.interceptors.wrap_statement_handler(handler))
    }

    pub fn new_parameter_binder(self: &Arc<Self>) -> Box<dyn ParameterBinder> {
        self.interceptors
            .wrap_parameter_binder(Box::new(DefaultParameterBinder::new(self.clone())))
    }

    pub fn new_result_mapper(
        self: &Arc<Self>,
        statement: &MappedStatement,
        cache: AutoMappingCache,
    ) -> Box<dyn ResultMapper> {
        self.interceptors.wrap_result_mapper(Box::new(DefaultResultMapper::new(
            self.clone(),
            statement.clone(),
            cache,
        )))
    }
}
