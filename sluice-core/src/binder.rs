use crate::{
    BoundSql, Classify, Configuration, ErrorKind, Parameter, Result, Statement, Value,
};
use std::sync::Arc;

/// Issues the bind calls of a statement from its parameter object.
pub trait ParameterBinder: Send + Sync {
    fn bind(
        &self,
        statement: &mut dyn Statement,
        bound_sql: &BoundSql,
        parameter: &dyn Parameter,
    ) -> Result<()>;
}

pub struct DefaultParameterBinder {
    configuration: Arc<Configuration>,
}

impl DefaultParameterBinder {
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    fn resolve(&self, property: &str, bound_sql: &BoundSql, parameter: &dyn Parameter) -> Result<Value> {
        if let Some(value) = bound_sql.additional_parameters.get(property) {
            return Ok(value.clone());
        }
        if let Some(value) = parameter.scalar() {
            return Ok(value);
        }
        parameter.property(property)
    }
}

impl ParameterBinder for DefaultParameterBinder {
    fn bind(
        &self,
        statement: &mut dyn Statement,
        bound_sql: &BoundSql,
        parameter: &dyn Parameter,
    ) -> Result<()> {
        let mappings = &bound_sql.parameter_mappings;
        if let Some(count) = statement.parameter_count()
            && count != mappings.len()
        {
            return Err(crate::Error::new(ErrorKind::Binding(format!(
                "The statement has {} placeholders but {} parameters are declared: {}",
                count,
                mappings.len(),
                bound_sql
            ))));
        }
        let registry = self.configuration.type_registry();
        for (index, mapping) in mappings.iter().enumerate() {
            let context = || {
                ErrorKind::Binding(format!(
                    "Could not set parameter #{} `{}` of `{}`",
                    index,
                    mapping.property,
                    parameter.type_name()
                ))
            };
            let value = self
                .resolve(&mapping.property, bound_sql, parameter)
                .map_err(|e| e.context(context()))?;
            if value.is_null() {
                let data_type = mapping
                    .data_type
                    .or(Some(value.data_type()).filter(|v| !matches!(v, crate::DataType::Null)))
                    .unwrap_or(self.configuration.data_type_for_null);
                statement.bind_null(index, data_type).classify(context)?;
            } else {
                let value = registry
                    .encode(value, mapping.data_type)
                    .map_err(|e| e.context(context()))?;
                statement.bind(index, value).classify(context)?;
            }
        }
        log::debug!("Bound {} parameters to: {}", mappings.len(), bound_sql);
        Ok(())
    }
}
