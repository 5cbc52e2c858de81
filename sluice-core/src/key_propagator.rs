use crate::{
    Classify, ColumnRef, Configuration, Error, ErrorKind, MappedStatement, Parameter, QueryResult,
    Result, RowAccess, RowAdapter, RowsAffected, Value,
};
use std::sync::Arc;

/// Writes generated keys back into the parameter object after a modify statement.
pub trait KeyPropagator: Send + Sync {
    /// Fails when a key property cannot be written, called before the statement runs.
    fn verify(&self, statement: &MappedStatement, parameter: &dyn Parameter) -> Result<()>;
    fn propagate(
        &self,
        statement: &MappedStatement,
        results: &[QueryResult],
        parameter: &mut dyn Parameter,
    ) -> Result<()>;
}

/// Total of the update counts. Drivers that only return generated rows count one per row.
pub fn rows_affected(results: &[QueryResult]) -> RowsAffected {
    let mut result = RowsAffected::default();
    let mut reported = false;
    let mut rows = 0;
    for item in results {
        match item {
            QueryResult::Affected(v) => {
                reported = true;
                result.extend([*v]);
            }
            QueryResult::Row(..) => rows += 1,
            QueryResult::ResultSet(..) => {}
        }
    }
    if !reported {
        result.rows_affected = rows;
    }
    result
}

pub struct GeneratedKeyPropagator {
    configuration: Arc<Configuration>,
}

impl GeneratedKeyPropagator {
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }
}

impl KeyPropagator for GeneratedKeyPropagator {
    fn verify(&self, statement: &MappedStatement, parameter: &dyn Parameter) -> Result<()> {
        for property in &statement.key_properties {
            if parameter.setter_type(property).is_none() {
                return Err(Error::new(ErrorKind::Configuration(format!(
                    "No setter found for the key property `{}` in `{}`",
                    property,
                    parameter.type_name()
                ))));
            }
        }
        Ok(())
    }

    fn propagate(
        &self,
        statement: &MappedStatement,
        results: &[QueryResult],
        parameter: &mut dyn Parameter,
    ) -> Result<()> {
        if statement.key_properties.is_empty() {
            return Ok(());
        }
        self.verify(statement, &*parameter)?;
        let affected = rows_affected(results);
        if affected.rows_affected == 0 {
            return Ok(());
        }
        let mut metadata = None;
        let mut first = None;
        for item in results {
            match item {
                QueryResult::ResultSet(v) => metadata = Some(v.clone()),
                QueryResult::Row(row) => {
                    first = Some(row);
                    break;
                }
                QueryResult::Affected(..) => {}
            }
        }
        let Some(row) = first else {
            // Backends without RETURNING support only report the last inserted id
            if let [property] = statement.key_properties.as_slice()
                && let Some(id) = affected.last_affected_id
                && let Some(data_type) = parameter.setter_type(property)
            {
                let value = Value::Int64(Some(id))
                    .convert(data_type)
                    .classify(|| ErrorKind::Mapping(format!(
                        "Cannot convert the generated key {id} for `{property}`"
                    )))?;
                parameter.set_property(property, value)?;
            }
            return Ok(());
        };
        let metadata = metadata.unwrap_or_else(|| row.metadata());
        let registry = self.configuration.type_registry();
        let mut adapter = RowAdapter::new(row, &metadata, registry);
        for (index, property) in statement.key_properties.iter().enumerate() {
            let data_type = parameter.setter_type(property).ok_or_else(|| {
                Error::new(ErrorKind::Configuration(format!(
                    "No setter found for the key property `{}` in `{}`",
                    property,
                    parameter.type_name()
                )))
            })?;
            let column = statement.key_column(index).unwrap_or(property.as_str());
            let column = if adapter.find_column(ColumnRef::Name(column)).is_some() {
                ColumnRef::Name(column)
            } else {
                ColumnRef::Index(index)
            };
            let value = registry.extract(&mut adapter, column, data_type)?;
            parameter
                .set_property(property, value)
                .classify(|| ErrorKind::Mapping(format!(
                    "Error setting the generated key `{}` of `{}`",
                    property,
                    parameter.type_name()
                )))?;
        }
        Ok(())
    }
}
