use crate::{
    Classify, ColumnRef, Configuration, ConstructorDef, DataType, Error, ErrorKind, FieldValue,
    MappedStatement, Object, PropertyDef, PropertyKind, QueryResult, Result, ResultMap,
    ResultMapping, ResultType, RowAccess, RowAdapter, RowBounds, RowLabeled, RowMetadata,
    TypeHandler,
    stream::{BoxStream, StreamExt},
};
use anyhow::Context;
use async_stream::try_stream;
use convert_case::{Case, Casing};
use std::{
    any::Any,
    collections::HashMap,
    fmt::{self, Debug},
    mem,
    sync::{Arc, Mutex, PoisonError},
};

/// One element produced by a query.
///
/// The first result set streams its rows one by one, every following result set arrives
/// collected, once it is complete.
pub enum ResultItem {
    Row(Box<dyn Any + Send>),
    ResultSet {
        index: usize,
        rows: Vec<Box<dyn Any + Send>>,
    },
}

impl ResultItem {
    /// Downcast a row of the first result set.
    pub fn into_row<T: Any>(self) -> Result<T> {
        match self {
            ResultItem::Row(v) => downcast(v),
            ResultItem::ResultSet { index, .. } => Err(Error::new(ErrorKind::Mapping(format!(
                "Expected a row but found the collected result set #{index}"
            )))),
        }
    }
    /// Downcast the rows of a collected result set.
    pub fn into_rows<T: Any>(self) -> Result<Vec<T>> {
        match self {
            ResultItem::Row(v) => Ok(vec![downcast(v)?]),
            ResultItem::ResultSet { rows, .. } => rows.into_iter().map(downcast).collect(),
        }
    }
}

fn downcast<T: Any>(value: Box<dyn Any + Send>) -> Result<T> {
    value.downcast::<T>().map(|v| *v).map_err(|_| {
        Error::new(ErrorKind::Mapping(format!(
            "The mapped row is not a `{}`",
            std::any::type_name::<T>()
        )))
    })
}

impl Debug for ResultItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultItem::Row(..) => f.write_str("Row(..)"),
            ResultItem::ResultSet { index, rows } => f
                .debug_struct("ResultSet")
                .field("index", index)
                .field("rows", &rows.len())
                .finish(),
        }
    }
}

/// Turns the driver results into mapped objects.
pub trait ResultMapper: Send {
    fn handle_result_sets(
        self: Box<Self>,
        results: BoxStream<'static, Result<QueryResult>>,
        row_bounds: RowBounds,
    ) -> BoxStream<'static, Result<ResultItem>>;
}

/// Column to property assignment discovered by auto mapping.
#[derive(Debug, Clone)]
pub struct AutoMapping {
    pub column: usize,
    pub property: &'static str,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Auto mappings already discovered, by result map, column prefix and column layout.
///
/// Owned by the executor and cleared with its local cache.
#[derive(Debug, Clone, Default)]
pub struct AutoMappingCache(Arc<Mutex<HashMap<String, Arc<[AutoMapping]>>>>);

impl AutoMappingCache {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
    fn get(&self, key: &str) -> Option<Arc<[AutoMapping]>> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
    fn insert(&self, key: String, value: Arc<[AutoMapping]>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }
}

enum RowValue {
    Scalar(Box<dyn Any + Send>),
    Object(Box<dyn Object>),
}

impl RowValue {
    fn into_any(self) -> Box<dyn Any + Send> {
        match self {
            RowValue::Scalar(v) => v,
            RowValue::Object(v) => v.into_any(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Admit {
    Skip,
    Map,
    Full,
}

/// Row bounds applied to one result set.
struct Window {
    skip: usize,
    remaining: usize,
}

impl Window {
    fn new(bounds: RowBounds) -> Self {
        Self {
            skip: bounds.offset,
            remaining: bounds.limit,
        }
    }
    fn admit(&mut self) -> Admit {
        if self.skip > 0 {
            self.skip -= 1;
            Admit::Skip
        } else if self.remaining == 0 {
            Admit::Full
        } else {
            Admit::Map
        }
    }
    fn produced(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

const MAX_NESTING: usize = 32;

/// Maps rows through the result maps of the statement, one map per result set.
pub struct DefaultResultMapper {
    configuration: Arc<Configuration>,
    statement: MappedStatement,
    cache: AutoMappingCache,
}

impl DefaultResultMapper {
    pub fn new(
        configuration: Arc<Configuration>,
        statement: MappedStatement,
        cache: AutoMappingCache,
    ) -> Self {
        Self {
            configuration,
            statement,
            cache,
        }
    }

    fn validate(&self) -> Result<()> {
        for map in &self.statement.result_maps {
            self.validate_map(map, 0)?;
        }
        Ok(())
    }

    fn validate_map(&self, map: &ResultMap, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(Error::new(ErrorKind::Configuration(format!(
                "Result map `{}` nests deeper than {} levels",
                map.id, MAX_NESTING
            ))));
        }
        let object = map.result_type.data_type().is_none();
        for mapping in &map.property_mappings {
            if object && map.result_type.property(&mapping.property).is_none() {
                return Err(Error::new(ErrorKind::Configuration(format!(
                    "Result map `{}` maps the property `{}` that `{}` does not have",
                    map.id,
                    mapping.property,
                    map.result_type.name()
                ))));
            }
        }
        for mapping in map
            .property_mappings
            .iter()
            .chain(map.constructor_mappings.iter())
        {
            if let Some(query) = &mapping.nested_query_id {
                return Err(Error::new(ErrorKind::Unsupported(format!(
                    "Nested query `{}` for `{}` in result map `{}`, nested queries are not supported",
                    query, mapping.property, map.id
                ))));
            }
            if let Some(id) = &mapping.nested_result_map_id {
                self.validate_map(self.configuration.result_map(id)?, depth + 1)?;
            }
        }
        Ok(())
    }

    fn validate_result_maps_count(&self) -> Result<()> {
        if self.statement.result_maps.is_empty() {
            return Err(Error::new(ErrorKind::Configuration(format!(
                "A query was run and no result maps were found for the mapped statement `{}`",
                self.statement.id
            ))));
        }
        Ok(())
    }

    fn map_row(
        &self,
        row: &RowLabeled,
        columns: &RowMetadata,
        index: usize,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        let map = &self.statement.result_maps[index];
        log::trace!("Mapping a row of result set #{} with `{}`", index, map.id);
        let mut adapter = RowAdapter::new(row, columns, self.configuration.type_registry());
        Ok(self
            .row_value(&mut adapter, map, "", false)?
            .map(RowValue::into_any))
    }

    fn row_value(
        &self,
        row: &mut RowAdapter<'_>,
        map: &ResultMap,
        prefix: &str,
        nested: bool,
    ) -> Result<Option<RowValue>> {
        if let Some(data_type) = map.result_type.data_type()
            && self.configuration.type_registry().has_handler(data_type)
        {
            return self.scalar_value(row, map, prefix, data_type);
        }
        let Some((mut object, mut found)) = self.create_result_object(row, map, prefix)? else {
            return Ok(None);
        };
        if self.should_apply_automatic_mappings(map, nested) {
            found = self.apply_automatic_mappings(row, map, object.as_mut(), prefix)? || found;
        }
        found = self.apply_property_mappings(row, map, object.as_mut(), prefix)? || found;
        Ok((found || self.configuration.return_instance_for_empty_row)
            .then_some(RowValue::Object(object)))
    }

    fn scalar_value(
        &self,
        row: &mut RowAdapter<'_>,
        map: &ResultMap,
        prefix: &str,
        data_type: DataType,
    ) -> Result<Option<RowValue>> {
        let mapping = map.property_mappings.first();
        let name = mapping
            .and_then(|m| m.column.as_deref())
            .map(|c| format!("{prefix}{c}"));
        let column = match &name {
            Some(name) => ColumnRef::Name(name),
            None => ColumnRef::Index(0),
        };
        let value = self.read_column(row, mapping, column, data_type)?;
        let result_type = &map.result_type;
        if value.is_null() {
            // Option results keep the NULL, the others drop the row
            return Ok(result_type.scalar_from_value(value).ok().map(RowValue::Scalar));
        }
        result_type
            .scalar_from_value(value)
            .map(|v| Some(RowValue::Scalar(v)))
            .classify(|| {
                ErrorKind::Mapping(format!(
                    "Could not convert column {} to `{}`",
                    column,
                    result_type.name()
                ))
            })
    }

    fn read_column(
        &self,
        row: &mut RowAdapter<'_>,
        mapping: Option<&ResultMapping>,
        column: ColumnRef<'_>,
        data_type: DataType,
    ) -> Result<crate::Value> {
        let handler: &Arc<dyn TypeHandler> =
            match mapping.and_then(|m| m.type_handler.as_ref()) {
                Some(handler) => handler,
                None => self
                    .configuration
                    .type_registry()
                    .handler(data_type)
                    .ok_or_else(|| {
                        Error::new(ErrorKind::Mapping(format!(
                            "No type handler registered for {data_type}"
                        )))
                    })?,
            };
        handler.get_result(row, column)
    }

    fn create_result_object(
        &self,
        row: &mut RowAdapter<'_>,
        map: &ResultMap,
        prefix: &str,
    ) -> Result<Option<(Box<dyn Object>, bool)>> {
        let result_type = &map.result_type;
        if !map.constructor_mappings.is_empty() {
            return Ok(self
                .create_parameterized_result_object(row, map, prefix)?
                .map(|v| (v, true)));
        }
        if let Some(object) = result_type.instantiate() {
            return Ok(Some((object, false)));
        }
        if self.should_apply_automatic_mappings(map, false) {
            return Ok(self
                .create_by_constructor_signature(row, result_type)?
                .map(|v| (v, true)));
        }
        Err(Error::new(ErrorKind::Mapping(format!(
            "Do not know how to create an instance of `{}`",
            result_type.name()
        ))))
    }

    fn create_parameterized_result_object(
        &self,
        row: &mut RowAdapter<'_>,
        map: &ResultMap,
        prefix: &str,
    ) -> Result<Option<Box<dyn Object>>> {
        let result_type = &map.result_type;
        let mappings = &map.constructor_mappings;
        let registry = self.configuration.type_registry();
        let column_kinds: Vec<Option<DataType>> = mappings
            .iter()
            .map(|mapping| {
                let column = format!("{prefix}{}", mapping.column.as_deref()?);
                let index = row.find_column(ColumnRef::Name(&column))?;
                Some(row.columns()[index].data_type)
            })
            .collect();
        let constructor = select_constructor(result_type, |params| {
            params.len() == mappings.len()
                && params
                    .iter()
                    .zip(mappings)
                    .zip(&column_kinds)
                    .all(|((param, mapping), column_kind)| match param {
                        PropertyKind::Object(..) => mapping.nested_result_map_id.is_some(),
                        PropertyKind::Value(data_type) => {
                            !mapping.is_nested()
                                && mapping
                                    .data_type
                                    .is_none_or(|v| data_type.is_coercible_from(v))
                                && column_kind.is_none_or(|kind| match &mapping.type_handler {
                                    Some(handler) => handler.accepts(kind),
                                    None => registry
                                        .has_coercion(mapping.data_type.unwrap_or(*data_type), kind),
                                })
                        }
                    })
        })
        .ok_or_else(|| {
            Error::new(ErrorKind::Mapping(format!(
                "No usable constructor in `{}` for the {} arguments of result map `{}`",
                result_type.name(),
                mappings.len(),
                map.id
            )))
        })?;
        let mut found = false;
        let mut args = Vec::with_capacity(mappings.len());
        for (param, mapping) in constructor.params.iter().zip(mappings) {
            let value = match (param, &mapping.nested_result_map_id) {
                (_, Some(id)) => {
                    let nested = self.configuration.result_map(id)?;
                    let prefix = combined_prefix(prefix, mapping);
                    match self.row_value(row, nested, &prefix, true)? {
                        Some(v) => FieldValue::Object(v.into_any()),
                        None => FieldValue::Value(crate::Value::Null),
                    }
                }
                (PropertyKind::Value(data_type), None) => {
                    let column = mapping.column.as_deref().unwrap_or_default();
                    let column = format!("{prefix}{column}");
                    let data_type = mapping.data_type.unwrap_or(*data_type);
                    let value =
                        self.read_column(row, Some(mapping), ColumnRef::Name(&column), data_type)?;
                    FieldValue::Value(value)
                }
                (PropertyKind::Object(..), None) => unreachable!("checked by the selection"),
            };
            found |= !value.is_null();
            args.push(value);
        }
        if !found {
            return Ok(None);
        }
        build(constructor, result_type, args).map(Some)
    }

    fn create_by_constructor_signature(
        &self,
        row: &mut RowAdapter<'_>,
        result_type: &ResultType,
    ) -> Result<Option<Box<dyn Object>>> {
        let registry = self.configuration.type_registry();
        let kinds: Vec<DataType> = row.columns().iter().map(|c| c.data_type).collect();
        let constructor = select_constructor(result_type, |params| {
            params.len() == kinds.len()
                && params.iter().zip(&kinds).all(|(param, kind)| {
                    matches!(param, PropertyKind::Value(v) if registry.has_coercion(*v, *kind))
                })
        })
        .ok_or_else(|| {
            Error::new(ErrorKind::Mapping(format!(
                "No constructor of `{}` matches the columns [{}]",
                result_type.name(),
                crate::join_display(kinds.iter(), ", ")
            )))
        })?;
        let mut found = false;
        let mut args = Vec::with_capacity(kinds.len());
        for (index, param) in constructor.params.iter().enumerate() {
            let PropertyKind::Value(data_type) = param else {
                unreachable!("checked by the selection");
            };
            let value = registry.extract(row, ColumnRef::Index(index), *data_type)?;
            found |= !value.is_null();
            args.push(FieldValue::Value(value));
        }
        if !found {
            return Ok(None);
        }
        build(constructor, result_type, args).map(Some)
    }

    fn should_apply_automatic_mappings(&self, map: &ResultMap, nested: bool) -> bool {
        use crate::AutoMappingBehavior;
        map.auto_mapping.unwrap_or_else(|| {
            let behavior = self.configuration.auto_mapping_behavior;
            if nested {
                behavior == AutoMappingBehavior::Full
            } else {
                behavior != AutoMappingBehavior::None
            }
        })
    }

    fn automatic_mappings(
        &self,
        row: &RowAdapter<'_>,
        map: &ResultMap,
        prefix: &str,
    ) -> Result<Arc<[AutoMapping]>> {
        let columns = row.columns();
        let key = format!(
            "{}:{}:{}",
            map.id,
            prefix,
            crate::join_display(columns.iter().map(|c| format!("{}/{}", c.name, c.data_type)), ",")
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let registry = self.configuration.type_registry();
        let mapped_columns = map.mapped_columns(prefix);
        let mapped_properties = map.mapped_properties();
        let upper_prefix = prefix.to_uppercase();
        let unknown = self.configuration.auto_mapping_unknown_column_behavior;
        let mut result = Vec::new();
        for (index, column) in columns.iter().enumerate() {
            let upper = column.name.to_uppercase();
            if mapped_columns.contains(&upper) {
                continue;
            }
            let name = if prefix.is_empty() {
                column.name.as_str()
            } else if upper.starts_with(&upper_prefix)
                && let Some(name) = column.name.get(prefix.len()..)
            {
                name
            } else {
                continue;
            };
            let property = find_property(
                &map.result_type,
                name,
                self.configuration.map_underscore_to_camel_case,
            );
            if property.is_some_and(|p| mapped_properties.contains(p.name)) {
                continue;
            }
            match property.map(|p| (p, p.kind)) {
                Some((property, PropertyKind::Value(data_type))) => {
                    if registry.has_coercion(data_type, column.data_type) {
                        result.push(AutoMapping {
                            column: index,
                            property: property.name,
                            data_type,
                            nullable: property.nullable,
                        });
                    } else {
                        unknown.handle(&self.statement.id, &column.name, property.name, Some(data_type))?;
                    }
                }
                Some((property, PropertyKind::Object(..))) => {
                    unknown.handle(&self.statement.id, &column.name, property.name, None)?;
                }
                None => unknown.handle(&self.statement.id, &column.name, name, None)?,
            }
        }
        let result: Arc<[AutoMapping]> = result.into();
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    fn apply_automatic_mappings(
        &self,
        row: &mut RowAdapter<'_>,
        map: &ResultMap,
        object: &mut dyn Object,
        prefix: &str,
    ) -> Result<bool> {
        let mappings = self.automatic_mappings(row, map, prefix)?;
        let registry = self.configuration.type_registry();
        let mut found = false;
        for mapping in mappings.iter() {
            let value = registry.extract(row, ColumnRef::Index(mapping.column), mapping.data_type)?;
            let is_null = value.is_null();
            found |= !is_null;
            if !is_null || (self.configuration.call_setters_on_nulls && mapping.nullable) {
                object
                    .assign(mapping.property, FieldValue::Value(value))
                    .with_context(|| {
                        format!(
                            "Error setting the property `{}` of `{}`",
                            mapping.property,
                            map.result_type.name()
                        )
                    })
                    .classify(|| ErrorKind::Mapping("Auto mapping failed".into()))?;
            }
        }
        Ok(found)
    }

    fn apply_property_mappings(
        &self,
        row: &mut RowAdapter<'_>,
        map: &ResultMap,
        object: &mut dyn Object,
        prefix: &str,
    ) -> Result<bool> {
        let result_type = &map.result_type;
        let mut found = false;
        for mapping in &map.property_mappings {
            let Some(property) = result_type.property(&mapping.property) else {
                continue;
            };
            let value = if let Some(id) = &mapping.nested_result_map_id {
                let nested = self.configuration.result_map(id)?;
                let prefix = combined_prefix(prefix, mapping);
                match self.row_value(row, nested, &prefix, true)? {
                    Some(v) => FieldValue::Object(v.into_any()),
                    None => FieldValue::Value(crate::Value::Null),
                }
            } else {
                let Some(column) = &mapping.column else {
                    continue;
                };
                let column = format!("{prefix}{column}");
                if row.find_column(ColumnRef::Name(&column)).is_none() {
                    continue;
                }
                let data_type = match (mapping.data_type, property.kind) {
                    (Some(v), _) | (None, PropertyKind::Value(v)) => v,
                    (None, PropertyKind::Object(..)) => {
                        return Err(Error::new(ErrorKind::Configuration(format!(
                            "The property `{}` of `{}` is an object, map it with a nested result map",
                            property.name,
                            result_type.name()
                        ))));
                    }
                };
                let value =
                    self.read_column(row, Some(mapping), ColumnRef::Name(&column), data_type)?;
                FieldValue::Value(value)
            };
            let is_null = value.is_null();
            found |= !is_null;
            if !is_null || (self.configuration.call_setters_on_nulls && property.nullable) {
                object
                    .assign(property.name, value)
                    .with_context(|| {
                        format!(
                            "Error setting the property `{}` of `{}`",
                            property.name,
                            result_type.name()
                        )
                    })
                    .classify(|| ErrorKind::Mapping(format!("Result map `{}`", map.id)))?;
            }
        }
        Ok(found)
    }
}

impl ResultMapper for DefaultResultMapper {
    fn handle_result_sets(
        self: Box<Self>,
        results: BoxStream<'static, Result<QueryResult>>,
        row_bounds: RowBounds,
    ) -> BoxStream<'static, Result<ResultItem>> {
        let mapper = *self;
        try_stream! {
            mapper.validate()?;
            let declared = mapper.statement.result_maps.len();
            let mut results = results;
            let mut index: Option<usize> = None;
            let mut columns: Option<RowMetadata> = None;
            let mut window = Window::new(row_bounds);
            let mut collected = Vec::new();
            while let Some(item) = results.next().await {
                match item? {
                    QueryResult::ResultSet(metadata) => {
                        if let Some(current) = index
                            && current > 0
                        {
                            yield ResultItem::ResultSet {
                                index: current,
                                rows: mem::take(&mut collected),
                            };
                        }
                        mapper.validate_result_maps_count()?;
                        let next = index.map_or(0, |v| v + 1);
                        if next >= declared {
                            index = None;
                            break;
                        }
                        index = Some(next);
                        columns = Some(metadata);
                        window = Window::new(row_bounds);
                    }
                    QueryResult::Row(row) => {
                        let current = match index {
                            Some(v) => v,
                            None => {
                                mapper.validate_result_maps_count()?;
                                index = Some(0);
                                0
                            }
                        };
                        match window.admit() {
                            Admit::Skip => continue,
                            Admit::Full if current + 1 >= declared => break,
                            Admit::Full => continue,
                            Admit::Map => {}
                        }
                        let metadata = columns.get_or_insert_with(|| row.metadata()).clone();
                        if let Some(value) = mapper.map_row(&row, &metadata, current)? {
                            window.produced();
                            if current == 0 {
                                yield ResultItem::Row(value);
                            } else {
                                collected.push(value);
                            }
                        }
                    }
                    QueryResult::Affected(..) => {}
                }
            }
            if let Some(current) = index
                && current > 0
            {
                yield ResultItem::ResultSet {
                    index: current,
                    rows: collected,
                };
            }
        }
        .boxed()
    }
}

fn combined_prefix(prefix: &str, mapping: &ResultMapping) -> String {
    format!("{}{}", prefix, mapping.column_prefix.as_deref().unwrap_or_default())
}

fn find_property(
    result_type: &ResultType,
    name: &str,
    underscore_to_camel_case: bool,
) -> Option<&'static PropertyDef> {
    let properties = result_type.properties();
    properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .or_else(|| {
            if !underscore_to_camel_case {
                return None;
            }
            let flat = name.to_case(Case::Flat);
            properties.iter().find(|p| p.name.to_case(Case::Flat) == flat)
        })
}

/// Explicitly marked constructor, else the only one, else the first usable.
fn select_constructor(
    result_type: &ResultType,
    usable: impl Fn(&[PropertyKind]) -> bool,
) -> Option<&'static ConstructorDef> {
    let constructors = result_type.constructors();
    let candidate = constructors
        .iter()
        .find(|c| c.marked)
        .or(if constructors.len() == 1 {
            constructors.first()
        } else {
            None
        });
    match candidate {
        Some(constructor) => usable(constructor.params).then_some(constructor),
        None => constructors.iter().find(|c| usable(c.params)),
    }
}

fn build(
    constructor: &ConstructorDef,
    result_type: &ResultType,
    args: Vec<FieldValue>,
) -> Result<Box<dyn Object>> {
    (constructor.build)(args).classify(|| {
        ErrorKind::Mapping(format!(
            "Error instantiating `{}` with constructor `{}`",
            result_type.name(),
            constructor.name
        ))
    })
}
