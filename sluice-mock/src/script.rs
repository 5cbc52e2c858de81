use sluice_core::{
    ColumnMetadata, DataType, QueryResult, RowLabeled, RowNames, RowsAffected, Value,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) enum ScriptItem {
    Result(QueryResult),
    Error(String),
}

/// Canned response of one executed statement.
///
/// ```ignore
/// let script = Script::new()
///     .result_set([("id", DataType::Int64), ("name", DataType::Varchar)])
///     .row([1i64.as_value(), Value::from("a")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub(crate) items: Vec<ScriptItem>,
    labels: Option<RowNames>,
}

impl Script {
    pub fn new() -> Self {
        Default::default()
    }

    /// Announce a new result set with its columns, the following rows belong to it.
    pub fn result_set<'a>(mut self, columns: impl IntoIterator<Item = (&'a str, DataType)>) -> Self {
        let metadata = columns
            .into_iter()
            .map(|(name, data_type)| ColumnMetadata::new(name, data_type))
            .collect::<Arc<[_]>>();
        self.labels = Some(metadata.iter().map(|c| c.name.clone()).collect());
        self.items.push(ScriptItem::Result(QueryResult::ResultSet(metadata)));
        self
    }

    /// Row of the current result set.
    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        let labels = self.labels.clone().unwrap_or_else(|| Arc::new([]));
        self.items.push(ScriptItem::Result(QueryResult::Row(RowLabeled::new(
            labels,
            values.into_iter().collect(),
        ))));
        self
    }

    /// Row carrying its own labels, without a result set announcement.
    pub fn labeled_row<'a>(
        mut self,
        labels: impl IntoIterator<Item = &'a str>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.items.push(ScriptItem::Result(QueryResult::Row(RowLabeled::new(
            labels.into_iter().map(ToString::to_string).collect(),
            values.into_iter().collect(),
        ))));
        self
    }

    pub fn affected(self, rows_affected: u64) -> Self {
        self.affected_with_id(rows_affected, None)
    }

    pub fn affected_with_id(mut self, rows_affected: u64, last_affected_id: Option<i64>) -> Self {
        self.items
            .push(ScriptItem::Result(QueryResult::Affected(RowsAffected {
                rows_affected,
                last_affected_id,
            })));
        self
    }

    /// Fail the execution at this point.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.items.push(ScriptItem::Error(message.into()));
        self
    }
}
