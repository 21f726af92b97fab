use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use sqlx::types::Json;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    U64(u64),
    DateTime(DateTime<Utc>),
    StringList(Vec<String>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        SqlValue::StringList(v)
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Collects `column = ?` assignments for a single-row UPDATE.
#[derive(Debug, Default)]
pub struct UpdateSet {
    assignments: Vec<(&'static str, SqlValue)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the assignment only when a value is present.
    pub fn set<T: Into<SqlValue>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.assignments.push((column, v.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Column names come from `&'static str` call sites, never from request input.
pub fn build_update_sql(table: &str, set: UpdateSet, id_column: &str, id_value: u64) -> Option<SqlUpdate> {
    if set.is_empty() {
        return None;
    }

    let set_clause = set
        .assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = set.assignments.into_iter().map(|(_, v)| v).collect();
    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::StringList(v) => query.bind(Json(v)),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}
