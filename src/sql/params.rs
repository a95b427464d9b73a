//! Bind typed field values and decode rows back into records.

use crate::error::StoreError;
use crate::models::{FieldDef, FieldKind, FieldValue, Record};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::Row;

/// Bind one value with the PostgreSQL type of its field kind.
pub fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Uuid(v) => query.bind(v),
        FieldValue::Text(v) => query.bind(v),
        FieldValue::Bool(v) => query.bind(v),
        FieldValue::Timestamp(v) => query.bind(v),
    }
}

/// Decode a row selected with `fields` (in order) into a record keyed by attribute.
pub fn row_to_record(row: &PgRow, fields: &[&'static FieldDef]) -> Result<Record, StoreError> {
    let mut record = Record::new();
    for (i, field) in fields.iter().enumerate() {
        let value = match field.kind {
            FieldKind::Uuid => row
                .try_get::<Option<uuid::Uuid>, _>(i)?
                .map(|u| Value::String(u.to_string())),
            FieldKind::Text => row.try_get::<Option<String>, _>(i)?.map(Value::String),
            FieldKind::Bool => row.try_get::<Option<bool>, _>(i)?.map(Value::Bool),
            FieldKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(i)?
                .map(|t| Value::String(t.to_rfc3339())),
        };
        record.insert(field.name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(record)
}
