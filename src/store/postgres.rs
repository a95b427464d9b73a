//! PostgreSQL store. Every statement comes from `SqlBuilder`; values are always bound.

use super::{parse_pk, prepare_insert, prepare_update, Persistence};
use crate::case::column_name;
use crate::config::DatabaseOptions;
use crate::error::StoreError;
use crate::models::{FieldDef, FieldValue, ModelDef, Record, Scope};
use crate::sql::{bind_value, row_to_record, QueryBuf, SqlBuilder};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

pub struct PgStore {
    pool: PgPool,
    options: DatabaseOptions,
}

impl PgStore {
    pub fn new(pool: PgPool, options: DatabaseOptions) -> Self {
        PgStore { pool, options }
    }

    fn builder(&self, model: &'static ModelDef) -> SqlBuilder<'_> {
        SqlBuilder::new(model, &self.options)
    }

    async fn execute(&self, model: &'static ModelDef, sql: &str) -> Result<(), StoreError> {
        tracing::debug!(sql = %sql, "execute");
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(model, e))?;
        Ok(())
    }

    async fn fetch_optional(
        &self,
        model: &'static ModelDef,
        q: QueryBuf,
    ) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = bind_value(query, p);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_err(model, e))?;
        row.map(|r| row_to_record(&r, &q.returning)).transpose()
    }

    async fn fetch_all(&self, model: &'static ModelDef, q: QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = bind_value(query, p);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.map_err(model, e))?;
        rows.iter().map(|r| row_to_record(r, &q.returning)).collect()
    }

    /// Translate undefined-table, unique and foreign-key errors into store errors.
    fn map_err(&self, model: &'static ModelDef, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default();
            match db.code().as_deref() {
                Some("42P01") => return StoreError::MissingTable(model.table.to_string()),
                Some("23505") => {
                    return StoreError::UniqueViolation {
                        table: model.table.to_string(),
                        field: self.constrained_field(model, constraint, |f| f.unique || f.primary_key),
                    };
                }
                Some("23503") => {
                    return StoreError::ForeignKeyViolation {
                        table: model.table.to_string(),
                        field: self.constrained_field(model, constraint, |f| f.references.is_some()),
                    };
                }
                _ => {}
            }
        }
        StoreError::Db(err)
    }

    /// Attribute whose column appears in a constraint name such as `todos_userId_fkey`.
    fn constrained_field(
        &self,
        model: &'static ModelDef,
        constraint: &str,
        candidate: impl Fn(&FieldDef) -> bool,
    ) -> String {
        model
            .fields
            .iter()
            .filter(|f| candidate(f))
            .find(|f| constraint.contains(&column_name(f.name, self.options.define.underscored)))
            .map(|f| f.name.to_string())
            .unwrap_or_else(|| constraint.to_string())
    }
}

/// Pair each checked attribute with its field definition, in model field order.
fn typed_values(
    model: &'static ModelDef,
    record: &Record,
) -> Result<Vec<(&'static FieldDef, FieldValue)>, StoreError> {
    let mut out = Vec::with_capacity(record.len());
    for field in model.fields {
        if let Some(value) = record.get(field.name) {
            out.push((field, FieldValue::parse(model, field, value)?));
        }
    }
    Ok(out)
}

fn pk_value(model: &'static ModelDef, id: &str) -> Result<FieldValue, StoreError> {
    let value = parse_pk(model, id)?;
    let field = model.field(model.primary_key).ok_or_else(|| StoreError::UnknownAttribute {
        model: model.name,
        field: model.primary_key.to_string(),
    })?;
    FieldValue::parse(model, field, &value)
}

#[async_trait]
impl Persistence for PgStore {
    async fn sync_table(&self, model: &'static ModelDef) -> Result<(), StoreError> {
        let ddl = self.builder(model).create_table();
        self.execute(model, &ddl).await
    }

    async fn drop_table(&self, model: &'static ModelDef, cascade: bool) -> Result<(), StoreError> {
        let ddl = self.builder(model).drop_table(cascade);
        self.execute(model, &ddl).await
    }

    async fn create(&self, model: &'static ModelDef, values: Record) -> Result<Record, StoreError> {
        let record = prepare_insert(model, values)?;
        let q = self.builder(model).insert(typed_values(model, &record)?);
        self.fetch_optional(model, q)
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))
    }

    async fn find_all(
        &self,
        model: &'static ModelDef,
        filters: &[(String, Value)],
        scope: Scope,
    ) -> Result<Vec<Record>, StoreError> {
        let mut typed = Vec::with_capacity(filters.len());
        for (name, value) in filters {
            let field = model.field(name).ok_or_else(|| StoreError::UnknownAttribute {
                model: model.name,
                field: name.clone(),
            })?;
            typed.push((field, FieldValue::parse(model, field, value)?));
        }
        let q = self.builder(model).select_list(typed, scope);
        self.fetch_all(model, q).await
    }

    async fn find_by_pk(
        &self,
        model: &'static ModelDef,
        id: &str,
        scope: Scope,
    ) -> Result<Option<Record>, StoreError> {
        let q = self.builder(model).select_by_pk(pk_value(model, id)?, scope);
        self.fetch_optional(model, q).await
    }

    async fn update(
        &self,
        model: &'static ModelDef,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, StoreError> {
        let id_value = pk_value(model, id)?;
        let patch = prepare_update(model, patch)?;
        let values = typed_values(model, &patch)?;
        if values.is_empty() {
            return self.find_by_pk(model, id, Scope::Unscoped).await;
        }
        let q = self.builder(model).update(id_value, values);
        self.fetch_optional(model, q).await
    }

    async fn destroy(&self, model: &'static ModelDef, id: &str) -> Result<Option<Record>, StoreError> {
        let q = self.builder(model).delete(pk_value(model, id)?);
        self.fetch_optional(model, q).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
