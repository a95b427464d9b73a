//! Persistence seam: the per-model operations the API relies on, with PostgreSQL and
//! in-memory implementations.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::DatabaseOptions;
use crate::error::StoreError;
use crate::models::{FieldKind, FieldValue, ModelDef, Record, Resource, Scope, CREATED_AT, MODELS, UPDATED_AT};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use std::marker::PhantomData;
use std::sync::Arc;

#[async_trait]
pub trait Persistence: Send + Sync {
    /// Create the table for `model` if it does not exist.
    async fn sync_table(&self, model: &'static ModelDef) -> Result<(), StoreError>;

    async fn drop_table(&self, model: &'static ModelDef, cascade: bool) -> Result<(), StoreError>;

    /// Insert one record. Returns the stored record with every attribute.
    async fn create(&self, model: &'static ModelDef, values: Record) -> Result<Record, StoreError>;

    /// Records matching every `(attribute, value)` filter, in creation order.
    async fn find_all(
        &self,
        model: &'static ModelDef,
        filters: &[(String, Value)],
        scope: Scope,
    ) -> Result<Vec<Record>, StoreError>;

    async fn find_by_pk(
        &self,
        model: &'static ModelDef,
        id: &str,
        scope: Scope,
    ) -> Result<Option<Record>, StoreError>;

    /// Apply `patch` to the record with primary key `id`. Returns the updated record, or None.
    async fn update(
        &self,
        model: &'static ModelDef,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, StoreError>;

    /// Delete by primary key. Returns the removed record, or None.
    async fn destroy(&self, model: &'static ModelDef, id: &str) -> Result<Option<Record>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn close(&self);
}

/// Check `values` against the model and return them normalized, keyed by attribute.
fn check_values(model: &'static ModelDef, mut values: Record) -> Result<Record, StoreError> {
    if let Some(hook) = model.before_save {
        hook(&mut values)?;
    }
    let mut checked = Record::new();
    for (name, value) in values {
        let field = model.field(&name).ok_or_else(|| StoreError::UnknownAttribute {
            model: model.name,
            field: name.clone(),
        })?;
        checked.insert(name, FieldValue::parse(model, field, &value)?.to_json());
    }
    Ok(checked)
}

/// Values for an insert: generated primary key, timestamps, nulls for omitted attributes.
pub(crate) fn prepare_insert(model: &'static ModelDef, values: Record) -> Result<Record, StoreError> {
    let mut values = values;
    let pk = model.primary_key;
    if values.get(pk).map_or(true, Value::is_null) {
        if let Some(field) = model.field(pk) {
            if field.kind == FieldKind::Uuid {
                values.insert(pk.into(), Value::String(uuid::Uuid::now_v7().to_string()));
            }
        }
    }
    if model.timestamps {
        let now = Value::String(Utc::now().to_rfc3339());
        values.insert(CREATED_AT.into(), now.clone());
        values.insert(UPDATED_AT.into(), now);
    }
    let provided = check_values(model, values)?;

    let mut record = Record::new();
    for field in model.fields {
        let value = provided.get(field.name).cloned().unwrap_or(Value::Null);
        if value.is_null() && !field.nullable {
            return Err(StoreError::InvalidValue {
                model: model.name,
                field: field.name.to_string(),
                reason: "must not be null".into(),
            });
        }
        record.insert(field.name.to_string(), value);
    }
    Ok(record)
}

/// Values for an update: the primary key is never changed and updatedAt is refreshed.
pub(crate) fn prepare_update(model: &'static ModelDef, patch: Record) -> Result<Record, StoreError> {
    let mut patch = patch;
    patch.remove(model.primary_key);
    patch.remove(CREATED_AT);
    if model.timestamps {
        patch.insert(UPDATED_AT.into(), Value::String(Utc::now().to_rfc3339()));
    }
    check_values(model, patch)
}

/// Normalize a primary key given as a string.
pub(crate) fn parse_pk(model: &'static ModelDef, id: &str) -> Result<Value, StoreError> {
    let field = model.field(model.primary_key).ok_or_else(|| StoreError::UnknownAttribute {
        model: model.name,
        field: model.primary_key.to_string(),
    })?;
    Ok(FieldValue::parse(model, field, &Value::String(id.to_string()))?.to_json())
}

/// Handle to a connected store, shared by resolvers, handlers and tests.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn Persistence>,
}

impl Database {
    pub fn new(store: impl Persistence + 'static) -> Self {
        Database {
            store: Arc::new(store),
        }
    }

    pub fn memory(options: &DatabaseOptions) -> Self {
        Self::new(MemoryStore::new(options.clone()))
    }

    pub fn postgres(pool: PgPool, options: &DatabaseOptions) -> Self {
        Self::new(PgStore::new(pool, options.clone()))
    }

    pub fn model(&self, model: &'static ModelDef) -> ModelHandle {
        ModelHandle {
            model,
            store: self.store.clone(),
        }
    }

    pub fn repo<T: Resource>(&self) -> Repository<T> {
        Repository {
            handle: self.model(T::model()),
            _marker: PhantomData,
        }
    }

    /// Create every table. With `force`, existing tables are dropped first.
    pub async fn sync(&self, force: bool) -> Result<(), StoreError> {
        if force {
            for model in MODELS.iter().rev() {
                self.store.drop_table(*model, true).await?;
            }
        }
        for model in MODELS.iter() {
            self.store.sync_table(*model).await?;
        }
        tracing::debug!(force, "database synced");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

/// Untyped operations on one model.
#[derive(Clone)]
pub struct ModelHandle {
    model: &'static ModelDef,
    store: Arc<dyn Persistence>,
}

impl ModelHandle {
    pub fn def(&self) -> &'static ModelDef {
        self.model
    }

    pub async fn sync(&self) -> Result<(), StoreError> {
        self.store.sync_table(self.model).await
    }

    pub async fn drop_table(&self, cascade: bool) -> Result<(), StoreError> {
        self.store.drop_table(self.model, cascade).await
    }

    pub async fn create(&self, values: Record) -> Result<Record, StoreError> {
        self.store.create(self.model, values).await
    }

    pub async fn find_all(
        &self,
        filters: &[(String, Value)],
        scope: Scope,
    ) -> Result<Vec<Record>, StoreError> {
        self.store.find_all(self.model, filters, scope).await
    }

    pub async fn find_by_pk(&self, id: &str, scope: Scope) -> Result<Option<Record>, StoreError> {
        self.store.find_by_pk(self.model, id, scope).await
    }

    pub async fn update(&self, id: &str, patch: Record) -> Result<Option<Record>, StoreError> {
        self.store.update(self.model, id, patch).await
    }

    pub async fn destroy(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.store.destroy(self.model, id).await
    }
}

/// Typed operations on the model behind `T`.
pub struct Repository<T> {
    handle: ModelHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> Repository<T> {
    pub async fn find_all(&self, scope: Scope) -> Result<Vec<T>, StoreError> {
        let rows = self.handle.find_all(&[], scope).await?;
        rows.into_iter().map(T::from_record).collect()
    }

    pub async fn find_where(&self, attribute: &str, value: Value, scope: Scope) -> Result<Vec<T>, StoreError> {
        let rows = self
            .handle
            .find_all(&[(attribute.to_string(), value)], scope)
            .await?;
        rows.into_iter().map(T::from_record).collect()
    }

    pub async fn find_by_pk(&self, id: &str, scope: Scope) -> Result<Option<T>, StoreError> {
        self.handle.find_by_pk(id, scope).await?.map(T::from_record).transpose()
    }

    pub async fn create(&self, values: Record) -> Result<T, StoreError> {
        T::from_record(self.handle.create(values).await?)
    }

    pub async fn update(&self, id: &str, patch: Record) -> Result<Option<T>, StoreError> {
        self.handle.update(id, patch).await?.map(T::from_record).transpose()
    }

    pub async fn destroy(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.handle.destroy(id).await?.map(T::from_record).transpose()
    }
}
