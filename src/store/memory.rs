//! In-process store: each table is an ordered list of records behind an async lock.

use super::{parse_pk, prepare_insert, prepare_update, Persistence};
use crate::config::DatabaseOptions;
use crate::error::StoreError;
use crate::models::{FieldValue, ModelDef, Record, Scope, MODELS};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

pub struct MemoryStore {
    options: DatabaseOptions,
    tables: RwLock<Tables>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new(options: DatabaseOptions) -> Self {
        MemoryStore {
            options,
            tables: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn project(&self, model: &'static ModelDef, record: &Record, scope: Scope) -> Record {
        model
            .visible_fields(scope, &self.options.define)
            .into_iter()
            .map(|f| {
                let value = record.get(f.name).cloned().unwrap_or(Value::Null);
                (f.name.to_string(), value)
            })
            .collect()
    }
}

fn missing(model: &ModelDef) -> StoreError {
    StoreError::MissingTable(model.table.to_string())
}

/// Reject `candidate` if a primary key or unique attribute clashes with another row.
fn check_unique(
    model: &ModelDef,
    rows: &[Record],
    candidate: &Record,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    for field in model.fields.iter().filter(|f| f.unique || f.primary_key) {
        let Some(value) = candidate.get(field.name).filter(|v| !v.is_null()) else {
            continue;
        };
        let clash = rows
            .iter()
            .enumerate()
            .any(|(i, row)| Some(i) != skip && row.get(field.name) == Some(value));
        if clash {
            return Err(StoreError::UniqueViolation {
                table: model.table.to_string(),
                field: field.name.to_string(),
            });
        }
    }
    Ok(())
}

type Tables = HashMap<&'static str, Vec<Record>>;

/// Reject reference attributes in `values` that point at no existing row.
/// A reference into a table that is not synced carries no constraint.
fn check_references(model: &ModelDef, tables: &Tables, values: &Record) -> Result<(), StoreError> {
    for field in model.fields {
        let Some(reference) = field.references else {
            continue;
        };
        let Some(value) = values.get(field.name).filter(|v| !v.is_null()) else {
            continue;
        };
        let Some(target) = tables.get(reference.table) else {
            continue;
        };
        if !target.iter().any(|row| row.get(reference.field) == Some(value)) {
            return Err(StoreError::ForeignKeyViolation {
                table: model.table.to_string(),
                field: field.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Remove every row that references `removed`, following references transitively.
fn cascade_delete(tables: &mut Tables, model: &'static ModelDef, removed: Record) {
    let mut pending = vec![(model, removed)];
    while let Some((parent, row)) = pending.pop() {
        for child in MODELS.iter().copied() {
            for field in child.fields {
                let Some(reference) = field.references.filter(|r| r.table == parent.table) else {
                    continue;
                };
                let Some(key) = row.get(reference.field).filter(|v| !v.is_null()) else {
                    continue;
                };
                let Some(rows) = tables.get_mut(child.table) else {
                    continue;
                };
                let (gone, kept): (Vec<Record>, Vec<Record>) = std::mem::take(rows)
                    .into_iter()
                    .partition(|r| r.get(field.name) == Some(key));
                *rows = kept;
                pending.extend(gone.into_iter().map(|r| (child, r)));
            }
        }
    }
}

fn position(model: &ModelDef, rows: &[Record], id: &Value) -> Option<usize> {
    rows.iter().position(|row| row.get(model.primary_key) == Some(id))
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn sync_table(&self, model: &'static ModelDef) -> Result<(), StoreError> {
        self.check_open()?;
        self.tables.write().await.entry(model.table).or_default();
        Ok(())
    }

    async fn drop_table(&self, model: &'static ModelDef, _cascade: bool) -> Result<(), StoreError> {
        self.check_open()?;
        self.tables.write().await.remove(model.table);
        Ok(())
    }

    async fn create(&self, model: &'static ModelDef, values: Record) -> Result<Record, StoreError> {
        self.check_open()?;
        let record = prepare_insert(model, values)?;
        let mut tables = self.tables.write().await;
        check_references(model, &tables, &record)?;
        let rows = tables.get_mut(model.table).ok_or_else(|| missing(model))?;
        check_unique(model, rows, &record, None)?;
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_all(
        &self,
        model: &'static ModelDef,
        filters: &[(String, Value)],
        scope: Scope,
    ) -> Result<Vec<Record>, StoreError> {
        self.check_open()?;
        let mut wanted = Vec::with_capacity(filters.len());
        for (name, value) in filters {
            let field = model.field(name).ok_or_else(|| StoreError::UnknownAttribute {
                model: model.name,
                field: name.clone(),
            })?;
            wanted.push((field.name, FieldValue::parse(model, field, value)?.to_json()));
        }
        let tables = self.tables.read().await;
        let rows = tables.get(model.table).ok_or_else(|| missing(model))?;
        Ok(rows
            .iter()
            .filter(|row| wanted.iter().all(|(name, value)| row.get(*name) == Some(value)))
            .map(|row| self.project(model, row, scope))
            .collect())
    }

    async fn find_by_pk(
        &self,
        model: &'static ModelDef,
        id: &str,
        scope: Scope,
    ) -> Result<Option<Record>, StoreError> {
        self.check_open()?;
        let id = parse_pk(model, id)?;
        let tables = self.tables.read().await;
        let rows = tables.get(model.table).ok_or_else(|| missing(model))?;
        Ok(position(model, rows, &id).map(|i| self.project(model, &rows[i], scope)))
    }

    async fn update(
        &self,
        model: &'static ModelDef,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, StoreError> {
        self.check_open()?;
        let id = parse_pk(model, id)?;
        let patch = prepare_update(model, patch)?;
        let mut tables = self.tables.write().await;
        check_references(model, &tables, &patch)?;
        let rows = tables.get_mut(model.table).ok_or_else(|| missing(model))?;
        let Some(index) = position(model, rows, &id) else {
            return Ok(None);
        };
        let mut updated = rows[index].clone();
        for (name, value) in patch {
            updated.insert(name, value);
        }
        check_unique(model, rows, &updated, Some(index))?;
        rows[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn destroy(&self, model: &'static ModelDef, id: &str) -> Result<Option<Record>, StoreError> {
        self.check_open()?;
        let id = parse_pk(model, id)?;
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(model.table).ok_or_else(|| missing(model))?;
        let Some(index) = position(model, rows, &id) else {
            return Ok(None);
        };
        let removed = rows.remove(index);
        cascade_delete(&mut tables, model, removed.clone());
        Ok(Some(removed))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_open()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.tables.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::config::resolve;
    use crate::error::StoreError;
    use crate::models::{Record, Scope, Todo, User, TODO, USER};
    use crate::store::Database;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn database() -> Database {
        let config = resolve(|key| (key == "NODE_ENV").then(|| "test".to_string())).unwrap();
        let db = Database::memory(&config.database_options);
        db.sync(true).await.unwrap();
        db
    }

    #[tokio::test]
    async fn create_generates_id_and_timestamps() {
        let db = database().await;
        let created = db
            .model(&TODO)
            .create(record(json!({"title": "a", "description": "b", "completed": false})))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert!(created["createdAt"].is_string());
        assert_eq!(created["userId"], Value::Null);

        let scoped = db.model(&TODO).find_by_pk(id, Scope::Default).await.unwrap().unwrap();
        assert!(scoped.get("createdAt").is_none());
        let unscoped = db.model(&TODO).find_by_pk(id, Scope::Unscoped).await.unwrap().unwrap();
        assert!(unscoped["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn ids_are_time_ordered() {
        let db = database().await;
        let todos = db.model(&TODO);
        for title in ["first", "second", "third"] {
            todos.create(record(json!({"title": title}))).await.unwrap();
        }
        let all = db.repo::<Todo>().find_all(Scope::Default).await.unwrap();
        let titles: Vec<_> = all.iter().filter_map(|t| t.title.as_deref()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn unique_fields_are_enforced() {
        let db = database().await;
        let users = db.model(&USER);
        users
            .create(record(json!({"username": "stu1", "passwordHash": "123"})))
            .await
            .unwrap();
        let err = users
            .create(record(json!({"username": "stu1", "passwordHash": "456"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn unknown_attributes_and_bad_values_are_rejected() {
        let db = database().await;
        let todos = db.model(&TODO);
        let err = todos.create(record(json!({"priority": 1}))).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownAttribute { .. }));
        let err = todos.create(record(json!({"completed": "yes"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
        let err = db
            .model(&USER)
            .create(record(json!({"username": "nopass"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn update_keeps_primary_key() {
        let db = database().await;
        let todo = db
            .repo::<Todo>()
            .create(record(json!({"title": "a"})))
            .await
            .unwrap();
        let id = todo.id.to_string();
        let updated = db
            .repo::<Todo>()
            .update(&id, record(json!({"id": uuid::Uuid::now_v7().to_string(), "title": "c"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, todo.id);
        assert_eq!(updated.title.as_deref(), Some("c"));
        assert!(updated.updated_at >= todo.updated_at);
    }

    #[tokio::test]
    async fn destroy_returns_removed_record() {
        let db = database().await;
        let user = db
            .repo::<User>()
            .create(record(json!({"username": "ada", "password": "pw"})))
            .await
            .unwrap();
        let id = user.id.to_string();
        let removed = db.repo::<User>().destroy(&id).await.unwrap().unwrap();
        assert_eq!(removed.username, "ada");
        assert!(db.repo::<User>().find_by_pk(&id, Scope::Default).await.unwrap().is_none());
        assert!(db.repo::<User>().destroy(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_match_attributes() {
        let db = database().await;
        let owner = db
            .repo::<User>()
            .create(record(json!({"username": "owner", "passwordHash": "x"})))
            .await
            .unwrap();
        let todos = db.model(&TODO);
        todos
            .create(record(json!({"title": "mine", "userId": owner.id.to_string()})))
            .await
            .unwrap();
        todos.create(record(json!({"title": "orphan"}))).await.unwrap();
        let mine = db
            .repo::<Todo>()
            .find_where("userId", json!(owner.id.to_string()), Scope::Default)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title.as_deref(), Some("mine"));
    }

    #[tokio::test]
    async fn references_must_point_at_existing_rows() {
        let db = database().await;
        let todos = db.model(&TODO);
        let stranger = uuid::Uuid::now_v7().to_string();
        let err = todos
            .create(record(json!({"title": "lost", "userId": stranger})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { ref field, .. } if field == "userId"));
        assert!(todos.find_all(&[], Scope::Default).await.unwrap().is_empty());

        let todo = todos.create(record(json!({"title": "kept"}))).await.unwrap();
        let id = todo["id"].as_str().unwrap();
        let err = todos
            .update(id, record(json!({"userId": stranger})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
        let unchanged = todos.find_by_pk(id, Scope::Default).await.unwrap().unwrap();
        assert_eq!(unchanged["userId"], Value::Null);
    }

    #[tokio::test]
    async fn removing_an_owner_removes_their_todos() {
        let db = database().await;
        let users = db.repo::<User>();
        let owner = users
            .create(record(json!({"username": "owner", "passwordHash": "x"})))
            .await
            .unwrap();
        let other = users
            .create(record(json!({"username": "other", "passwordHash": "y"})))
            .await
            .unwrap();
        let todos = db.model(&TODO);
        for (title, user) in [("a", &owner), ("b", &owner), ("c", &other)] {
            todos
                .create(record(json!({"title": title, "userId": user.id.to_string()})))
                .await
                .unwrap();
        }
        todos.create(record(json!({"title": "orphan"}))).await.unwrap();

        users.destroy(&owner.id.to_string()).await.unwrap().unwrap();
        let left = db.repo::<Todo>().find_all(Scope::Default).await.unwrap();
        let titles: Vec<_> = left.iter().filter_map(|t| t.title.as_deref()).collect();
        assert_eq!(titles, ["c", "orphan"]);
    }

    #[tokio::test]
    async fn dropped_table_must_be_synced_again() {
        let db = database().await;
        let todos = db.model(&TODO);
        todos.drop_table(true).await.unwrap();
        let err = todos.find_all(&[], Scope::Default).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(_)));
        todos.sync().await.unwrap();
        assert!(todos.find_all(&[], Scope::Default).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_rejects_operations() {
        let db = database().await;
        db.close().await;
        assert!(matches!(db.ping().await, Err(StoreError::Closed)));
    }
}
