//! Resource model declarations: fields, primary keys, scopes and relationships.

mod todo;
mod user;

pub use todo::{Todo, TODO};
pub use user::{User, USER};

use crate::config::ModelDefaults;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A row as seen by the API: attribute name to JSON value.
pub type Record = Map<String, Value>;

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Every model, in dependency order (referenced tables first).
pub static MODELS: [&ModelDef; 2] = [&USER, &TODO];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Bool,
    Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub field: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    pub references: Option<Reference>,
    /// Never returned by the REST surface.
    pub sensitive: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            kind,
            primary_key: false,
            nullable: true,
            unique: false,
            references: None,
            sensitive: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn references(mut self, table: &'static str, field: &'static str) -> Self {
        self.references = Some(Reference { table, field });
        self
    }

    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Operations a model exposes over REST.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug)]
pub struct ModelDef {
    pub name: &'static str,
    pub table: &'static str,
    pub path_segment: &'static str,
    pub primary_key: &'static str,
    pub fields: &'static [FieldDef],
    /// The store maintains createdAt/updatedAt.
    pub timestamps: bool,
    /// Attribute set to the authenticated user's id when a record is created without it.
    pub owner_field: Option<&'static str>,
    pub operations: &'static [Operation],
    /// Runs on create and update values before they are checked.
    pub before_save: Option<fn(&mut Record) -> Result<(), StoreError>>,
}

impl ModelDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// Fields a read returns under `scope`. The primary key is always included.
    pub fn visible_fields(&self, scope: Scope, defaults: &ModelDefaults) -> Vec<&'static FieldDef> {
        self.fields
            .iter()
            .filter(|f| match scope {
                Scope::Unscoped => true,
                Scope::Default => f.primary_key || !defaults.excludes(f.name),
            })
            .collect()
    }

    pub fn by_path(path_segment: &str) -> Option<&'static ModelDef> {
        MODELS.iter().copied().find(|m| m.path_segment == path_segment)
    }
}

/// Read scope: the default scope hides the attributes configured in `define.defaultScope`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Default,
    Unscoped,
}

/// Typed value of one attribute, checked against its field kind.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Uuid(Option<uuid::Uuid>),
    Text(Option<String>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
}

impl FieldValue {
    pub fn parse(model: &ModelDef, field: &FieldDef, value: &Value) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidValue {
            model: model.name,
            field: field.name.to_string(),
            reason: reason.to_string(),
        };
        if value.is_null() {
            if !field.nullable {
                return Err(invalid("must not be null"));
            }
            return Ok(match field.kind {
                FieldKind::Uuid => FieldValue::Uuid(None),
                FieldKind::Text => FieldValue::Text(None),
                FieldKind::Bool => FieldValue::Bool(None),
                FieldKind::Timestamp => FieldValue::Timestamp(None),
            });
        }
        Ok(match (field.kind, value) {
            (FieldKind::Uuid, Value::String(s)) => {
                let u = uuid::Uuid::parse_str(s).map_err(|_| invalid("expected a uuid"))?;
                FieldValue::Uuid(Some(u))
            }
            (FieldKind::Text, Value::String(s)) => FieldValue::Text(Some(s.clone())),
            (FieldKind::Bool, Value::Bool(b)) => FieldValue::Bool(Some(*b)),
            (FieldKind::Timestamp, Value::String(s)) => {
                let ts = DateTime::parse_from_rfc3339(s)
                    .map_err(|_| invalid("expected an RFC 3339 timestamp"))?;
                FieldValue::Timestamp(Some(ts.with_timezone(&Utc)))
            }
            (FieldKind::Uuid, _) => return Err(invalid("expected a uuid")),
            (FieldKind::Text, _) => return Err(invalid("expected a string")),
            (FieldKind::Bool, _) => return Err(invalid("expected a boolean")),
            (FieldKind::Timestamp, _) => return Err(invalid("expected a timestamp")),
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Uuid(v) => v.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null),
            FieldValue::Text(v) => v.clone().map(Value::String).unwrap_or(Value::Null),
            FieldValue::Bool(v) => v.map(Value::Bool).unwrap_or(Value::Null),
            FieldValue::Timestamp(v) => v
                .map(|t| Value::String(t.to_rfc3339()))
                .unwrap_or(Value::Null),
        }
    }
}

/// Typed view of a model's records.
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    fn model() -> &'static ModelDef;

    fn from_record(record: Record) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ModelDefaults {
        crate::config::resolve(|_| None).unwrap().database_options.define
    }

    #[test]
    fn default_scope_hides_timestamps() {
        let names: Vec<_> = TODO
            .visible_fields(Scope::Default, &defaults())
            .iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["id", "userId", "title", "description", "completed"]);
        assert_eq!(TODO.visible_fields(Scope::Unscoped, &defaults()).len(), 7);
    }

    #[test]
    fn field_values_follow_kind() {
        let id = TODO.field("id").unwrap();
        assert!(FieldValue::parse(&TODO, id, &json!("not-a-uuid")).is_err());
        assert!(FieldValue::parse(&TODO, id, &Value::Null).is_err());

        let completed = TODO.field("completed").unwrap();
        assert_eq!(
            FieldValue::parse(&TODO, completed, &json!(true)).unwrap(),
            FieldValue::Bool(Some(true))
        );
        assert!(FieldValue::parse(&TODO, completed, &json!("yes")).is_err());

        let created = TODO.field(CREATED_AT).unwrap();
        let parsed = FieldValue::parse(&TODO, created, &json!("2024-05-01T10:00:00Z")).unwrap();
        assert_eq!(parsed.to_json(), json!("2024-05-01T10:00:00+00:00"));
    }

    #[test]
    fn models_are_found_by_path() {
        assert_eq!(ModelDef::by_path("todos").map(|m| m.name), Some("Todo"));
        assert_eq!(ModelDef::by_path("users").map(|m| m.name), Some("User"));
        assert!(ModelDef::by_path("notes").is_none());
    }
}
