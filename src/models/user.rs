use super::{FieldDef, FieldKind, ModelDef, Operation, Record, Resource};
use crate::auth::{hash_password, verify_password};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub static USER: ModelDef = ModelDef {
    name: "User",
    table: "users",
    path_segment: "users",
    primary_key: "id",
    fields: &[
        FieldDef::new("id", FieldKind::Uuid).primary_key(),
        FieldDef::new("username", FieldKind::Text).not_null().unique(),
        FieldDef::new("passwordHash", FieldKind::Text).not_null().sensitive(),
        FieldDef::new("createdAt", FieldKind::Timestamp),
        FieldDef::new("updatedAt", FieldKind::Timestamp),
    ],
    timestamps: true,
    owner_field: None,
    operations: &[Operation::List, Operation::Read, Operation::Create, Operation::Delete],
    before_save: Some(hash_plain_password),
};

/// A plain `password` attribute is stored as `passwordHash`.
fn hash_plain_password(values: &mut Record) -> Result<(), StoreError> {
    if let Some(Value::String(password)) = values.remove("password") {
        let hash = hash_password(&password).map_err(|e| StoreError::InvalidValue {
            model: USER.name,
            field: "password".into(),
            reason: e.to_string(),
        })?;
        values.insert("passwordHash".into(), Value::String(hash));
    }
    Ok(())
}

impl User {
    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for User {
    fn model() -> &'static ModelDef {
        &USER
    }
}
