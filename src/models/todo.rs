use super::{FieldDef, FieldKind, ModelDef, Operation, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub static TODO: ModelDef = ModelDef {
    name: "Todo",
    table: "todos",
    path_segment: "todos",
    primary_key: "id",
    fields: &[
        FieldDef::new("id", FieldKind::Uuid).primary_key(),
        FieldDef::new("userId", FieldKind::Uuid).references("users", "id"),
        FieldDef::new("title", FieldKind::Text),
        FieldDef::new("description", FieldKind::Text),
        FieldDef::new("completed", FieldKind::Bool),
        FieldDef::new("createdAt", FieldKind::Timestamp),
        FieldDef::new("updatedAt", FieldKind::Timestamp),
    ],
    timestamps: true,
    owner_field: Some("userId"),
    operations: &[
        Operation::List,
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ],
    before_save: None,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Todo {
    fn model() -> &'static ModelDef {
        &TODO
    }
}
