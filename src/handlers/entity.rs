//! Entity CRUD handlers: list, create, read, update, delete for every model with a path segment.

use crate::auth::AuthUser;
use crate::case::{object_keys_to_camel_case, to_camel_case};
use crate::error::AppError;
use crate::models::{FieldKind, ModelDef, Operation, Record, Scope};
use crate::response::{many, one};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use std::collections::HashMap;

fn model_for(path_segment: &str, op: Operation) -> Result<&'static ModelDef, AppError> {
    let model = ModelDef::by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment.to_string()))?;
    if !model.allows(op) {
        return Err(AppError::NotAllowed(format!("{:?} on {}", op, model.name)));
    }
    Ok(model)
}

fn body_to_record(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(mut m) => {
            object_keys_to_camel_case(&mut m);
            Ok(m)
        }
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn query_value(kind: FieldKind, s: &str) -> Value {
    if kind == FieldKind::Bool {
        if s.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
    }
    Value::String(s.to_string())
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&path_segment, Operation::List)?;
    let mut filters: Vec<(String, Value)> = Vec::new();
    for (k, v) in params {
        let name = to_camel_case(&k);
        if let Some(field) = model.field(&name).filter(|f| !f.sensitive) {
            filters.push((name, query_value(field.kind, &v)));
        }
    }
    let rows = state.db.model(model).find_all(&filters, Scope::Default).await?;
    Ok(many(model, rows))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(path_segment): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&path_segment, Operation::Create)?;
    let mut record = body_to_record(body)?;
    if let Some(owner) = model.owner_field {
        if record.get(owner).map_or(true, Value::is_null) {
            record.insert(owner.to_string(), Value::String(user.id.clone()));
        }
    }
    let row = state.db.model(model).create(record).await?;
    Ok(one(model, StatusCode::CREATED, row))
}

pub async fn read(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&path_segment, Operation::Read)?;
    let row = state
        .db
        .model(model)
        .find_by_pk(&id, Scope::Default)
        .await?
        .ok_or_else(|| AppError::NotFound(id))?;
    Ok(one(model, StatusCode::OK, row))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((path_segment, id)): Path<(String, String)>,
    axum::Json(body): axum::Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&path_segment, Operation::Update)?;
    let patch = body_to_record(body)?;
    let row = state
        .db
        .model(model)
        .update(&id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(id))?;
    Ok(one(model, StatusCode::OK, row))
}

pub async fn delete(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = model_for(&path_segment, Operation::Delete)?;
    state
        .db
        .model(model)
        .destroy(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}
