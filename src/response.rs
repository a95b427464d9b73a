//! REST envelopes. Records pass through `public` so sensitive attributes stay on the server.

use crate::models::{ModelDef, Record};
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub count: usize,
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

/// Drop every attribute the model marks sensitive.
pub fn public(model: &ModelDef, mut record: Record) -> Record {
    for field in model.fields.iter().filter(|f| f.sensitive) {
        record.remove(field.name);
    }
    record
}

/// One record under `data`, with the given status (201 after a create, 200 otherwise).
pub fn one(model: &ModelDef, status: StatusCode, row: Record) -> Reply<Record> {
    (
        status,
        Json(Envelope {
            data: public(model, row),
            meta: None,
        }),
    )
}

/// Records under `data` and their count under `meta`.
pub fn many(model: &ModelDef, rows: Vec<Record>) -> Reply<Vec<Record>> {
    let data: Vec<Record> = rows.into_iter().map(|r| public(model, r)).collect();
    let meta = Some(Meta { count: data.len() });
    (StatusCode::OK, Json(Envelope { data, meta }))
}
