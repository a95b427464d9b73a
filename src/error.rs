//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("unsupported database dialect: {0}")]
    UnsupportedDialect(String),
    #[error("invalid database url: {0}")]
    InvalidUrl(String),
    #[error("database connection: {0}")]
    Connection(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table {0} does not exist")]
    MissingTable(String),
    #[error("unique constraint violated on {table}.{field}")]
    UniqueViolation { table: String, field: String },
    #[error("{table}.{field} references a row that does not exist")]
    ForeignKeyViolation { table: String, field: String },
    #[error("unknown attribute '{field}' for model {model}")]
    UnknownAttribute { model: &'static str, field: String },
    #[error("invalid value for {model}.{field}: {reason}")]
    InvalidValue {
        model: &'static str,
        field: String,
        reason: String,
    },
    #[error("{model} '{id}' not found")]
    NotFound { model: &'static str, id: String },
    #[error("database connection is closed")]
    Closed,
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("invalid username or password")]
    BadCredentials,
    #[error("password hashing: {0}")]
    Hash(String),
}

/// Caller-contract violations detected when a GraphQL spec is built.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Must provide an object to {0} with properties of at least length 1")]
    EmptyPayload(&'static str),
    #[error("invalid GraphQL operation name: '{0}'")]
    InvalidOperationName(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("operation not allowed: {0}")]
    NotAllowed(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "not_allowed"),
            AppError::Auth(AuthError::Hash(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "hash_error"),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Store(e) => match e {
                StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::UniqueViolation { .. } => (StatusCode::CONFLICT, "conflict"),
                StoreError::ForeignKeyViolation { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_reference")
                }
                StoreError::UnknownAttribute { .. } | StoreError::InvalidValue { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
