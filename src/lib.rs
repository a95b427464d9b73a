//! Todo API: GraphQL and REST backend for a todo-list application.

pub mod auth;
pub mod case;
pub mod config;
pub mod connection;
pub mod error;
pub mod extractors;
pub mod graphql;
pub mod graphql_spec;
pub mod handlers;
pub mod models;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::{authenticate_bearer, hash_password, sign_token, verify_token, AuthUser};
pub use config::{resolve, Environment, ServerConfig};
pub use connection::{connect, connect_with};
pub use error::{AppError, AuthError, ConfigError, DbError, SpecError, StoreError};
pub use graphql::{build_schema, AppSchema, ResourceOps, TODO_OPS, USER_OPS};
pub use graphql_spec::{GraphQLSpec, SpecCase, SpecFailure, TestDependent};
pub use models::{ModelDef, Scope, Todo, User, TODO, USER};
pub use response::{public, Envelope};
pub use routes::app;
pub use state::AppState;
pub use store::{Database, MemoryStore, PgStore};
