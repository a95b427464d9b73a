//! HTTP handlers for GraphQL, entity CRUD and sign-in.

pub mod auth;
pub mod entity;
pub mod graphql;
pub use auth::*;
pub use entity::*;
pub use graphql::*;
