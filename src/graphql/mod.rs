//! GraphQL schema: queries and mutations for every resource, behind bearer authentication.

mod todo;
mod user;

pub use todo::{NewTodoInput, TodoMutation, TodoQuery, UpdatedTodoInput};
pub use user::{NewUserInput, UpdatedUserInput, UserMutation, UserQuery};

use crate::auth::AuthUser;
use crate::config::ServerConfig;
use crate::models::{Record, Scope, CREATED_AT, UPDATED_AT};
use crate::store::Database;
use async_graphql::extensions::Tracing;
use async_graphql::{Context, EmptySubscription, Error, MergedObject, Result, Schema};
use serde_json::Value;
use std::sync::Arc;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(TodoQuery, UserQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(TodoMutation, UserMutation);

/// Build the schema with the database and configuration installed as schema data.
pub fn build_schema(db: Database, config: Arc<ServerConfig>) -> AppSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(db)
        .data(config)
        .extension(Tracing)
        .finish()
}

/// The authenticated user attached to this request.
pub(crate) fn current_user<'a>(ctx: &Context<'a>) -> Result<&'a AuthUser> {
    ctx.data_opt::<AuthUser>()
        .ok_or_else(|| Error::new("Not authorised"))
}

pub(crate) fn database<'a>(ctx: &Context<'a>) -> Result<&'a Database> {
    ctx.data::<Database>()
}

/// Timestamps are read only when the selection asks for them.
pub(crate) fn scope_for(ctx: &Context<'_>) -> Scope {
    let selection = ctx.look_ahead();
    if selection.field(CREATED_AT).exists() || selection.field(UPDATED_AT).exists() {
        Scope::Unscoped
    } else {
        Scope::Default
    }
}

/// Insert `value` under `key` when present.
pub(crate) fn set(record: &mut Record, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        record.insert(key.to_string(), value.into());
    }
}

/// GraphQL operation and input type names for one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceOps {
    pub list_op: &'static str,
    pub get_op: &'static str,
    pub create_op: &'static str,
    pub update_op: &'static str,
    pub delete_op: &'static str,
    pub create_input: &'static str,
    pub update_input: &'static str,
}

impl ResourceOps {
    pub fn names(&self) -> [&'static str; 7] {
        [
            self.list_op,
            self.get_op,
            self.create_op,
            self.update_op,
            self.delete_op,
            self.create_input,
            self.update_input,
        ]
    }
}

pub const TODO_OPS: ResourceOps = ResourceOps {
    list_op: "allTodos",
    get_op: "todo",
    create_op: "newTodo",
    update_op: "updateTodo",
    delete_op: "removeTodo",
    create_input: "NewTodoInput",
    update_input: "UpdatedTodoInput",
};

pub const USER_OPS: ResourceOps = ResourceOps {
    list_op: "allUsers",
    get_op: "user",
    create_op: "newUser",
    update_op: "updateUser",
    delete_op: "removeUser",
    create_input: "NewUserInput",
    update_input: "UpdatedUserInput",
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve;

    fn schema() -> AppSchema {
        let config = resolve(|key| (key == "NODE_ENV").then(|| "test".to_string())).unwrap();
        let db = Database::memory(&config.database_options);
        build_schema(db, Arc::new(config))
    }

    #[test]
    fn schema_exposes_every_resource_operation() {
        let sdl = schema().sdl();
        for ops in [TODO_OPS, USER_OPS] {
            for name in ops.names() {
                assert!(sdl.contains(name), "{name} missing from schema");
            }
        }
        assert!(!sdl.contains("passwordHash"));
    }

    #[tokio::test]
    async fn unauthenticated_requests_are_refused() {
        let response = schema().execute("{ allTodos { id } }").await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Not authorised");
    }
}
