use super::{current_user, database, scope_for, set};
use crate::error::StoreError;
use crate::models::{Record, Todo, User, USER};
use async_graphql::{Context, InputObject, Object, Result, ID};
use chrono::{DateTime, Utc};
use serde_json::json;

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn username(&self) -> &str {
        &self.username
    }

    async fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    async fn todos(&self, ctx: &Context<'_>) -> Result<Vec<Todo>> {
        let todos = database(ctx)?
            .repo::<Todo>()
            .find_where("userId", json!(self.id.to_string()), scope_for(ctx))
            .await?;
        Ok(todos)
    }
}

#[derive(InputObject)]
pub struct NewUserInput {
    pub username: String,
    pub password: String,
}

#[derive(InputObject)]
pub struct UpdatedUserInput {
    pub id: ID,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        model: USER.name,
        id: id.to_string(),
    }
}

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    async fn all_users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        current_user(ctx)?;
        let users = database(ctx)?.repo::<User>().find_all(scope_for(ctx)).await?;
        Ok(users)
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<User>> {
        current_user(ctx)?;
        let user = database(ctx)?
            .repo::<User>()
            .find_by_pk(&id, scope_for(ctx))
            .await?;
        Ok(user)
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    async fn new_user(&self, ctx: &Context<'_>, input: NewUserInput) -> Result<User> {
        current_user(ctx)?;
        let mut record = Record::new();
        set(&mut record, "username", Some(input.username));
        set(&mut record, "password", Some(input.password));
        let user = database(ctx)?.repo::<User>().create(record).await?;
        Ok(user)
    }

    async fn update_user(&self, ctx: &Context<'_>, input: UpdatedUserInput) -> Result<User> {
        current_user(ctx)?;
        let mut patch = Record::new();
        set(&mut patch, "username", input.username);
        set(&mut patch, "password", input.password);
        let user = database(ctx)?.repo::<User>().update(&input.id, patch).await?;
        Ok(user.ok_or_else(|| not_found(&input.id))?)
    }

    async fn remove_user(&self, ctx: &Context<'_>, id: ID) -> Result<User> {
        current_user(ctx)?;
        let user = database(ctx)?.repo::<User>().destroy(&id).await?;
        Ok(user.ok_or_else(|| not_found(&id))?)
    }
}
