use super::{current_user, database, scope_for, set};
use crate::error::StoreError;
use crate::models::{Record, Todo, User, TODO};
use async_graphql::{Context, InputObject, Object, Result, ID};
use chrono::{DateTime, Utc};

#[Object]
impl Todo {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn user_id(&self) -> Option<ID> {
        self.user_id.map(|id| ID(id.to_string()))
    }

    async fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    async fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    async fn completed(&self) -> Option<bool> {
        self.completed
    }

    async fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// The owner of this todo.
    async fn user(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let Some(user_id) = self.user_id else {
            return Ok(None);
        };
        let user = database(ctx)?
            .repo::<User>()
            .find_by_pk(&user_id.to_string(), scope_for(ctx))
            .await?;
        Ok(user)
    }
}

#[derive(InputObject)]
pub struct NewTodoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    /// Defaults to the authenticated user.
    pub user_id: Option<ID>,
}

impl NewTodoInput {
    fn into_record(self, owner: &str) -> Record {
        let mut record = Record::new();
        set(&mut record, "title", self.title);
        set(&mut record, "description", self.description);
        set(&mut record, "completed", self.completed);
        let user_id = self.user_id.map(|id| id.0).unwrap_or_else(|| owner.to_string());
        set(&mut record, "userId", Some(user_id));
        record
    }
}

#[derive(InputObject)]
pub struct UpdatedTodoInput {
    pub id: ID,
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdatedTodoInput {
    fn into_parts(self) -> (String, Record) {
        let mut patch = Record::new();
        set(&mut patch, "title", self.title);
        set(&mut patch, "description", self.description);
        set(&mut patch, "completed", self.completed);
        (self.id.0, patch)
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        model: TODO.name,
        id: id.to_string(),
    }
}

#[derive(Default)]
pub struct TodoQuery;

#[Object]
impl TodoQuery {
    async fn all_todos(&self, ctx: &Context<'_>) -> Result<Vec<Todo>> {
        current_user(ctx)?;
        let todos = database(ctx)?.repo::<Todo>().find_all(scope_for(ctx)).await?;
        Ok(todos)
    }

    async fn todo(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Todo>> {
        current_user(ctx)?;
        let todo = database(ctx)?
            .repo::<Todo>()
            .find_by_pk(&id, scope_for(ctx))
            .await?;
        Ok(todo)
    }
}

#[derive(Default)]
pub struct TodoMutation;

#[Object]
impl TodoMutation {
    async fn new_todo(&self, ctx: &Context<'_>, input: NewTodoInput) -> Result<Todo> {
        let user = current_user(ctx)?;
        let todo = database(ctx)?
            .repo::<Todo>()
            .create(input.into_record(&user.id))
            .await?;
        tracing::debug!(id = %todo.id, user = %user.username, "todo created");
        Ok(todo)
    }

    async fn update_todo(&self, ctx: &Context<'_>, input: UpdatedTodoInput) -> Result<Todo> {
        current_user(ctx)?;
        let (id, patch) = input.into_parts();
        let todo = database(ctx)?.repo::<Todo>().update(&id, patch).await?;
        Ok(todo.ok_or_else(|| not_found(&id))?)
    }

    async fn remove_todo(&self, ctx: &Context<'_>, id: ID) -> Result<Todo> {
        current_user(ctx)?;
        let todo = database(ctx)?.repo::<Todo>().destroy(&id).await?;
        Ok(todo.ok_or_else(|| not_found(&id))?)
    }
}
