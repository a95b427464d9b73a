//! Generic CRUD test suite for a GraphQL resource.
//!
//! A [`GraphQLSpec`] runs the five standard cases (list, get, create, update, delete) for one
//! model against the schema. Each case starts from a freshly synced database, seeds the declared
//! dependents, creates the user `stu1`, and sends every request with that user's bearer token.
//! [`graphql_crud_spec!`](crate::graphql_crud_spec) registers the cases as `#[tokio::test]`
//! functions.

use crate::auth::{authenticate_bearer, sign_token, AuthUser};
use crate::config::{resolve, ServerConfig};
use crate::error::{AuthError, ConfigError, SpecError, StoreError};
use crate::graphql::{build_schema, AppSchema, ResourceOps};
use crate::models::{ModelDef, Record, User};
use crate::store::Database;
use async_graphql::{Request, Variables};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A record another model needs before the resource under test can be created.
#[derive(Clone, Debug)]
pub struct TestDependent {
    pub model: &'static ModelDef,
    pub resource: Value,
}

impl TestDependent {
    pub fn new(model: &'static ModelDef, resource: Value) -> Self {
        TestDependent { model, resource }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecCase {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl SpecCase {
    pub const ALL: [SpecCase; 5] = [
        SpecCase::List,
        SpecCase::Get,
        SpecCase::Create,
        SpecCase::Update,
        SpecCase::Delete,
    ];
}

impl fmt::Display for SpecCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecCase::List => "list",
            SpecCase::Get => "get",
            SpecCase::Create => "create",
            SpecCase::Update => "update",
            SpecCase::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A case whose setup or assertions failed.
#[derive(Error, Debug)]
#[error("{case}: {message}")]
pub struct SpecFailure {
    pub case: String,
    pub message: String,
}

#[derive(Error, Debug)]
enum SetupError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("created {0} has no string primary key")]
    MissingId(&'static str),
}

/// Configuration used by spec runs: the test environment resolved without the process environment.
pub fn test_config() -> Result<ServerConfig, ConfigError> {
    resolve(|key| (key == "NODE_ENV").then(|| "test".to_string()))
}

fn non_empty(value: Value, purpose: &'static str) -> Result<Record, SpecError> {
    match value {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(SpecError::EmptyPayload(purpose)),
    }
}

fn check_names(ops: &ResourceOps) -> Result<(), SpecError> {
    let re = regex::Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$")
        .map_err(|_| SpecError::InvalidOperationName(String::new()))?;
    match ops.names().into_iter().find(|name| !re.is_match(name)) {
        Some(bad) => Err(SpecError::InvalidOperationName(bad.to_string())),
        None => Ok(()),
    }
}

pub struct GraphQLSpec {
    model: &'static ModelDef,
    ops: ResourceOps,
    resource_to_create: Record,
    resource_to_update: Record,
    test_dependents: Vec<TestDependent>,
    config: Arc<ServerConfig>,
}

impl GraphQLSpec {
    /// Fails when either payload is not an object with at least one property, when a dependent
    /// seed is not an object, or when an operation name is not a GraphQL name.
    pub fn new(
        model: &'static ModelDef,
        ops: ResourceOps,
        resource_to_create: Value,
        resource_to_update: Value,
        test_dependents: Vec<TestDependent>,
    ) -> Result<Self, SpecError> {
        let resource_to_create = non_empty(resource_to_create, "create")?;
        let resource_to_update = non_empty(resource_to_update, "updated")?;
        for dependent in &test_dependents {
            if !dependent.resource.is_object() {
                return Err(SpecError::EmptyPayload("seed"));
            }
        }
        check_names(&ops)?;
        Ok(GraphQLSpec {
            model,
            ops,
            resource_to_create,
            resource_to_update,
            test_dependents,
            config: Arc::new(test_config()?),
        })
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn describe(&self) -> String {
        format!("GraphQL / {}", self.model.name)
    }

    pub fn case_name(&self, case: SpecCase) -> String {
        let ops = &self.ops;
        let operation = match case {
            SpecCase::List => ops.list_op.to_string(),
            SpecCase::Get => format!("{}(id: ID!)", ops.get_op),
            SpecCase::Create => format!("{}($input: {}!)", ops.create_op, ops.create_input),
            SpecCase::Update => format!("{}($input: {}!)", ops.update_op, ops.update_input),
            SpecCase::Delete => format!("{}($id: ID!)", ops.delete_op),
        };
        format!("{} {}", self.describe(), operation)
    }

    /// Run one case against a fresh in-memory database, closed afterwards.
    pub async fn run(&self, case: SpecCase) -> Result<(), SpecFailure> {
        let db = Database::memory(&self.config.database_options);
        let result = self.run_case(&db, case).await;
        db.close().await;
        result
    }

    /// Run every case in order against `db`, then close it.
    pub async fn run_all(&self, db: Database) -> Result<(), SpecFailure> {
        let mut result = Ok(());
        for case in SpecCase::ALL {
            result = self.run_case(&db, case).await;
            if result.is_err() {
                break;
            }
        }
        db.close().await;
        result
    }

    /// Set up `db` and run one case against it.
    pub async fn run_case(&self, db: &Database, case: SpecCase) -> Result<(), SpecFailure> {
        let fail = |message: String| SpecFailure {
            case: self.case_name(case),
            message,
        };
        let (token, id) = self
            .before_each(db)
            .await
            .map_err(|e| fail(format!("setup: {e}")))?;
        let user = authenticate_bearer(&self.config.secrets, Some(&format!("Bearer {token}")))
            .map_err(|e| fail(e.to_string()))?;
        let schema = build_schema(db.clone(), self.config.clone());
        tracing::debug!(case = %case, model = self.model.name, "running spec case");

        match case {
            SpecCase::List => {
                let op = self.ops.list_op;
                let first = self.resource_to_create.keys().next().map_or("id", String::as_str);
                let query = format!("{{ {op} {{ id {first} }} }}");
                let data = execute(&schema, user, query, json!({})).await.map_err(fail)?;
                if !data[op].is_array() {
                    return Err(fail(format!("expected an array under {op}, got {}", data[op])));
                }
            }
            SpecCase::Get => {
                let op = self.ops.get_op;
                let query = format!("query ($id: ID!) {{ {op}(id: $id) {{ id }} }}");
                let data = execute(&schema, user, query, json!({ "id": id })).await.map_err(fail)?;
                expect_id(&data, op, Some(&id)).map_err(fail)?;
            }
            SpecCase::Create => {
                // the seeded resource would clash with unique fields
                let handle = db.model(self.model);
                handle
                    .drop_table(true)
                    .await
                    .map_err(|e| fail(format!("setup: {e}")))?;
                handle.sync().await.map_err(|e| fail(format!("setup: {e}")))?;
                let (op, input) = (self.ops.create_op, self.ops.create_input);
                let query = format!("mutation ($input: {input}!) {{ {op}(input: $input) {{ id }} }}");
                let variables = json!({ "input": self.resource_to_create });
                let data = execute(&schema, user, query, variables).await.map_err(fail)?;
                expect_id(&data, op, None).map_err(fail)?;
            }
            SpecCase::Update => {
                let (op, input) = (self.ops.update_op, self.ops.update_input);
                let mut payload = self.resource_to_update.clone();
                payload.insert("id".into(), Value::String(id.clone()));
                let query = format!("mutation ($input: {input}!) {{ {op}(input: $input) {{ id }} }}");
                let data = execute(&schema, user, query, json!({ "input": payload }))
                    .await
                    .map_err(fail)?;
                expect_id(&data, op, Some(&id)).map_err(fail)?;
            }
            SpecCase::Delete => {
                let op = self.ops.delete_op;
                let query = format!("mutation ($id: ID!) {{ {op}(id: $id) {{ id }} }}");
                let data = execute(&schema, user, query, json!({ "id": id })).await.map_err(fail)?;
                if !data[op].is_object() {
                    return Err(fail(format!("expected an object under {op}, got {}", data[op])));
                }
            }
        }
        Ok(())
    }

    /// Sync, seed dependents, create `stu1` and the resource under test.
    /// Returns the bearer token and the resource id.
    async fn before_each(&self, db: &Database) -> Result<(String, String), SetupError> {
        db.sync(true).await?;
        for dependent in &self.test_dependents {
            let handle = db.model(dependent.model);
            handle.drop_table(true).await?;
            handle.sync().await?;
            let seed = dependent.resource.as_object().cloned().unwrap_or_default();
            handle.create(seed).await?;
        }

        let mut stu1 = Record::new();
        stu1.insert("username".into(), json!("stu1"));
        stu1.insert("passwordHash".into(), json!("123"));
        let user = db.repo::<User>().create(stu1).await?;
        let token = sign_token(&self.config.secrets, &user)?;

        let resource = db
            .model(self.model)
            .create(self.resource_to_create.clone())
            .await?;
        let id = resource
            .get(self.model.primary_key)
            .and_then(Value::as_str)
            .ok_or(SetupError::MissingId(self.model.name))?
            .to_string();
        Ok((token, id))
    }
}

/// Execute as `user` and return `data`, failing on any GraphQL error.
async fn execute(
    schema: &AppSchema,
    user: AuthUser,
    query: String,
    variables: Value,
) -> Result<Value, String> {
    let request = Request::new(query)
        .variables(Variables::from_json(variables))
        .data(user);
    let response = schema.execute(request).await;
    if !response.errors.is_empty() {
        let messages: Vec<_> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(format!("unexpected errors: {}", messages.join("; ")));
    }
    response.data.into_json().map_err(|e| e.to_string())
}

/// `data[op]` must be an object with a string id, equal to `expected` when given.
fn expect_id(data: &Value, op: &str, expected: Option<&str>) -> Result<(), String> {
    let object = &data[op];
    if !object.is_object() {
        return Err(format!("expected an object under {op}, got {object}"));
    }
    let Some(id) = object["id"].as_str() else {
        return Err(format!("expected a string id under {op}, got {}", object["id"]));
    };
    match expected {
        Some(expected) if id != expected => Err(format!("expected id {expected}, got {id}")),
        _ => Ok(()),
    }
}

/// Register the five CRUD cases of a [`GraphQLSpec`] as `#[tokio::test]` functions in a module
/// named `$suite`. `$spec` is evaluated inside that module, which imports the parent's items.
#[macro_export]
macro_rules! graphql_crud_spec {
    ($suite:ident, $spec:expr) => {
        #[allow(unused_imports)]
        mod $suite {
            use super::*;

            fn spec() -> $crate::graphql_spec::GraphQLSpec {
                $spec
            }

            async fn check(case: $crate::graphql_spec::SpecCase) {
                if let Err(failure) = spec().run(case).await {
                    panic!("{failure}");
                }
            }

            #[tokio::test]
            async fn list() {
                check($crate::graphql_spec::SpecCase::List).await;
            }

            #[tokio::test]
            async fn get() {
                check($crate::graphql_spec::SpecCase::Get).await;
            }

            #[tokio::test]
            async fn create() {
                check($crate::graphql_spec::SpecCase::Create).await;
            }

            #[tokio::test]
            async fn update() {
                check($crate::graphql_spec::SpecCase::Update).await;
            }

            #[tokio::test]
            async fn delete() {
                check($crate::graphql_spec::SpecCase::Delete).await;
            }
        }
    };
}
