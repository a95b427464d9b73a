//! Runs the CRUD suites against PostgreSQL. Skipped unless `DATABASE_URL` is set.

use serde_json::json;
use todo_api::graphql_spec::test_config;
use todo_api::models::Record;
use todo_api::{Database, GraphQLSpec, StoreError, TODO, TODO_OPS, USER, USER_OPS};

async fn database() -> Option<Database> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = test_config().unwrap();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();
    Some(Database::postgres(pool, &config.database_options))
}

#[tokio::test]
async fn crud_suites_pass_on_postgres() {
    let Some(db) = database().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    db.sync(true).await.unwrap();
    let mut dangling = Record::new();
    dangling.insert("title".into(), json!("lost"));
    dangling.insert("userId".into(), json!(uuid::Uuid::now_v7().to_string()));
    let err = db.model(&TODO).create(dangling).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { ref field, .. } if field == "userId"));

    let todos = GraphQLSpec::new(
        &TODO,
        TODO_OPS,
        json!({"title": "a", "description": "b", "completed": false}),
        json!({"title": "c"}),
        vec![],
    )
    .unwrap();
    todos.run_all(db).await.unwrap();

    let Some(db) = database().await else {
        return;
    };
    let users = GraphQLSpec::new(
        &USER,
        USER_OPS,
        json!({"username": "ada", "password": "lovelace"}),
        json!({"username": "ada.l"}),
        vec![],
    )
    .unwrap();
    users.run_all(db).await.unwrap();
}
