use async_graphql::{Request, Variables};
use serde_json::{json, Value};
use std::sync::Arc;
use todo_api::graphql_spec::test_config;
use todo_api::models::Record;
use todo_api::{
    build_schema, graphql_crud_spec, sign_token, verify_token, AppSchema, AuthUser, Database,
    GraphQLSpec, TestDependent, User, TODO, TODO_OPS, USER,
};

graphql_crud_spec!(
    todos,
    GraphQLSpec::new(
        &TODO,
        TODO_OPS,
        json!({"title": "a", "description": "b", "completed": false}),
        json!({"title": "c"}),
        vec![],
    )
    .expect("valid todo spec")
);

graphql_crud_spec!(
    todos_with_owner_seeded,
    GraphQLSpec::new(
        &TODO,
        TODO_OPS,
        json!({"title": "groceries", "completed": true}),
        json!({"completed": false, "description": "milk"}),
        vec![TestDependent::new(&USER, json!({"username": "owner", "password": "pw"}))],
    )
    .expect("valid todo spec")
);

struct Harness {
    db: Database,
    schema: AppSchema,
    user: AuthUser,
}

async fn harness() -> Harness {
    let config = test_config().unwrap();
    let db = Database::memory(&config.database_options);
    db.sync(true).await.unwrap();
    let mut stu1 = Record::new();
    stu1.insert("username".into(), json!("stu1"));
    stu1.insert("passwordHash".into(), json!("123"));
    let user: User = db.repo::<User>().create(stu1).await.unwrap();
    let token = sign_token(&config.secrets, &user).unwrap();
    let user = verify_token(&config.secrets, &token).unwrap();
    let schema = build_schema(db.clone(), Arc::new(config));
    Harness { db, schema, user }
}

impl Harness {
    async fn run(&self, query: &str, variables: Value) -> async_graphql::Response {
        let request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(self.user.clone());
        self.schema.execute(request).await
    }

    async fn data(&self, query: &str, variables: Value) -> Value {
        let response = self.run(query, variables).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.into_json().unwrap()
    }

    async fn new_todo(&self, input: Value) -> String {
        let data = self
            .data(
                "mutation ($input: NewTodoInput!) { newTodo(input: $input) { id } }",
                json!({ "input": input }),
            )
            .await;
        data["newTodo"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn new_todo_returns_generated_id() {
    let h = harness().await;
    let id = h
        .new_todo(json!({"title": "a", "description": "b", "completed": false}))
        .await;
    assert!(!id.is_empty());
    assert!(uuid::Uuid::parse_str(&id).is_ok());
}

#[tokio::test]
async fn new_todo_is_owned_by_the_caller() {
    let h = harness().await;
    let id = h.new_todo(json!({"title": "mine"})).await;
    let data = h
        .data(
            "query ($id: ID!) { todo(id: $id) { userId user { username } } }",
            json!({ "id": id }),
        )
        .await;
    assert_eq!(data["todo"]["userId"], json!(h.user.id));
    assert_eq!(data["todo"]["user"]["username"], "stu1");
}

#[tokio::test]
async fn all_todos_lists_created_todos() {
    let h = harness().await;
    h.new_todo(json!({"title": "a"})).await;
    h.new_todo(json!({"title": "b"})).await;
    let data = h.data("{ allTodos { id title } }", json!({})).await;
    let titles: Vec<_> = data["allTodos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["a", "b"]);
}

#[tokio::test]
async fn update_todo_keeps_id() {
    let h = harness().await;
    let id = h.new_todo(json!({"title": "a"})).await;
    let data = h
        .data(
            "mutation ($input: UpdatedTodoInput!) { updateTodo(input: $input) { id title } }",
            json!({ "input": { "id": id, "title": "c" } }),
        )
        .await;
    assert_eq!(data["updateTodo"]["id"], json!(id));
    assert_eq!(data["updateTodo"]["title"], "c");
}

#[tokio::test]
async fn timestamps_only_when_selected() {
    let h = harness().await;
    let id = h.new_todo(json!({"title": "a"})).await;
    let scoped = h
        .db
        .model(&TODO)
        .find_by_pk(&id, todo_api::Scope::Default)
        .await
        .unwrap()
        .unwrap();
    assert!(scoped.get("createdAt").is_none());

    let data = h
        .data(
            "query ($id: ID!) { todo(id: $id) { createdAt updatedAt } }",
            json!({ "id": id }),
        )
        .await;
    assert!(data["todo"]["createdAt"].is_string());
    assert!(data["todo"]["updatedAt"].is_string());
}

#[tokio::test]
async fn remove_todo_deletes_and_then_reports_missing() {
    let h = harness().await;
    let id = h.new_todo(json!({"title": "a"})).await;
    let query = "mutation ($id: ID!) { removeTodo(id: $id) { id } }";
    let data = h.data(query, json!({ "id": id })).await;
    assert_eq!(data["removeTodo"]["id"], json!(id));

    let response = h.run(query, json!({ "id": id })).await;
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.contains("not found"));
    let remaining = h.db.model(&TODO).find_all(&[], todo_api::Scope::Default).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn requests_without_a_user_are_not_authorised() {
    let h = harness().await;
    let response = h.schema.execute("{ allTodos { id } }").await;
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Not authorised");

    let request = Request::new("mutation { newTodo(input: {title: \"x\"}) { id } }");
    let response = h.schema.execute(request).await;
    assert_eq!(response.errors[0].message, "Not authorised");
}

#[tokio::test]
async fn new_todo_for_an_unknown_user_is_rejected() {
    let h = harness().await;
    let stranger = uuid::Uuid::now_v7().to_string();
    let response = h
        .run(
            "mutation ($input: NewTodoInput!) { newTodo(input: $input) { id } }",
            json!({ "input": { "title": "lost", "userId": stranger } }),
        )
        .await;
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.contains("references a row that does not exist"));
    let remaining = h.db.model(&TODO).find_all(&[], todo_api::Scope::Default).await.unwrap();
    assert!(remaining.is_empty());
}
