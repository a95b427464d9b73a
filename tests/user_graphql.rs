use async_graphql::{Request, Variables};
use serde_json::json;
use std::sync::Arc;
use todo_api::graphql_spec::test_config;
use todo_api::models::Record;
use todo_api::{
    authenticate_bearer, build_schema, graphql_crud_spec, sign_token, Database,
    GraphQLSpec, Scope, User, USER, USER_OPS,
};

// username comes first so the list case selects it
graphql_crud_spec!(
    users,
    GraphQLSpec::new(
        &USER,
        USER_OPS,
        json!({"username": "ada", "password": "lovelace"}),
        json!({"username": "ada.l"}),
        vec![],
    )
    .expect("valid user spec")
);

#[tokio::test]
async fn users_expose_their_todos_but_not_password_hashes() {
    let config = test_config().unwrap();
    let db = Database::memory(&config.database_options);
    db.sync(true).await.unwrap();
    let mut values = Record::new();
    values.insert("username".into(), json!("stu1"));
    values.insert("password".into(), json!("123"));
    let user: User = db.repo::<User>().create(values).await.unwrap();
    assert!(user.check_password("123"));
    assert_ne!(user.password_hash, "123");

    let token = sign_token(&config.secrets, &user).unwrap();
    let auth = authenticate_bearer(&config.secrets, Some(&format!("Bearer {token}"))).unwrap();
    let schema = build_schema(db.clone(), Arc::new(config));

    let request = Request::new("mutation { newTodo(input: {title: \"t\"}) { id } }").data(auth.clone());
    assert!(schema.execute(request).await.errors.is_empty());

    let request = Request::new("query ($id: ID!) { user(id: $id) { username todos { title } } }")
        .variables(Variables::from_json(json!({ "id": user.id.to_string() })))
        .data(auth.clone());
    let data = schema.execute(request).await.data.into_json().unwrap();
    assert_eq!(data["user"]["username"], "stu1");
    assert_eq!(data["user"]["todos"], json!([{ "title": "t" }]));

    let request = Request::new("{ allUsers { id passwordHash } }").data(auth);
    assert!(!schema.execute(request).await.errors.is_empty());
}

#[tokio::test]
async fn update_user_rehashes_password() {
    let config = test_config().unwrap();
    let db = Database::memory(&config.database_options);
    db.sync(true).await.unwrap();
    let mut values = Record::new();
    values.insert("username".into(), json!("stu1"));
    values.insert("password".into(), json!("old"));
    let user: User = db.repo::<User>().create(values).await.unwrap();
    let token = sign_token(&config.secrets, &user).unwrap();
    let auth = authenticate_bearer(&config.secrets, Some(&format!("Bearer {token}"))).unwrap();
    let schema = build_schema(db.clone(), Arc::new(config));

    let request = Request::new(
        "mutation ($input: UpdatedUserInput!) { updateUser(input: $input) { id username } }",
    )
    .variables(Variables::from_json(json!({
        "input": { "id": user.id.to_string(), "password": "new" }
    })))
    .data(auth);
    let response = schema.execute(request).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let stored = db
        .repo::<User>()
        .find_by_pk(&user.id.to_string(), Scope::Default)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.check_password("new"));
    assert!(!stored.check_password("123"));
}
