//! Environment-specific overlays merged onto the base settings.

use crate::config::loader::leading_port;
use crate::config::types::Environment;
use serde_json::{json, Map, Value};

pub(crate) fn overlay(env: Environment, lookup: &dyn Fn(&str) -> Option<String>) -> Value {
    match env {
        Environment::Development => development(),
        Environment::Test => test(),
        Environment::Production => production(lookup),
    }
}

fn development() -> Value {
    json!({
        "logLevel": "debug",
        "database": {
            "dbName": "todo_dev"
        }
    })
}

fn test() -> Value {
    json!({
        "logLevel": "warn",
        "database": {
            "dbName": "todo_test"
        },
        "databaseOptions": {
            "pool": {
                "max": 1
            }
        },
        "secrets": {
            "jwt": "test-secret"
        }
    })
}

/// Production reads connection settings and the token secret from the environment.
fn production(lookup: &dyn Fn(&str) -> Option<String>) -> Value {
    let mut database = Map::new();
    for (var, key) in [
        ("DB_HOST", "host"),
        ("DB_USER", "user"),
        ("DB_PASS", "pass"),
        ("DB_NAME", "dbName"),
    ] {
        if let Some(v) = lookup(var).filter(|v| !v.is_empty()) {
            database.insert(key.into(), Value::String(v));
        }
    }
    if let Some(port) = lookup("DB_PORT").as_deref().and_then(leading_port) {
        database.insert("port".into(), json!(port));
    }

    let mut settings = json!({
        "database": Value::Object(database),
        "databaseOptions": {
            "pool": {
                "max": 10
            }
        }
    });
    if let Some(secret) = lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
        settings["secrets"] = json!({ "jwt": secret });
    }
    settings
}
