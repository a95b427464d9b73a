//! Build the process configuration: shared defaults deep-merged with the environment overlay.

use crate::config::environments::overlay;
use crate::config::types::{Environment, ServerConfig};
use crate::error::ConfigError;
use serde_json::{json, Value};

pub const DEFAULT_PORT: u16 = 3000;

/// Secret used when no environment provides one. Production startup warns about it.
pub const DEFAULT_JWT_SECRET: &str = "development-secret";

/// Leading decimal digits of `raw` as a port, so `8080abc` is 8080. None when there are no
/// digits or the value is zero or out of range.
pub fn leading_port(raw: &str) -> Option<u16> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u16>().ok().filter(|port| *port > 0)
}

/// `PORT` as read by [`leading_port`], falling back to 3000.
pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(leading_port).unwrap_or(DEFAULT_PORT)
}

/// Settings common to every environment.
fn base_settings(port: u16) -> Value {
    json!({
        "port": port,
        "logLevel": "info",
        "database": {
            "host": "localhost",
            "port": 5432,
            "user": "postgres",
            "pass": "",
            "dbName": "todo"
        },
        "databaseOptions": {
            "dialect": "postgres",
            "pool": {
                "max": 5,
                "min": 0,
                "idle": 10000
            },
            "quoteIdentifiers": false,
            "define": {
                "underscored": true,
                // createdAt and updatedAt are only returned when asked for
                "defaultScope": {
                    "attributes": { "exclude": ["createdAt", "updatedAt"] }
                }
            }
        },
        "secrets": {
            "jwt": DEFAULT_JWT_SECRET,
            "jwtExpireSecs": 86400
        }
    })
}

/// Deep merge `overlay` into `base`. Objects merge key by key; any other overlay value replaces
/// the base value. `null` in the overlay leaves the base untouched.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        if !value.is_null() {
                            base_map.insert(key, value);
                        }
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Resolve configuration from an environment lookup (`NODE_ENV`, `PORT`, overlay variables).
pub fn resolve<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Environment::from_name(lookup("NODE_ENV").as_deref());
    let port = parse_port(lookup("PORT").as_deref());

    let mut settings = base_settings(port);
    merge(&mut settings, overlay(env, &lookup));
    merge(&mut settings, json!({ "env": env }));

    let config: ServerConfig = serde_json::from_value(settings)?;
    tracing::debug!(env = env.as_str(), port = config.port, "configuration resolved");
    Ok(config)
}

/// Resolve configuration from the process environment.
pub fn from_env() -> Result<ServerConfig, ConfigError> {
    resolve(|key| std::env::var(key).ok())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        from_env()
    }
}
