//! Typed server configuration, deserialized from the merged settings object.

use serde::{Deserialize, Serialize};

/// Execution environment, selected by `NODE_ENV`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// `development`/`dev`, `production`/`prod`, `test`/`testing`. Anything else is production.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("development") | Some("dev") => Environment::Development,
            Some("test") | Some("testing") => Environment::Test,
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Production,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Environment::Test)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub env: Environment,
    /// The port the server listens on.
    pub port: u16,
    /// Default tracing level for this crate when `RUST_LOG` is unset.
    pub log_level: String,
    pub database: DatabaseSettings,
    pub database_options: DatabaseOptions,
    pub secrets: Secrets,
}

impl ServerConfig {
    /// Connection URL without credentials; user, password and database name travel as options.
    pub fn database_url(&self) -> String {
        format!("postgres://{}:{}", self.database.host, self.database.port)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub db_name: String,
}

/// Options shared by the connector and the SQL layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseOptions {
    pub dialect: String,
    pub pool: PoolOptions,
    /// Quote table and column identifiers in generated SQL.
    pub quote_identifiers: bool,
    /// Defaults applied to every model definition.
    pub define: ModelDefaults,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolOptions {
    pub max: u32,
    pub min: u32,
    /// Idle timeout in milliseconds.
    pub idle: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefaults {
    /// Store camelCase attributes in snake_case columns.
    pub underscored: bool,
    pub default_scope: DefaultScope,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultScope {
    pub attributes: AttributeFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ModelDefaults {
    /// Whether the default scope hides this attribute from reads.
    pub fn excludes(&self, attribute: &str) -> bool {
        self.default_scope
            .attributes
            .exclude
            .iter()
            .any(|a| a == attribute)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secrets {
    pub jwt: String,
    pub jwt_expire_secs: i64,
}
