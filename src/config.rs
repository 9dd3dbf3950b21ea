use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::routes::DEFAULT_MAX_BODY_BYTES;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origin allowed to call the API from a browser, or `*`
    pub allowed_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub realm: String,
    /// Kept as a list of entries so usernames survive case-folding of map keys
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

impl UserEntry {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "http://localhost:8090".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            realm: "entity-coll".to_string(),
            users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// username → password; a later entry for the same username wins
    pub fn user_table(&self) -> HashMap<String, String> {
        self.users
            .iter()
            .map(|user| (user.username.clone(), user.password.clone()))
            .collect()
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(config::File::with_name("config").required(false))
    }

    /// Layer defaults, then `file`, then `ENTITYCOLL_*` environment variables
    pub fn load_from<S>(file: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(file);

        // Environment variables, e.g. ENTITYCOLL_SERVER__PORT=9000
        config = config.add_source(
            config::Environment::with_prefix("ENTITYCOLL")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
