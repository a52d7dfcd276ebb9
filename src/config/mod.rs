use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_FILE_ENV: &str = "FLIGHTHOURS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub idp: IdpConfig,
    pub messages: MessagesConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// One of disable, allow, prefer, require, verify-ca, verify-full.
    pub ssl_mode: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpConfig {
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub admin_user: String,
    pub admin_password: String,
    pub admin_client_id: String,
    pub token_safety_margin_secs: u64,
    pub startup_timeout_secs: u64,
    pub send_verification_email: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_path: String,
    pub request_timeout_secs: u64,
    pub compensation_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "flighthours".to_string(),
            user: "flighthours".to_string(),
            password: String::new(),
            ssl_mode: "disable".to_string(),
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            realm: "flighthours".to_string(),
            client_id: "flighthours-api".to_string(),
            client_secret: String::new(),
            admin_user: "admin".to_string(),
            admin_password: String::new(),
            admin_client_id: "admin-cli".to_string(),
            token_safety_margin_secs: 30,
            startup_timeout_secs: 120,
            send_verification_email: true,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self { refresh_interval_secs: 300 }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: "/flighthours/api/v1".to_string(),
            request_timeout_secs: 30,
            compensation_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Resolve the configuration: environment preset, then the optional YAML
    /// file named by `FLIGHTHOURS_CONFIG`, then individual env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::preset(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Preset for the environment named by `APP_ENV`.
    pub fn preset() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Parse a YAML file. Keys it omits take development defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    fn with_env_overrides(mut self) -> Self {
        // Identity provider overrides
        if let Ok(v) = env::var("KEYCLOAK_SERVER_URL") {
            self.idp.server_url = v;
        }
        if let Ok(v) = env::var("KEYCLOAK_REALM") {
            self.idp.realm = v;
        }
        if let Ok(v) = env::var("KEYCLOAK_CLIENT_ID") {
            self.idp.client_id = v;
        }
        if let Ok(v) = env::var("KEYCLOAK_CLIENT_SECRET") {
            self.idp.client_secret = v;
        }
        if let Ok(v) = env::var("KEYCLOAK_ADMIN") {
            self.idp.admin_user = v;
        }
        if let Ok(v) = env::var("KEYCLOAK_ADMIN_PASSWORD") {
            self.idp.admin_password = v;
        }
        if let Ok(v) = env::var("KEYCLOAK_ADMIN_CLIENT_ID") {
            self.idp.admin_client_id = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DB_HOST") {
            self.database.host = v;
        }
        if let Ok(v) = env::var("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Ok(v) = env::var("DB_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DB_USER") {
            self.database.user = v;
        }
        if let Ok(v) = env::var("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Ok(v) = env::var("DB_SSL_MODE") {
            self.database.ssl_mode = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Messages and API overrides
        if let Ok(v) = env::var("MESSAGES_REFRESH_INTERVAL_SECS") {
            self.messages.refresh_interval_secs = v.parse().unwrap_or(self.messages.refresh_interval_secs);
        }
        if let Ok(v) = env::var("API_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.idp.server_url)
            .map_err(|e| ConfigError::Invalid(format!("idp.server_url: {}", e)))?;
        if self.idp.realm.is_empty() {
            return Err(ConfigError::Invalid("idp.realm must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        if !self.api.base_path.is_empty() && !self.api.base_path.starts_with('/') {
            return Err(ConfigError::Invalid("api.base_path must start with '/'".into()));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Copy with secrets replaced, safe to print.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        for secret in [
            &mut copy.database.password,
            &mut copy.idp.client_secret,
            &mut copy.idp.admin_password,
        ] {
            if !secret.is_empty() {
                *secret = "********".to_string();
            }
        }
        copy
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            idp: IdpConfig::default(),
            messages: MessagesConfig::default(),
            api: ApiConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                ssl_mode: "require".to_string(),
                max_connections: 20,
                connection_timeout: 10,
                ..DatabaseConfig::default()
            },
            messages: MessagesConfig { refresh_interval_secs: 120 },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                ssl_mode: "require".to_string(),
                max_connections: 50,
                connection_timeout: 5,
                ..DatabaseConfig::default()
            },
            api: ApiConfig {
                request_timeout_secs: 15,
                ..ApiConfig::default()
            },
            messages: MessagesConfig { refresh_interval_secs: 60 },
            ..Self::development()
        }
    }
}

impl IdpConfig {
    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl MessagesConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn compensation_timeout(&self) -> Duration {
        Duration::from_secs(self.compensation_timeout_secs)
    }
}

// Global config, resolved once by the binary at startup
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

pub fn init() -> Result<&'static AppConfig, ConfigError> {
    CONFIG.get_or_try_init(AppConfig::load)
}
