use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("Database unreachable: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const SSL_MODES: &[&str] = &["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

/// Builds the application connection pool from DSN components.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a bounded pool and verify one connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = Self::connection_url(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url.as_str())
            .await
            .map_err(|e| match e {
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
                    DatabaseError::ConnectionError(e.to_string())
                }
                other => DatabaseError::Sqlx(other),
            })?;

        info!(
            "Created database pool for {}@{}:{}/{} (max {} connections)",
            config.user, config.host, config.port, config.name, config.max_connections
        );
        Ok(pool)
    }

    /// Compose the postgres URL. Credentials are percent-encoded by `url`.
    pub fn connection_url(config: &DatabaseConfig) -> Result<url::Url, DatabaseError> {
        if !SSL_MODES.contains(&config.ssl_mode.as_str()) {
            return Err(DatabaseError::InvalidConfig(format!("unknown ssl_mode '{}'", config.ssl_mode)));
        }

        let mut url = url::Url::parse(&format!("postgres://{}:{}", config.host, config.port))
            .map_err(|e| DatabaseError::InvalidConfig(format!("host/port: {}", e)))?;
        url.set_username(&config.user)
            .map_err(|_| DatabaseError::InvalidConfig("user".into()))?;
        if !config.password.is_empty() {
            url.set_password(Some(&config.password))
                .map_err(|_| DatabaseError::InvalidConfig("password".into()))?;
        }
        url.set_path(&format!("/{}", config.name));
        url.query_pairs_mut().append_pair("sslmode", &config.ssl_mode);
        Ok(url)
    }

    /// Close the pool on shutdown
    pub async fn close(pool: &PgPool) {
        pool.close().await;
        info!("Closed database pool");
    }
}
