use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgEmployeeStore};
use crate::deadline::Deadline;
use crate::idp::KeycloakClient;

/// Live connections to the database and the identity provider.
pub struct Runtime {
    pub pool: PgPool,
    pub store: Arc<PgEmployeeStore>,
    pub idp: Arc<KeycloakClient>,
}

impl Runtime {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to the database")?;

        let prepare_deadline = Deadline::after(Duration::from_secs(config.database.connection_timeout));
        let store = PgEmployeeStore::new(pool.clone(), prepare_deadline)
            .await
            .context("failed to prepare employee statements")?;

        let idp = KeycloakClient::new(&config.idp).context("invalid identity provider settings")?;
        idp.start()
            .await
            .context("failed to open the identity provider admin session")?;

        Ok(Self {
            pool,
            store: Arc::new(store),
            idp: Arc::new(idp),
        })
    }
}
