use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::warn;

use crate::deadline::Deadline;
use crate::messages::{CachedMessage, MessageError, MessageOrigin, MessageType};

const SELECT_ACTIVE: &str = "SELECT id::text AS id, message_code, type, category, module, message_title, \
    message_content, is_active FROM system_messages WHERE is_active = true";

const SELECT_BY_CODE: &str = "SELECT id::text AS id, message_code, type, category, module, message_title, \
    message_content, is_active FROM system_messages WHERE message_code = $1 LIMIT 1";

#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    message_code: String,
    #[sqlx(rename = "type")]
    message_type: String,
    category: String,
    module: String,
    message_title: String,
    message_content: String,
    is_active: bool,
}

impl From<MessageRow> for CachedMessage {
    fn from(row: MessageRow) -> Self {
        let message_type = row.message_type.parse().unwrap_or_else(|_| {
            warn!("message {} has unknown type '{}', treating as info", row.message_code, row.message_type);
            MessageType::Info
        });
        CachedMessage {
            id: row.id,
            code: row.message_code,
            message_type,
            category: row.category,
            module: row.module,
            title: row.message_title,
            content: row.message_content,
            active: row.is_active,
        }
    }
}

/// Reads the `system_messages` table for the message cache.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageOrigin for PgMessageRepository {
    async fn fetch_active(&self, deadline: Deadline) -> Result<Vec<CachedMessage>, MessageError> {
        let rows = deadline
            .run(sqlx::query_as::<_, MessageRow>(SELECT_ACTIVE).fetch_all(&self.pool))
            .await
            .map_err(|_| MessageError::Timeout)??;
        Ok(rows.into_iter().map(CachedMessage::from).collect())
    }

    async fn fetch_by_code(&self, deadline: Deadline, code: &str) -> Result<Option<CachedMessage>, MessageError> {
        let row = deadline
            .run(sqlx::query_as::<_, MessageRow>(SELECT_BY_CODE).bind(code).fetch_optional(&self.pool))
            .await
            .map_err(|_| MessageError::Timeout)??;
        Ok(row.map(CachedMessage::from))
    }
}
