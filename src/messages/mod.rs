//! Parameterised message catalog backing every response envelope.

pub mod cache;
pub mod codes;
pub mod render;
pub mod status;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::deadline::Deadline;

pub use cache::MessageCache;
pub use render::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Error,
    Success,
    Warning,
    Info,
    Debug,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Error => "error",
            MessageType::Success => "success",
            MessageType::Warning => "warning",
            MessageType::Info => "info",
            MessageType::Debug => "debug",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(MessageType::Error),
            "success" => Ok(MessageType::Success),
            "warning" => Ok(MessageType::Warning),
            "info" => Ok(MessageType::Info),
            "debug" => Ok(MessageType::Debug),
            other => Err(MessageError::InvalidType(other.to_string())),
        }
    }
}

/// One catalog entry. `content` may contain `${0}`, `${1}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedMessage {
    pub id: String,
    pub code: String,
    pub message_type: MessageType,
    pub category: String,
    pub module: String,
    pub title: String,
    pub content: String,
    pub active: bool,
}

/// Rendered message ready for an envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub code: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unknown message type '{0}'")]
    InvalidType(String),

    #[error("message origin unavailable: {0}")]
    Origin(String),

    #[error("message origin timed out")]
    Timeout,
}

impl From<sqlx::Error> for MessageError {
    fn from(err: sqlx::Error) -> Self {
        MessageError::Origin(err.to_string())
    }
}

/// Where catalog entries come from.
#[async_trait]
pub trait MessageOrigin: Send + Sync {
    /// Every active message, for bulk load and refresh.
    async fn fetch_active(&self, deadline: Deadline) -> Result<Vec<CachedMessage>, MessageError>;

    /// A single message by code regardless of its active flag.
    async fn fetch_by_code(&self, deadline: Deadline, code: &str) -> Result<Option<CachedMessage>, MessageError>;
}
