use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::database::StoreError;
use crate::deadline::Deadline;
use crate::error::DomainError;
use crate::idp::IdpError;
use crate::messages::status::mapped_status;
use crate::messages::MessageCache;

const UNKNOWN_ERROR: &str = "Unknown error";
const OPERATION_SUCCESSFUL: &str = "Operation successful";

/// Body of every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Builds envelopes from message codes, resolving text and status through the
/// message catalog.
pub struct ResponseHandler {
    messages: Arc<MessageCache>,
}

impl ResponseHandler {
    pub fn new(messages: Arc<MessageCache>) -> Self {
        Self { messages }
    }

    async fn resolve(
        &self,
        deadline: Deadline,
        code: &str,
        params: &[String],
        fallback_text: &str,
        fallback_status: u16,
    ) -> (StatusCode, String) {
        let (status, text) = match self.messages.get_response(deadline, code, params).await {
            Some(message) => (self.messages.http_status(deadline, code).await, message.content),
            None => {
                tracing::warn!("no catalog entry for message code {}", code);
                (mapped_status(code).unwrap_or(fallback_status), fallback_text.to_string())
            }
        };
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, text)
    }

    pub async fn error(&self, deadline: Deadline, err: &DomainError) -> (StatusCode, Envelope) {
        self.error_with_data(deadline, err, None).await
    }

    pub async fn error_with_data(
        &self,
        deadline: Deadline,
        err: &DomainError,
        data: Option<Value>,
    ) -> (StatusCode, Envelope) {
        let code = err.message_code();
        let (status, message) = self
            .resolve(deadline, code, &err.params(), UNKNOWN_ERROR, 500)
            .await;
        (
            status,
            Envelope {
                success: false,
                code: Some(code.to_string()),
                message: Some(message),
                data,
            },
        )
    }

    pub async fn success(&self, deadline: Deadline, code: &str) -> (StatusCode, Envelope) {
        self.success_with_data(deadline, code, None).await
    }

    pub async fn success_with_data(
        &self,
        deadline: Deadline,
        code: &str,
        data: Option<Value>,
    ) -> (StatusCode, Envelope) {
        let (status, message) = self
            .resolve(deadline, code, &[], OPERATION_SUCCESSFUL, 200)
            .await;
        (
            status,
            Envelope {
                success: true,
                code: Some(code.to_string()),
                message: Some(message),
                data,
            },
        )
    }

    /// Successful outcome the caller should notice.
    pub async fn warning(&self, deadline: Deadline, code: &str, params: &[String]) -> (StatusCode, Envelope) {
        let (status, message) = self
            .resolve(deadline, code, params, OPERATION_SUCCESSFUL, 200)
            .await;
        (
            status,
            Envelope {
                success: true,
                code: Some(code.to_string()),
                message: Some(message),
                data: None,
            },
        )
    }

    pub fn data_only(&self, data: Value) -> (StatusCode, Envelope) {
        (
            StatusCode::OK,
            Envelope {
                success: true,
                code: None,
                message: None,
                data: Some(data),
            },
        )
    }

    async fn render(&self, deadline: Deadline, pending: PendingEnvelope) -> (StatusCode, Envelope) {
        match pending {
            PendingEnvelope::Failure(error) => self.error(deadline, &error).await,
            PendingEnvelope::Success { code, data } => self.success_with_data(deadline, code, data).await,
            PendingEnvelope::Warning { code, params } => self.warning(deadline, code, &params).await,
            PendingEnvelope::DataOnly(data) => self.data_only(data),
        }
    }
}

/// Handler outcome waiting for `envelope_middleware` to resolve its message.
#[derive(Debug, Clone)]
enum PendingEnvelope {
    Failure(Arc<DomainError>),
    Success { code: &'static str, data: Option<Value> },
    Warning { code: &'static str, params: Vec<String> },
    DataOnly(Value),
}

impl PendingEnvelope {
    fn into_response(self, status: StatusCode) -> Response {
        let mut response = status.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Successful handler result.
#[derive(Debug)]
pub struct ApiResponse {
    pending: PendingEnvelope,
}

impl ApiResponse {
    pub fn success(code: &'static str) -> Self {
        Self {
            pending: PendingEnvelope::Success { code, data: None },
        }
    }

    pub fn success_with_data<T: Serialize>(code: &'static str, data: T) -> Result<Self, ApiError> {
        let data = serde_json::to_value(data).map_err(|e| {
            tracing::error!("Failed to serialize response data: {}", e);
            ApiError(DomainError::Internal("response serialization".into()))
        })?;
        Ok(Self {
            pending: PendingEnvelope::Success { code, data: Some(data) },
        })
    }

    pub fn warning(code: &'static str, params: Vec<String>) -> Self {
        Self {
            pending: PendingEnvelope::Warning { code, params },
        }
    }

    pub fn data_only(data: Value) -> Self {
        Self {
            pending: PendingEnvelope::DataOnly(data),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        self.pending.into_response(StatusCode::OK)
    }
}

/// Failed handler result. Every error reaching the client goes through here.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err.into())
    }
}

impl From<IdpError> for ApiError {
    fn from(err: IdpError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        PendingEnvelope::Failure(Arc::new(self.0)).into_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub type ApiResult = Result<ApiResponse, ApiError>;

/// Replace pending handler outcomes with the rendered envelope.
///
/// A bare 405 from the router means the path exists but not for this method.
/// It is reported like any other unknown route.
pub async fn envelope_middleware(
    State(handler): State<Arc<ResponseHandler>>,
    request: Request,
    next: Next,
) -> Response {
    let deadline = request
        .extensions()
        .get::<Deadline>()
        .copied()
        .unwrap_or_else(|| Deadline::after(std::time::Duration::from_secs(5)));
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (mut parts, body) = next.run(request).await.into_parts();
    let pending = match parts.extensions.remove::<PendingEnvelope>() {
        Some(pending) => pending,
        None if parts.status == StatusCode::METHOD_NOT_ALLOWED => {
            tracing::warn!(%method, path = %path, "method not routed");
            PendingEnvelope::Failure(Arc::new(DomainError::RouteNotFound(path)))
        }
        None => return Response::from_parts(parts, body),
    };

    let (status, envelope) = handler.render(deadline, pending).await;
    let (rendered, body) = Json(envelope).into_response().into_parts();
    parts.status = status;
    parts.headers.extend(rendered.headers);
    Response::from_parts(parts, body)
}
