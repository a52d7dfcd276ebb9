use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Duration;

use crate::deadline::Deadline;

/// Start the request clock. Handlers read the `Deadline` extension and pass it
/// to every outbound call.
pub async fn deadline_middleware(
    State(timeout): State<Duration>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(Deadline::after(timeout));
    next.run(request).await
}
