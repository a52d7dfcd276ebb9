use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Absolute point in time by which an outbound call must finish.
///
/// Created once at the request boundary and passed by value to every
/// database and identity-provider call made on behalf of that request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

/// Returned when the deadline passes before the wrapped future completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline elapsed")]
pub struct Elapsed;

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Drive `fut` to completion unless the deadline passes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Elapsed>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.0, fut).await.map_err(|_| Elapsed)
    }
}
