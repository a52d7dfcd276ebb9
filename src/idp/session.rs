use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{AdminLogin, IdpError};
use crate::deadline::Deadline;

/// Fresh administrative credential returned by an admin login.
#[derive(Debug, Clone)]
pub struct AdminToken {
    pub access_token: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn usable(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}

/// Shared administrative session for the identity provider.
///
/// Readers take the shared guard and return the cached token while it is
/// valid for at least `margin`. Only one writer logs in again once it
/// expires; everyone queued behind it re-checks and reuses the new token.
pub struct AdminSession<L> {
    login: L,
    margin: Duration,
    state: RwLock<Option<CachedToken>>,
}

impl<L: AdminLogin> AdminSession<L> {
    pub fn new(login: L, margin: Duration) -> Self {
        Self {
            login,
            margin,
            state: RwLock::new(None),
        }
    }

    /// Log in once at startup, bounded by `timeout`.
    pub async fn start(&self, timeout: Duration) -> Result<(), IdpError> {
        self.ensure_valid(Deadline::after(timeout)).await.map(|_| ())
    }

    /// Return a bearer token valid for at least the safety margin.
    pub async fn ensure_valid(&self, deadline: Deadline) -> Result<String, IdpError> {
        {
            let state = self.state.read().await;
            if let Some(token) = state.as_ref().filter(|t| t.usable(self.margin)) {
                return Ok(token.access_token.clone());
            }
        }

        let mut state = deadline
            .run(self.state.write())
            .await
            .map_err(|_| IdpError::Unavailable("timed out waiting for admin session".into()))?;

        // Another task may have refreshed while we waited for the write guard.
        if let Some(token) = state.as_ref().filter(|t| t.usable(self.margin)) {
            return Ok(token.access_token.clone());
        }

        debug!("admin session stale, logging in");
        let fresh = match deadline.run(self.login.admin_login(deadline)).await {
            Ok(Ok(token)) => token,
            Ok(Err(IdpError::Unavailable(reason))) => return Err(IdpError::Unavailable(reason)),
            Ok(Err(e)) => {
                warn!("admin login failed: {}", e);
                return Err(IdpError::Unavailable(e.to_string()));
            }
            Err(_) => {
                warn!("admin login exceeded its deadline");
                return Err(IdpError::Unavailable("admin login timed out".into()));
            }
        };

        if fresh.expires_in <= self.margin {
            warn!(
                "admin token lifetime {:?} does not exceed safety margin {:?}",
                fresh.expires_in, self.margin
            );
        }

        let access_token = fresh.access_token.clone();
        *state = Some(CachedToken {
            access_token: fresh.access_token,
            expires_at: Instant::now() + fresh.expires_in,
        });
        info!("admin session refreshed, valid for {:?}", fresh.expires_in);
        Ok(access_token)
    }

    /// Drop the cached token after the server rejected `rejected`, so the next
    /// call logs in again. A token another task already replaced stays.
    pub async fn invalidate(&self, rejected: &str) {
        let mut state = self.state.write().await;
        if state.as_ref().is_some_and(|t| t.access_token == rejected) {
            *state = None;
        } else {
            debug!("rejected admin token already replaced");
        }
    }
}
