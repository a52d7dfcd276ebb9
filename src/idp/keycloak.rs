use async_trait::async_trait;
use reqwest::{header::LOCATION, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::session::{AdminSession, AdminToken};
use super::{AdminLogin, IdpAdmin, IdpError, IdpUser, IdpUserAuth, UserToken, EMPLOYEE_ID_ATTRIBUTE};
use crate::config::IdpConfig;
use crate::deadline::Deadline;
use crate::domain::Employee;

/// Realm role as exchanged with the role-mapping endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleRepresentation {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    composite: bool,
    #[serde(default)]
    client_role: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    container_id: Option<String>,
}

/// Error body of the OpenID Connect token endpoint.
#[derive(Debug, Default, Deserialize)]
struct OAuthError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl OAuthError {
    fn classify(&self) -> IdpError {
        let description = self.error_description.to_ascii_lowercase();
        if self.error == "invalid_grant" && (description.contains("not active") || description.contains("expired")) {
            IdpError::TokenExpired
        } else {
            IdpError::InvalidToken
        }
    }
}

/// Admin-scoped request and the session token it presents.
struct AdminRequest {
    request: RequestBuilder,
    token: String,
}

impl AdminRequest {
    fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.request = self.request.json(body);
        self
    }
}

/// Password-grant login with the configured admin account.
pub struct AdminCredentials {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    username: String,
    password: String,
}

#[async_trait]
impl AdminLogin for AdminCredentials {
    async fn admin_login(&self, deadline: Deadline) -> Result<AdminToken, IdpError> {
        let request = self.http.post(self.token_url.clone()).form(&[
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ]);
        let response = execute(deadline, request).await?;
        match response.status() {
            s if s.is_success() => {
                let token: UserToken = read_json(deadline, response).await?;
                Ok(AdminToken {
                    access_token: token.access_token,
                    expires_in: Duration::from_secs(token.expires_in),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(IdpError::AuthFailed),
            s => Err(unexpected("admin login", s)),
        }
    }
}

/// Keycloak admin and token API client.
pub struct KeycloakClient {
    http: reqwest::Client,
    server: Url,
    realm: String,
    client_id: String,
    client_secret: String,
    startup_timeout: Duration,
    session: AdminSession<AdminCredentials>,
}

impl KeycloakClient {
    pub fn new(config: &IdpConfig) -> Result<Self, IdpError> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()?;
        let server = Url::parse(&config.server_url)
            .map_err(|e| IdpError::Unavailable(format!("invalid server url: {}", e)))?;
        let token_url = realm_url(&server, &config.realm, &["protocol", "openid-connect", "token"])?;

        let credentials = AdminCredentials {
            http: http.clone(),
            token_url,
            client_id: config.admin_client_id.clone(),
            username: config.admin_user.clone(),
            password: config.admin_password.clone(),
        };

        Ok(Self {
            http,
            server,
            realm: config.realm.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            startup_timeout: config.startup_timeout(),
            session: AdminSession::new(credentials, config.token_safety_margin()),
        })
    }

    /// Obtain the first admin token, bounded by the startup timeout.
    pub async fn start(&self) -> Result<(), IdpError> {
        self.session.start(self.startup_timeout).await?;
        info!("identity provider admin session established for realm {}", self.realm);
        Ok(())
    }

    fn admin_url(&self, segments: &[&str]) -> Result<Url, IdpError> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| IdpError::Unavailable("server url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["admin", "realms", self.realm.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn openid_url(&self, endpoint: &str) -> Result<Url, IdpError> {
        realm_url(&self.server, &self.realm, &["protocol", "openid-connect", endpoint])
    }

    /// Admin-scoped request carrying a valid session token.
    async fn admin(&self, deadline: Deadline, method: Method, url: Url) -> Result<AdminRequest, IdpError> {
        let token = self.session.ensure_valid(deadline).await?;
        Ok(AdminRequest {
            request: self.http.request(method, url).bearer_auth(&token),
            token,
        })
    }

    async fn send_admin(&self, deadline: Deadline, admin: AdminRequest) -> Result<Response, IdpError> {
        let response = execute(deadline, admin.request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // Token revoked server side; next call logs in again.
            self.session.invalidate(&admin.token).await;
        }
        Ok(response)
    }

    fn client_form<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![("client_id", self.client_id.as_str())];
        if !self.client_secret.is_empty() {
            form.push(("client_secret", self.client_secret.as_str()));
        }
        form.extend_from_slice(extra);
        form
    }

    async fn realm_role(&self, deadline: Deadline, role: &str) -> Result<RoleRepresentation, IdpError> {
        let url = self.admin_url(&["roles", role])?;
        let response = self.send_admin(deadline, self.admin(deadline, Method::GET, url).await?).await?;
        match response.status() {
            s if s.is_success() => read_json(deadline, response).await,
            StatusCode::NOT_FOUND => Err(IdpError::RoleNotFound(role.to_string())),
            s => Err(unexpected("get role", s)),
        }
    }
}

#[async_trait]
impl IdpAdmin for KeycloakClient {
    async fn create_user(&self, deadline: Deadline, employee: &Employee) -> Result<String, IdpError> {
        let (first_name, last_name) = match employee.name.trim().split_once(' ') {
            Some((first, last)) => (first, last.trim()),
            None => (employee.name.trim(), ""),
        };
        let body = json!({
            "username": employee.email,
            "email": employee.email,
            "firstName": first_name,
            "lastName": last_name,
            "enabled": true,
            "emailVerified": false,
            "attributes": {
                EMPLOYEE_ID_ATTRIBUTE: [employee.id.to_string()],
                "airline": [employee.airline],
            },
        });

        let url = self.admin_url(&["users"])?;
        let request = self.admin(deadline, Method::POST, url).await?.json(&body);
        let response = self.send_admin(deadline, request).await?;
        match response.status() {
            StatusCode::CREATED => {
                let user_id = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| IdpError::InvalidResponse("create user returned no Location".into()))?;
                debug!("created identity provider user {}", user_id);
                Ok(user_id)
            }
            StatusCode::CONFLICT => Err(IdpError::DuplicateUser),
            s => Err(unexpected("create user", s)),
        }
    }

    async fn get_user_by_email(&self, deadline: Deadline, email: &str) -> Result<IdpUser, IdpError> {
        let mut url = self.admin_url(&["users"])?;
        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("exact", "true");
        let response = self.send_admin(deadline, self.admin(deadline, Method::GET, url).await?).await?;
        if !response.status().is_success() {
            return Err(unexpected("find user by email", response.status()));
        }
        let users: Vec<IdpUser> = read_json(deadline, response).await?;
        users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or(IdpError::NotFound)
    }

    async fn get_user_by_id(&self, deadline: Deadline, user_id: &str) -> Result<IdpUser, IdpError> {
        let url = self.admin_url(&["users", user_id])?;
        let response = self.send_admin(deadline, self.admin(deadline, Method::GET, url).await?).await?;
        match response.status() {
            s if s.is_success() => read_json(deadline, response).await,
            StatusCode::NOT_FOUND => Err(IdpError::NotFound),
            s => Err(unexpected("get user", s)),
        }
    }

    async fn delete_user(&self, deadline: Deadline, user_id: &str) -> Result<(), IdpError> {
        let url = self.admin_url(&["users", user_id])?;
        let response = self.send_admin(deadline, self.admin(deadline, Method::DELETE, url).await?).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(IdpError::NotFound),
            s => Err(unexpected("delete user", s)),
        }
    }

    async fn set_password(
        &self,
        deadline: Deadline,
        user_id: &str,
        password: &str,
        temporary: bool,
    ) -> Result<(), IdpError> {
        let url = self.admin_url(&["users", user_id, "reset-password"])?;
        let body = json!({ "type": "password", "value": password, "temporary": temporary });
        let request = self.admin(deadline, Method::PUT, url).await?.json(&body);
        let response = self.send_admin(deadline, request).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(IdpError::NotFound),
            s => Err(unexpected("set password", s)),
        }
    }

    async fn assign_role(&self, deadline: Deadline, user_id: &str, role: &str) -> Result<(), IdpError> {
        let role = self.realm_role(deadline, role).await?;
        let url = self.admin_url(&["users", user_id, "role-mappings", "realm"])?;
        let request = self.admin(deadline, Method::POST, url).await?.json(&[role]);
        let response = self.send_admin(deadline, request).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(IdpError::NotFound),
            s => Err(unexpected("assign role", s)),
        }
    }

    async fn send_action_email(
        &self,
        deadline: Deadline,
        user_id: &str,
        actions: &[&str],
        lifespan: Duration,
    ) -> Result<(), IdpError> {
        let mut url = self.admin_url(&["users", user_id, "execute-actions-email"])?;
        url.query_pairs_mut()
            .append_pair("lifespan", &lifespan.as_secs().to_string());
        let request = self.admin(deadline, Method::PUT, url).await?.json(actions);
        let response = self.send_admin(deadline, request).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(IdpError::NotFound),
            s => Err(unexpected("execute actions email", s)),
        }
    }
}

#[async_trait]
impl IdpUserAuth for KeycloakClient {
    async fn user_login(&self, deadline: Deadline, email: &str, password: &str) -> Result<UserToken, IdpError> {
        let form = self.client_form(&[
            ("grant_type", "password"),
            ("username", email),
            ("password", password),
            ("scope", "openid"),
        ]);
        let request = self.http.post(self.openid_url("token")?).form(&form);
        let response = execute(deadline, request).await?;
        match response.status() {
            s if s.is_success() => read_json(deadline, response).await,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(IdpError::AuthFailed),
            s => Err(unexpected("user login", s)),
        }
    }

    async fn refresh_user_token(&self, deadline: Deadline, refresh_token: &str) -> Result<UserToken, IdpError> {
        let form = self.client_form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)]);
        let request = self.http.post(self.openid_url("token")?).form(&form);
        let response = execute(deadline, request).await?;
        match response.status() {
            s if s.is_success() => read_json(deadline, response).await,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let body: OAuthError = read_json(deadline, response).await.unwrap_or_default();
                Err(body.classify())
            }
            s => Err(unexpected("refresh token", s)),
        }
    }

    async fn logout(&self, deadline: Deadline, refresh_token: &str) -> Result<(), IdpError> {
        let form = self.client_form(&[("refresh_token", refresh_token)]);
        let request = self.http.post(self.openid_url("logout")?).form(&form);
        let response = execute(deadline, request).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(IdpError::InvalidToken),
            s => Err(unexpected("logout", s)),
        }
    }
}

fn realm_url(server: &Url, realm: &str, segments: &[&str]) -> Result<Url, IdpError> {
    let mut url = server.clone();
    url.path_segments_mut()
        .map_err(|_| IdpError::Unavailable("server url cannot be a base".into()))?
        .pop_if_empty()
        .extend(["realms", realm])
        .extend(segments);
    Ok(url)
}

async fn execute(deadline: Deadline, request: RequestBuilder) -> Result<Response, IdpError> {
    deadline
        .run(request.send())
        .await
        .map_err(|_| IdpError::Timeout)?
        .map_err(transport)
}

async fn read_json<T: DeserializeOwned>(deadline: Deadline, response: Response) -> Result<T, IdpError> {
    deadline
        .run(response.json::<T>())
        .await
        .map_err(|_| IdpError::Timeout)?
        .map_err(|e| IdpError::InvalidResponse(e.to_string()))
}

fn transport(err: reqwest::Error) -> IdpError {
    if err.is_connect() || err.is_timeout() {
        IdpError::Unavailable(err.to_string())
    } else {
        IdpError::Transport(err)
    }
}

fn unexpected(operation: &'static str, status: StatusCode) -> IdpError {
    if status.is_server_error() {
        IdpError::Unavailable(format!("{} returned {}", operation, status))
    } else {
        IdpError::Rejected { operation, status: status.as_u16() }
    }
}
