//! In-memory stand-ins for the database, the identity provider and the
//! message table, plus helpers for driving the router.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use flighthours_api::app::{router, AppState};
use flighthours_api::config::ApiConfig;
use flighthours_api::database::{EmployeeStore, StoreError};
use flighthours_api::deadline::Deadline;
use flighthours_api::domain::{Employee, NewEmployee};
use flighthours_api::idp::{IdpAdmin, IdpError, IdpUser, IdpUserAuth, UserToken, EMPLOYEE_ID_ATTRIBUTE};
use flighthours_api::messages::{codes, CachedMessage, MessageCache, MessageError, MessageOrigin, MessageType};
use flighthours_api::services::SagaSettings;

pub const BASE: &str = "/flighthours/api/v1";

pub fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(30))
}

pub fn new_employee(email: &str) -> NewEmployee {
    NewEmployee {
        name: "Ana Pilot".into(),
        airline: "air-1".into(),
        email: email.into(),
        password: "p".into(),
        identification_number: "123".into(),
        bp: "BP1".into(),
        start_date: None,
        end_date: None,
        active: true,
        role: "user".into(),
    }
}

pub fn employee(email: &str, remote_user_id: Option<&str>) -> Employee {
    let (mut employee, _) = new_employee(email).into_employee(Uuid::new_v4());
    employee.remote_user_id = remote_user_id.map(str::to_string);
    employee
}

// ---------------------------------------------------------------------------
// Employee store

enum Staged {
    Insert(Employee),
    Patch(Uuid, String),
}

pub struct FakeTx {
    staged: Vec<Staged>,
    finished: bool,
}

#[derive(Default)]
pub struct FakeStore {
    rows: Mutex<HashMap<Uuid, Employee>>,
    pub fail_begin: AtomicBool,
    pub fail_save: AtomicBool,
    pub fail_patch: AtomicBool,
    pub fail_commit: AtomicBool,
    /// commit persists the rows and then reports a timeout
    pub lose_commit_ack: AtomicBool,
    pub fail_ping: AtomicBool,
    pub rollbacks: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, employee: Employee) {
        self.rows.lock().unwrap().insert(employee.id, employee);
    }

    pub fn rows(&self) -> Vec<Employee> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }
}

fn injected(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

#[async_trait]
impl EmployeeStore for FakeStore {
    type Tx = FakeTx;

    async fn begin_tx(&self, _deadline: Deadline) -> Result<FakeTx, StoreError> {
        if injected(&self.fail_begin) {
            return Err(StoreError::Unavailable("injected begin failure".into()));
        }
        Ok(FakeTx { staged: Vec::new(), finished: false })
    }

    async fn save_in_tx(&self, _deadline: Deadline, tx: &mut FakeTx, employee: &Employee) -> Result<(), StoreError> {
        if injected(&self.fail_save) {
            return Err(StoreError::CannotSave("injected save failure".into()));
        }
        let duplicate = self
            .rows
            .lock()
            .unwrap()
            .values()
            .any(|e| e.email.eq_ignore_ascii_case(&employee.email));
        if duplicate {
            return Err(StoreError::DuplicateUser);
        }
        tx.staged.push(Staged::Insert(employee.clone()));
        Ok(())
    }

    async fn patch_remote_id_in_tx(
        &self,
        _deadline: Deadline,
        tx: &mut FakeTx,
        id: Uuid,
        remote_id: &str,
    ) -> Result<(), StoreError> {
        if injected(&self.fail_patch) {
            return Err(StoreError::CannotUpdate("injected patch failure".into()));
        }
        tx.staged.push(Staged::Patch(id, remote_id.to_string()));
        Ok(())
    }

    async fn commit(&self, _deadline: Deadline, tx: &mut FakeTx) -> Result<(), StoreError> {
        if tx.finished {
            return Err(StoreError::TxFinished);
        }
        tx.finished = true;
        if injected(&self.fail_commit) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        for op in tx.staged.drain(..) {
            match op {
                Staged::Insert(employee) => {
                    rows.insert(employee.id, employee);
                }
                Staged::Patch(id, remote_id) => {
                    if let Some(row) = rows.get_mut(&id) {
                        row.remote_user_id = Some(remote_id);
                    }
                }
            }
        }
        if injected(&self.lose_commit_ack) {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }

    async fn rollback(&self, _deadline: Deadline, tx: FakeTx) -> Result<(), StoreError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        if tx.finished {
            return Err(StoreError::TxFinished);
        }
        Ok(())
    }

    async fn get_by_email(&self, _deadline: Deadline, email: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_by_id(&self, _deadline: Deadline, id: Uuid) -> Result<Option<Employee>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_remote_id(&self, _deadline: Deadline, remote_id: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|e| e.remote_user_id.as_deref() == Some(remote_id))
            .cloned())
    }

    async fn ping(&self, _deadline: Deadline) -> Result<(), StoreError> {
        if injected(&self.fail_ping) {
            return Err(StoreError::Unavailable("injected ping failure".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Identity provider

pub struct FakeIdp {
    users: Mutex<HashMap<String, IdpUser>>,
    passwords: Mutex<HashMap<String, String>>,
    roles: Mutex<HashMap<String, Vec<String>>>,
    realm_roles: Vec<String>,
    next_id: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_set_password: AtomicBool,
    pub fail_assign_role: AtomicBool,
    pub fail_delete: AtomicBool,
    /// set_password never answers within a request deadline
    pub hang_set_password: AtomicBool,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub action_emails: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeIdp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            users: Mutex::new(HashMap::new()),
            passwords: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashMap::new()),
            realm_roles: vec!["user".into(), "pilot".into(), "admin".into()],
            next_id: AtomicUsize::new(1),
            fail_create: AtomicBool::new(false),
            fail_set_password: AtomicBool::new(false),
            fail_assign_role: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            hang_set_password: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            action_emails: Mutex::new(Vec::new()),
        })
    }

    /// Pre-existing user, optionally tagged with a local employee id.
    pub fn seed_user(&self, email: &str, employee_id: Option<&str>, verified: bool) -> String {
        let id = format!("kc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut attributes = HashMap::new();
        if let Some(employee_id) = employee_id {
            attributes.insert(EMPLOYEE_ID_ATTRIBUTE.to_string(), vec![employee_id.to_string()]);
        }
        let user = IdpUser {
            id: id.clone(),
            username: email.to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            enabled: true,
            email_verified: verified,
            attributes,
        };
        self.users.lock().unwrap().insert(id.clone(), user);
        id
    }

    pub fn set_user_password(&self, user_id: &str, password: &str) {
        self.passwords.lock().unwrap().insert(user_id.to_string(), password.to_string());
    }

    pub fn users(&self) -> Vec<IdpUser> {
        self.users.lock().unwrap().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn roles_of(&self, user_id: &str) -> Vec<String> {
        self.roles.lock().unwrap().get(user_id).cloned().unwrap_or_default()
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn find_by_email(&self, email: &str) -> Option<IdpUser> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn token_for(user: &IdpUser) -> UserToken {
        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "email_verified": user.email_verified,
            "exp": 4_102_444_800u64,
        });
        let access_token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"realm-key")).unwrap();
        UserToken {
            access_token,
            refresh_token: format!("refresh-{}", user.id),
            expires_in: 300,
            refresh_expires_in: 1800,
            token_type: "Bearer".into(),
        }
    }
}

#[async_trait]
impl IdpAdmin for FakeIdp {
    async fn create_user(&self, _deadline: Deadline, employee: &Employee) -> Result<String, IdpError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if injected(&self.fail_create) {
            return Err(IdpError::Unavailable("injected create failure".into()));
        }
        if self.find_by_email(&employee.email).is_some() {
            return Err(IdpError::DuplicateUser);
        }
        Ok(self.seed_user(&employee.email, Some(&employee.id.to_string()), false))
    }

    async fn get_user_by_email(&self, _deadline: Deadline, email: &str) -> Result<IdpUser, IdpError> {
        self.find_by_email(email).ok_or(IdpError::NotFound)
    }

    async fn get_user_by_id(&self, _deadline: Deadline, user_id: &str) -> Result<IdpUser, IdpError> {
        self.users.lock().unwrap().get(user_id).cloned().ok_or(IdpError::NotFound)
    }

    async fn delete_user(&self, _deadline: Deadline, user_id: &str) -> Result<(), IdpError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if injected(&self.fail_delete) {
            return Err(IdpError::Unavailable("injected delete failure".into()));
        }
        match self.users.lock().unwrap().remove(user_id) {
            Some(_) => Ok(()),
            None => Err(IdpError::NotFound),
        }
    }

    async fn set_password(
        &self,
        _deadline: Deadline,
        user_id: &str,
        password: &str,
        _temporary: bool,
    ) -> Result<(), IdpError> {
        if injected(&self.hang_set_password) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if injected(&self.fail_set_password) {
            return Err(IdpError::Rejected { operation: "set password", status: 400 });
        }
        self.set_user_password(user_id, password);
        Ok(())
    }

    async fn assign_role(&self, _deadline: Deadline, user_id: &str, role: &str) -> Result<(), IdpError> {
        if injected(&self.fail_assign_role) {
            return Err(IdpError::Unavailable("injected role failure".into()));
        }
        if !self.realm_roles.iter().any(|r| r == role) {
            return Err(IdpError::RoleNotFound(role.to_string()));
        }
        self.roles
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(role.to_string());
        Ok(())
    }

    async fn send_action_email(
        &self,
        _deadline: Deadline,
        user_id: &str,
        actions: &[&str],
        _lifespan: Duration,
    ) -> Result<(), IdpError> {
        if !self.users.lock().unwrap().contains_key(user_id) {
            return Err(IdpError::NotFound);
        }
        self.action_emails
            .lock()
            .unwrap()
            .push((user_id.to_string(), actions.iter().map(|a| a.to_string()).collect()));
        Ok(())
    }
}

#[async_trait]
impl IdpUserAuth for FakeIdp {
    async fn user_login(&self, _deadline: Deadline, email: &str, password: &str) -> Result<UserToken, IdpError> {
        let user = self.find_by_email(email).ok_or(IdpError::AuthFailed)?;
        let stored = self.passwords.lock().unwrap().get(&user.id).cloned();
        if stored.as_deref() != Some(password) {
            return Err(IdpError::AuthFailed);
        }
        Ok(Self::token_for(&user))
    }

    async fn refresh_user_token(&self, _deadline: Deadline, refresh_token: &str) -> Result<UserToken, IdpError> {
        if refresh_token == "expired" {
            return Err(IdpError::TokenExpired);
        }
        let user_id = refresh_token.strip_prefix("refresh-").ok_or(IdpError::InvalidToken)?;
        let user = self.users.lock().unwrap().get(user_id).cloned().ok_or(IdpError::InvalidToken)?;
        Ok(Self::token_for(&user))
    }

    async fn logout(&self, _deadline: Deadline, refresh_token: &str) -> Result<(), IdpError> {
        match refresh_token.strip_prefix("refresh-") {
            Some(_) => Ok(()),
            None => Err(IdpError::InvalidToken),
        }
    }
}

// ---------------------------------------------------------------------------
// Message table

pub fn message(code: &str, message_type: MessageType, content: &str) -> CachedMessage {
    CachedMessage {
        id: format!("msg-{}", code),
        code: code.to_string(),
        message_type,
        category: "test".into(),
        module: "test".into(),
        title: code.to_string(),
        content: content.to_string(),
        active: true,
    }
}

pub fn catalog() -> Vec<CachedMessage> {
    vec![
        message(codes::USER_REGISTERED, MessageType::Success, "Employee registered"),
        message(codes::USER_DUPLICATE, MessageType::Error, "Employee already exists"),
        message(codes::USER_CANNOT_SAVE, MessageType::Error, "Employee could not be saved"),
        message(codes::USER_EMAIL_NOT_FOUND, MessageType::Error, "No employee with that email"),
        message(codes::USER_EMAIL_NOT_VERIFIED, MessageType::Error, "Email not verified"),
        message(codes::USER_TOKEN_EXPIRED, MessageType::Error, "Token expired"),
        message(codes::VAL_FIELD_REQUIRED, MessageType::Error, "Field ${0} is required"),
        message(codes::VAL_FIELD_FORMAT, MessageType::Error, "Field ${0} is invalid"),
        message(codes::VAL_MULTIPLE, MessageType::Error, "Invalid fields: ${0}"),
        message(codes::VAL_JSON_INVALID, MessageType::Error, "Malformed JSON"),
        message(codes::VAL_START_AFTER_END, MessageType::Error, "start_date is after end_date"),
        message(codes::VAL_DATE_FORMAT, MessageType::Error, "Field ${0} is not a date"),
        message(codes::KC_INVALID_TOKEN, MessageType::Error, "Invalid token"),
        message(codes::KC_LOGIN_SUCCESS, MessageType::Success, "Logged in"),
        message(codes::KC_VERIF_EMAIL_SENT, MessageType::Success, "Verification email sent"),
        message(codes::KC_PWD_RESET_SENT, MessageType::Success, "Password reset email sent"),
        message(codes::KC_EMAIL_ALREADY_VERIFIED, MessageType::Warning, "${0} is already verified"),
        message(codes::ROUTE_NOT_FOUND, MessageType::Error, "No route for ${0}"),
        message(codes::ROLE_NOT_FOUND, MessageType::Error, "Role ${0} not found"),
        message(codes::INFRA_IDP_UNAVAILABLE, MessageType::Error, "Identity provider unavailable"),
        message(codes::INFRA_DB_UNAVAILABLE, MessageType::Error, "Database unavailable"),
        message(codes::INFRA_DEPENDENCY_FAILED, MessageType::Error, "Dependency failed"),
        message(
            codes::INFRA_INCOMPLETE_REGISTRATION,
            MessageType::Error,
            "Registration incomplete, contact operations",
        ),
        message(codes::GEN_SERVER_ERROR, MessageType::Error, "Internal error"),
        message(codes::GEN_UNAUTHORIZED, MessageType::Error, "Invalid credentials"),
        message(codes::GEN_FORBIDDEN, MessageType::Error, "Forbidden"),
        message(codes::GEN_TIMEOUT, MessageType::Error, "Request timed out"),
        message(codes::GEN_OPERATION_OK, MessageType::Success, "Operation successful"),
    ]
}

pub struct FakeOrigin {
    rows: Mutex<Vec<CachedMessage>>,
    pub bulk_calls: AtomicUsize,
    pub by_code_calls: AtomicUsize,
    pub lookup_delay: Mutex<Option<Duration>>,
}

impl FakeOrigin {
    pub fn new(rows: Vec<CachedMessage>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            bulk_calls: AtomicUsize::new(0),
            by_code_calls: AtomicUsize::new(0),
            lookup_delay: Mutex::new(None),
        })
    }

    pub fn replace(&self, rows: Vec<CachedMessage>) {
        *self.rows.lock().unwrap() = rows;
    }
}

#[async_trait]
impl MessageOrigin for FakeOrigin {
    async fn fetch_active(&self, _deadline: Deadline) -> Result<Vec<CachedMessage>, MessageError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().iter().filter(|m| m.active).cloned().collect())
    }

    async fn fetch_by_code(&self, _deadline: Deadline, code: &str) -> Result<Option<CachedMessage>, MessageError> {
        self.by_code_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.rows.lock().unwrap().iter().find(|m| m.code == code).cloned())
    }
}

// ---------------------------------------------------------------------------
// Router

pub struct TestApp {
    pub router: Router,
    pub store: Arc<FakeStore>,
    pub idp: Arc<FakeIdp>,
}

pub async fn test_app() -> Result<TestApp> {
    test_app_with(SagaSettings::default()).await
}

pub async fn test_app_with(settings: SagaSettings) -> Result<TestApp> {
    let store = FakeStore::new();
    let idp = FakeIdp::new();
    let messages = Arc::new(MessageCache::new(FakeOrigin::new(catalog())));
    messages.reload(deadline()).await?;

    let state = AppState::new(Arc::clone(&store), Arc::clone(&idp), messages, settings);
    let router = router(state, &ApiConfig::default());
    Ok(TestApp { router, store, idp })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<TestResponse> {
        let request = Request::builder()
            .method(method)
            .uri(format!("{}{}", BASE, path))
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(serde_json::to_vec(&body)?),
                None => Body::empty(),
            })?;
        self.send(request).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(TestResponse { status, headers, body })
    }
}

pub fn register_body(email: &str) -> Value {
    json!({
        "name": "Ana Pilot",
        "airline": "air-1",
        "email": email,
        "password": "p",
        "role": "user",
        "identification_number": "123",
        "bp": "BP1",
        "start_date": "2024-01-01",
        "end_date": "2026-01-01"
    })
}
