use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{ApiConfig, IdpConfig};
use crate::database::{EmployeeStore, StorePing};
use crate::handlers::public::{auth, employee_by_email_get, health_get, not_found};
use crate::idp::{IdpAdmin, IdpUserAuth};
use crate::messages::MessageCache;
use crate::middleware::{deadline_middleware, envelope_middleware, request_id_middleware, ResponseHandler};
use crate::services::{
    AuthService, Authentication, EmployeeDirectory, EmployeeRegistration, EmployeeService, RegistrationSaga,
    SagaSettings,
};

/// Shared handler state. Every service sits behind an object-safe trait so the
/// router does not care which store or identity provider backs it.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<dyn EmployeeRegistration>,
    pub auth: Arc<dyn Authentication>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub database: Arc<dyn StorePing>,
    pub messages: Arc<MessageCache>,
    pub responses: Arc<ResponseHandler>,
}

impl AppState {
    pub fn new<S, I>(store: Arc<S>, idp: Arc<I>, messages: Arc<MessageCache>, settings: SagaSettings) -> Self
    where
        S: EmployeeStore + 'static,
        I: IdpAdmin + IdpUserAuth + 'static,
    {
        Self {
            registration: Arc::new(RegistrationSaga::new(Arc::clone(&store), Arc::clone(&idp), settings)),
            auth: Arc::new(AuthService::new(Arc::clone(&store), idp)),
            employees: Arc::new(EmployeeService::new(Arc::clone(&store))),
            database: store,
            responses: Arc::new(ResponseHandler::new(Arc::clone(&messages))),
            messages,
        }
    }
}

pub fn saga_settings(api: &ApiConfig, idp: &IdpConfig) -> SagaSettings {
    SagaSettings {
        compensation_timeout: api.compensation_timeout(),
        send_verification_email: idp.send_verification_email,
    }
}

pub fn router(state: AppState, api: &ApiConfig) -> Router {
    let responses = Arc::clone(&state.responses);

    let routes = Router::new()
        .route("/register", post(auth::register_post))
        .route("/login", post(auth::login_post))
        .route("/refresh-token", post(auth::refresh_post))
        .route("/logout", post(auth::logout_post))
        .route("/resend-verification-email", post(auth::resend_verification_post))
        .route("/password-reset", post(auth::password_reset_post))
        .route("/user/email/:email", get(employee_by_email_get))
        .route("/health", get(health_get))
        .with_state(state);

    // Nesting at the root is not allowed
    let base_path = api.base_path.trim_end_matches('/');
    let app = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    };
    // The nested router inherits this fallback.
    let app = app.fallback(not_found);

    // Outermost first. The envelope layer sits closest to the handlers so it
    // sees the deadline and runs inside the request span.
    app.layer(
        ServiceBuilder::new()
            .layer(CorsLayer::permissive())
            .layer(from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(from_fn_with_state(api.request_timeout(), deadline_middleware))
            .layer(from_fn_with_state(responses, envelope_middleware)),
    )
}
