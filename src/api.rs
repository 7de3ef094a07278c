// HTTP surface: registration intake, the three payment trigger channels,
// and the admin endpoints.
//
// Handlers stay thin: validate input, call into the store or the
// reconciliation engine, map the error taxonomy onto HTTP statuses. The
// webhook handler is the one place with unusual rules: it reads the body
// as raw bytes so the signature check sees exactly what the provider
// signed, and once the signature is good it acknowledges with 200 no
// matter what happens internally (provider retry storms are worse than a
// logged failure).

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::RegistrationError;
use crate::export::registrants_to_csv;
use crate::gateway::{self, CHARGE_SUCCESS};
use crate::notifier::Notifier;
use crate::reconciliation::ReconciliationEngine;
use crate::registrant::{
    PassType, PaymentEvent, PaymentSource, PaymentStatus, Registrant,
};
use crate::signature::{WebhookVerifier, SIGNATURE_HEADER};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub engine: Arc<ReconciliationEngine>,
    pub verifier: WebhookVerifier,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Map the error taxonomy onto HTTP statuses. Storage detail never leaves
/// the process; gateway protocol surprises are logged loudly.
fn error_response(err: &RegistrationError) -> Response {
    match err {
        RegistrationError::Validation(msg) => error_body(StatusCode::BAD_REQUEST, msg.clone()),
        RegistrationError::NotFound(_) => error_body(StatusCode::NOT_FOUND, err.to_string()),
        RegistrationError::InvalidSignature => {
            error_body(StatusCode::UNAUTHORIZED, "invalid signature")
        }
        RegistrationError::PaymentNotConfirmed { .. } => {
            error_body(StatusCode::BAD_REQUEST, err.to_string())
        }
        RegistrationError::GatewayUnavailable(msg) => {
            tracing::warn!(error = %msg, "payment gateway unavailable");
            error_body(StatusCode::BAD_GATEWAY, "payment gateway unavailable, retry shortly")
        }
        RegistrationError::GatewayProtocol(msg) => {
            tracing::error!(error = %msg, "unexpected payment gateway response");
            error_body(StatusCode::BAD_GATEWAY, "payment gateway returned an unexpected response")
        }
        RegistrationError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/config/paystack", get(paystack_config))
        .route("/register", post(register))
        .route("/pay/verify", post(verify_payment))
        .route("/paystack/webhook", post(paystack_webhook))
        .route("/admin/login", post(admin_login))
        .route("/admin/confirm-payment", post(admin_confirm_payment))
        .route("/admin/registrants", get(admin_registrants))
        .route("/admin/export", get(admin_export))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// PUBLIC ENDPOINTS
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

#[derive(Serialize)]
struct PaystackConfigResponse {
    key: String,
}

/// GET /config/paystack - Serve the Paystack public key to the payment page
async fn paystack_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(PaystackConfigResponse {
        key: state.config.paystack_public_key.clone(),
    })
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    fullname: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: String,
    #[serde(rename = "passType")]
    pass_type: Option<PassType>,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    church: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    message: String,
    amount: i64,
}

/// POST /register - Create a pending registrant, amount computed server-side
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let email = match request.email {
        Some(email) if !email.trim().is_empty() => email,
        _ => return error_body(StatusCode::BAD_REQUEST, "Email is required"),
    };
    let pass_type = match request.pass_type {
        Some(pass_type) => pass_type,
        None => return error_body(StatusCode::BAD_REQUEST, "Pass type is required"),
    };

    let registrant = Registrant {
        fullname: request.fullname,
        email: email.clone(),
        phone: request.phone,
        pass_type,
        amount: pass_type.amount(&state.config.tariff),
        payment_status: PaymentStatus::Pending,
        age: request.age,
        gender: request.gender,
        church: request.church,
        created_at: Utc::now(),
    };

    {
        let conn = state.db.lock().unwrap();
        if let Err(e) = db::create_registrant(&conn, &registrant) {
            return error_response(&e);
        }
    }

    tracing::info!(%email, pass = pass_type.as_str(), "registrant created");

    // Confirmation mail is best-effort; the registration already stands.
    let payment_url = format!(
        "{}/payment.html?pass={}&email={}",
        state.config.base_url,
        urlencoding::encode(pass_type.as_str()),
        urlencoding::encode(&email),
    );
    if let Err(e) = state
        .notifier
        .send_registration_confirmation(&registrant, &payment_url)
        .await
    {
        tracing::warn!(%email, error = %e, "registration confirmation mail failed");
    }

    Json(ApiResponse::ok(RegisterResponse {
        message: "Registration successful! Please proceed to payment.".to_string(),
        amount: registrant.amount,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
struct PaymentOutcomeResponse {
    message: String,
    reference: String,
    amount: i64,
}

/// POST /pay/verify - Client-initiated verification of a Paystack reference
async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Response {
    let reference = match request.reference {
        Some(reference) if !reference.trim().is_empty() => reference,
        _ => return error_body(StatusCode::BAD_REQUEST, "No reference provided"),
    };
    let email = match request.email {
        Some(email) if !email.trim().is_empty() => email,
        _ => return error_body(StatusCode::BAD_REQUEST, "Email is required"),
    };

    let event = PaymentEvent::new(PaymentSource::ClientVerify, &email, &reference);
    match state.engine.reconcile(event).await {
        Ok(outcome) => {
            let record = outcome.record();
            Json(ApiResponse::ok(PaymentOutcomeResponse {
                message: "Payment verified and recorded".to_string(),
                reference: record.reference.clone(),
                amount: record.amount,
            }))
            .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// POST /paystack/webhook - Asynchronous provider notifications
///
/// The body is taken as raw bytes: the HMAC covers the exact wire form,
/// and nothing is parsed until the signature checks out. After that the
/// provider always gets a 200 back; reconcile failures are logged and
/// retried through the other channels, not by provoking provider retries.
async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(e) = state.verifier.verify(&body, signature) {
        tracing::warn!("webhook rejected: signature verification failed");
        return error_response(&e);
    }

    let event = match gateway::parse_webhook_event(&body) {
        Ok(event) => event,
        Err(e) => {
            // Authentic but unreadable; acknowledge so the provider does
            // not redeliver a payload we will never parse.
            tracing::error!(error = %e, "signed webhook payload failed to parse");
            return StatusCode::OK.into_response();
        }
    };

    if event.event != CHARGE_SUCCESS {
        tracing::info!(event = %event.event, "ignoring webhook event type");
        return StatusCode::OK.into_response();
    }

    let payment = PaymentEvent::new(
        PaymentSource::Webhook,
        &event.data.customer.email,
        &event.data.reference,
    )
    .with_reported_amount(event.data.amount / 100);

    if let Err(e) = state.engine.reconcile(payment).await {
        tracing::warn!(
            reference = %event.data.reference,
            error = %e,
            "webhook reconciliation failed, acknowledging anyway"
        );
    }

    StatusCode::OK.into_response()
}

// ============================================================================
// ADMIN ENDPOINTS
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    message: String,
    token: String,
}

/// POST /admin/login - Exchange configured credentials for a session token
async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Response {
    if !auth::credentials_match(&state.config, &request.username, &request.password) {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let token = {
        let conn = state.db.lock().unwrap();
        match auth::issue_session(&conn, state.config.session_ttl_hours) {
            Ok(token) => token,
            Err(e) => return error_response(&e),
        }
    };

    Json(ApiResponse::ok(LoginResponse {
        message: "Login successful".to_string(),
        token,
    }))
    .into_response()
}

/// Gate for the admin endpoints: a bearer token naming a live session.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = match token {
        Some(token) => {
            let conn = state.db.lock().unwrap();
            auth::session_valid(&conn, token).map_err(|e| error_response(&e))?
        }
        None => false,
    };

    if authorized {
        Ok(())
    } else {
        Err(error_body(StatusCode::FORBIDDEN, "Unauthorized"))
    }
}

#[derive(Deserialize)]
struct ConfirmPaymentRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(rename = "passType", default)]
    pass_type: Option<PassType>,
}

/// POST /admin/confirm-payment - Manual confirmation of an out-of-band payment
async fn admin_confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Response {
    if let Err(response) = require_admin(&state, &headers) {
        return response;
    }

    let email = match request.email {
        Some(email) if !email.trim().is_empty() => email,
        _ => return error_body(StatusCode::BAD_REQUEST, "Email is required"),
    };

    let mut event = match request.reference {
        Some(reference) if !reference.trim().is_empty() => {
            PaymentEvent::new(PaymentSource::AdminOverride, &email, &reference)
        }
        _ => PaymentEvent::bank_transfer(&email),
    };

    // Optional category correction rides along with the confirmation; the
    // engine applies it in the same transaction as the paid transition and
    // recomputes the fee from the schedule.
    if let Some(pass_type) = request.pass_type {
        event = event.with_pass_type_correction(pass_type);
    }

    match state.engine.reconcile(event).await {
        Ok(outcome) => {
            let record = outcome.record();
            Json(ApiResponse::ok(PaymentOutcomeResponse {
                message: format!("Payment confirmed for {email}"),
                reference: record.reference.clone(),
                amount: record.amount,
            }))
            .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Registrant projection for the admin listing (mirrors the export columns).
#[derive(Serialize)]
struct RegistrantSummary {
    fullname: String,
    email: String,
    phone: String,
    pass_type: String,
    amount: i64,
    payment_status: String,
}

impl From<Registrant> for RegistrantSummary {
    fn from(r: Registrant) -> Self {
        Self {
            fullname: r.fullname,
            email: r.email,
            phone: r.phone,
            pass_type: r.pass_type.as_str().to_string(),
            amount: r.amount,
            payment_status: r.payment_status.as_str().to_string(),
        }
    }
}

/// GET /admin/registrants - Full registrant listing
async fn admin_registrants(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(&state, &headers) {
        return response;
    }

    let conn = state.db.lock().unwrap();
    match db::list_registrants(&conn) {
        Ok(registrants) => {
            let summaries: Vec<RegistrantSummary> =
                registrants.into_iter().map(|r| r.into()).collect();
            Json(ApiResponse::ok(summaries)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /admin/export - Registrant list as a CSV download
async fn admin_export(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_admin(&state, &headers) {
        return response;
    }

    let registrants = {
        let conn = state.db.lock().unwrap();
        match db::list_registrants(&conn) {
            Ok(registrants) => registrants,
            Err(e) => return error_response(&e),
        }
    };

    match registrants_to_csv(&registrants) {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"registrants.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "csv export failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Error generating export")
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tariff;
    use crate::error::Result;
    use crate::gateway::{PaymentGateway, VerifiedTransaction};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use hmac::{Hmac, Mac};
    use sha2::Sha512;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    const WEBHOOK_SECRET: &str = "sk_test_secret";

    struct StaticGateway {
        success: bool,
        amount: i64,
    }

    #[async_trait]
    impl PaymentGateway for StaticGateway {
        async fn verify_transaction(&self, _reference: &str) -> Result<VerifiedTransaction> {
            Ok(VerifiedTransaction {
                success: self.success,
                amount: self.amount,
                raw_status: if self.success { "success" } else { "abandoned" }.to_string(),
            })
        }
    }

    struct CountingNotifier {
        receipts: AtomicUsize,
        confirmations: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send_registration_confirmation(
            &self,
            _registrant: &Registrant,
            _payment_url: &str,
        ) -> anyhow::Result<()> {
            self.confirmations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_receipt(
            &self,
            _email: &str,
            _reference: &str,
            _amount: i64,
            _pass_type: PassType,
        ) -> anyhow::Result<()> {
            self.receipts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_state(gateway_success: bool) -> (AppState, Arc<CountingNotifier>) {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        let db = Arc::new(Mutex::new(conn));

        let mut config = Config::from_env();
        config.paystack_secret_key = WEBHOOK_SECRET.to_string();
        config.paystack_public_key = "pk_test_public".to_string();
        config.admin_username = "admin".to_string();
        config.admin_password = "hunter2".to_string();
        config.tariff = Tariff::default();

        let notifier = Arc::new(CountingNotifier {
            receipts: AtomicUsize::new(0),
            confirmations: AtomicUsize::new(0),
        });
        let gateway = Arc::new(StaticGateway {
            success: gateway_success,
            amount: 999,
        });

        let engine = Arc::new(ReconciliationEngine::new(
            db.clone(),
            gateway,
            notifier.clone(),
            config.tariff,
        ));

        let state = AppState {
            db,
            engine,
            verifier: WebhookVerifier::new(WEBHOOK_SECRET),
            notifier: notifier.clone(),
            config: Arc::new(config),
        };
        (state, notifier)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("{:x}", mac.finalize().into_bytes())
    }

    async fn register_general(app: &Router, email: &str) {
        let response = app
            .clone()
            .oneshot(json_request(
                "/register",
                serde_json::json!({
                    "fullname": "Ama Mensah",
                    "email": email,
                    "phone": "0240000000",
                    "passType": "General",
                    "age": 21
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "/admin/login",
                serde_json::json!({"username": "admin", "password": "hunter2"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_creates_pending_registrant() {
        let (state, notifier) = test_state(true);
        let app = build_router(state.clone());

        register_general(&app, "a@x.com").await;

        let conn = state.db.lock().unwrap();
        let registrant = db::find_registrant_by_email(&conn, "a@x.com")
            .unwrap()
            .unwrap();
        assert_eq!(registrant.payment_status, PaymentStatus::Pending);
        assert_eq!(registrant.amount, 999);
        assert_eq!(notifier.confirmations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_register_without_email_is_rejected() {
        let (state, _) = test_state(true);
        let app = build_router(state);

        let response = app
            .oneshot(json_request(
                "/register",
                serde_json::json!({"fullname": "No Email", "passType": "General"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Email is required");
    }

    #[tokio::test]
    async fn test_client_verify_end_to_end() {
        let (state, _) = test_state(true);
        let app = build_router(state.clone());

        register_general(&app, "a@x.com").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "/pay/verify",
                serde_json::json!({"reference": "R1", "email": "a@x.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["data"]["reference"], "R1");
        assert_eq!(body["data"]["amount"], 999);

        let conn = state.db.lock().unwrap();
        let registrant = db::find_registrant_by_email(&conn, "a@x.com")
            .unwrap()
            .unwrap();
        assert_eq!(registrant.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_verify_without_reference_is_rejected() {
        let (state, _) = test_state(true);
        let app = build_router(state);

        let response = app
            .oneshot(json_request(
                "/pay/verify",
                serde_json::json!({"email": "a@x.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_unconfirmed_payment_is_400() {
        let (state, _) = test_state(false);
        let app = build_router(state);

        register_general(&app, "a@x.com").await;

        let response = app
            .oneshot(json_request(
                "/pay/verify",
                serde_json::json!({"reference": "R1", "email": "a@x.com"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_with_bad_signature_mutates_nothing() {
        let (state, _) = test_state(true);
        let app = build_router(state.clone());

        register_general(&app, "a@x.com").await;

        let body = serde_json::json!({
            "event": "charge.success",
            "data": {"reference": "R1", "amount": 99900, "customer": {"email": "a@x.com"}}
        })
        .to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/paystack/webhook")
                    .header(SIGNATURE_HEADER, "deadbeef")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let conn = state.db.lock().unwrap();
        let registrant = db::find_registrant_by_email(&conn, "a@x.com")
            .unwrap()
            .unwrap();
        assert_eq!(registrant.payment_status, PaymentStatus::Pending);
        assert_eq!(db::count_payments(&conn).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_webhook_duplicate_delivery_acknowledged_once_applied() {
        let (state, notifier) = test_state(true);
        let app = build_router(state.clone());

        register_general(&app, "a@x.com").await;

        let body = serde_json::json!({
            "event": "charge.success",
            "data": {"reference": "R1", "amount": 99900, "customer": {"email": "a@x.com"}}
        })
        .to_string();
        let signature = sign(body.as_bytes());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/paystack/webhook")
                        .header(SIGNATURE_HEADER, signature.clone())
                        .header("content-type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            // Provider always gets its acknowledgment.
            assert_eq!(response.status(), StatusCode::OK);
        }

        let conn = state.db.lock().unwrap();
        assert_eq!(db::count_payments(&conn).unwrap(), 1);
        assert_eq!(notifier.receipts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_registrant_still_acknowledged() {
        let (state, _) = test_state(true);
        let app = build_router(state);

        let body = serde_json::json!({
            "event": "charge.success",
            "data": {"reference": "R9", "amount": 99900, "customer": {"email": "ghost@x.com"}}
        })
        .to_string();
        let signature = sign(body.as_bytes());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/paystack/webhook")
                    .header(SIGNATURE_HEADER, signature)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_endpoints_require_session() {
        let (state, _) = test_state(true);
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/admin/registrants")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(json_request(
                "/admin/login",
                serde_json::json!({"username": "admin", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_confirm_payment_synthesizes_reference() {
        let (state, _) = test_state(true);
        let app = build_router(state.clone());

        register_general(&app, "a@x.com").await;
        let token = login(&app).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/confirm-payment")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"email": "a@x.com"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert!(body["data"]["reference"]
            .as_str()
            .unwrap()
            .starts_with("BANK-"));

        let conn = state.db.lock().unwrap();
        let registrant = db::find_registrant_by_email(&conn, "a@x.com")
            .unwrap()
            .unwrap();
        assert_eq!(registrant.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_admin_confirm_with_category_correction() {
        let (state, _) = test_state(true);
        let app = build_router(state.clone());

        register_general(&app, "a@x.com").await;
        let token = login(&app).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/confirm-payment")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"email": "a@x.com", "passType": "Team Pass"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["data"]["amount"], 4500);

        let conn = state.db.lock().unwrap();
        let registrant = db::find_registrant_by_email(&conn, "a@x.com")
            .unwrap()
            .unwrap();
        assert_eq!(registrant.pass_type, PassType::Team);
        assert_eq!(registrant.amount, 4500);
        assert_eq!(registrant.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_admin_confirm_unknown_email_is_404() {
        let (state, _) = test_state(true);
        let app = build_router(state);
        let token = login(&app).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/confirm-payment")
                    .header("authorization", format!("Bearer {token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"email": "ghost@x.com"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_export_returns_csv() {
        let (state, _) = test_state(true);
        let app = build_router(state);

        register_general(&app, "a@x.com").await;
        let token = login(&app).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/export")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(csv.starts_with("Full Name,Email"));
        assert!(csv.contains("a@x.com"));
    }

    #[tokio::test]
    async fn test_paystack_config_exposes_public_key() {
        let (state, _) = test_state(true);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/config/paystack")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["key"], "pk_test_public");
    }
}
