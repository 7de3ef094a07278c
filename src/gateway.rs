// Payment Gateway Adapter.
//
// Translates an opaque payment reference into a verified transaction
// outcome by asking Paystack directly, over an authenticated channel. The
// client-verify path must never trust what the browser claims; this
// adapter is the independent confirmation.
//
// The `PaymentGateway` trait is the seam that lets the reconciliation
// engine run against a canned gateway in tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{RegistrationError, Result};

/// Normalized provider response. `amount` is in major currency units
/// (Paystack reports minor units; the adapter divides by 100).
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub success: bool,
    pub amount: i64,
    pub raw_status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Look up `reference` with the provider and report whether the
    /// transaction actually succeeded.
    ///
    /// A transaction that exists but did not succeed is a normal negative
    /// result (`success == false`), not an error.
    async fn verify_transaction(&self, reference: &str) -> Result<VerifiedTransaction>;
}

// ============================================================================
// PAYSTACK WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
}

/// Asynchronous notification body, parsed only after the raw bytes passed
/// signature verification.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub reference: String,
    /// Minor currency units, as the provider reports them.
    pub amount: i64,
    pub customer: WebhookCustomer,
}

#[derive(Debug, Deserialize)]
pub struct WebhookCustomer {
    pub email: String,
}

/// Event name Paystack sends for a completed charge.
pub const CHARGE_SUCCESS: &str = "charge.success";

pub fn parse_webhook_event(raw_body: &[u8]) -> Result<WebhookEvent> {
    serde_json::from_slice(raw_body)
        .map_err(|e| RegistrationError::Validation(format!("unreadable webhook payload: {e}")))
}

// ============================================================================
// PAYSTACK CLIENT
// ============================================================================

pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaystackGateway {
    pub fn new(base_url: &str, secret_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RegistrationError::GatewayUnavailable(e.to_string()))?;

        Ok(PaystackGateway {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn verify_transaction(&self, reference: &str) -> Result<VerifiedTransaction> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| RegistrationError::GatewayUnavailable(e.to_string()))?;

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| RegistrationError::GatewayProtocol(e.to_string()))?;

        interpret_verify_response(reference, body)
    }
}

/// A reply that parses but carries no transaction data is the provider
/// answering "no such transaction" (unknown or mistyped references land
/// here). That is a negative verification result, not a protocol failure;
/// only a body that fails to deserialize counts as the latter.
fn interpret_verify_response(reference: &str, body: VerifyResponse) -> Result<VerifiedTransaction> {
    match body.data {
        Some(data) => Ok(VerifiedTransaction {
            success: body.status && data.status == "success",
            amount: data.amount / 100,
            raw_status: data.status,
        }),
        None => Err(RegistrationError::PaymentNotConfirmed {
            reference: reference.to_string(),
            status: body
                .message
                .unwrap_or_else(|| "no transaction data".to_string()),
        }),
    }
}
