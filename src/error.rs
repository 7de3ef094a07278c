// Error taxonomy for the registration/payment backend.
//
// Every failure the request boundary needs to distinguish gets its own
// variant; the HTTP status mapping lives in api.rs. Notifier failures are
// deliberately absent from reconcile results: receipt delivery problems are
// logged and never alter a payment outcome.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Missing or malformed client input (400).
    #[error("{0}")]
    Validation(String),

    /// No registrant record for the given email (404).
    #[error("no registrant found for {0}")]
    NotFound(String),

    /// Webhook body failed HMAC verification. Logged internally; the
    /// caller only sees a terse rejection.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// The gateway knows the reference but does not report it successful.
    #[error("transaction {reference} not successful (status: {status})")]
    PaymentNotConfirmed { reference: String, status: String },

    /// Network-level failure or timeout talking to the payment provider.
    /// Safe for the caller to retry.
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The provider answered with a shape we do not understand. Not
    /// retryable; something changed upstream.
    #[error("unexpected payment gateway response: {0}")]
    GatewayProtocol(String),

    /// Database failure. Internal detail, never shown to clients.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// True when the caller may usefully retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistrationError::GatewayUnavailable(_))
    }
}
