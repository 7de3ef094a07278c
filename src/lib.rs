// Camp Registration Backend - Core Library
// Exposes all modules for use in the API server and tests

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod gateway;
pub mod notifier;
pub mod reconciliation;
pub mod registrant;
pub mod signature;

// Re-export commonly used types
pub use api::{build_router, AppState};
pub use config::{Config, SmtpConfig, Tariff};
pub use db::{
    admin_session_valid, count_payments, create_admin_session, create_registrant,
    find_payment_by_reference, find_registrant_by_email, list_registrants, setup_database,
    transition_to_paid, TransitionOutcome,
};
pub use error::{RegistrationError, Result};
pub use export::registrants_to_csv;
pub use gateway::{PaymentGateway, PaystackGateway, VerifiedTransaction, WebhookEvent};
pub use notifier::{LogNotifier, Notifier, SmtpNotifier};
pub use reconciliation::{ReconciliationEngine, ReconciliationOutcome};
pub use registrant::{
    PassType, PaymentEvent, PaymentRecord, PaymentSource, PaymentStatus, Registrant,
};
pub use signature::{WebhookVerifier, SIGNATURE_HEADER};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
