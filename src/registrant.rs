// Registrant data model: pass categories, payment state, payment events
// and the audit records reconciliation produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Tariff;

// ============================================================================
// PASS CATEGORY
// ============================================================================

/// Pass category chosen at registration. Wire names match the original
/// registration form ("General" / "Team Pass").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassType {
    General,
    #[serde(rename = "Team Pass", alias = "Team")]
    Team,
}

impl PassType {
    /// The fee for this pass. Amounts are a pure function of category,
    /// the only place a registrant's amount may come from.
    pub fn amount(&self, tariff: &Tariff) -> i64 {
        match self {
            PassType::General => tariff.general,
            PassType::Team => tariff.team,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassType::General => "General",
            PassType::Team => "Team Pass",
        }
    }

    pub fn parse(s: &str) -> Option<PassType> {
        match s {
            "General" => Some(PassType::General),
            "Team Pass" | "Team" => Some(PassType::Team),
            _ => None,
        }
    }
}

// ============================================================================
// REGISTRANT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// One registered attendee. Email is the identity key (unique at the
/// storage layer). `amount` is computed server-side from `pass_type` at
/// intake and recomputed at reconciliation; it is never taken from a
/// client or payment event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registrant {
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub pass_type: PassType,
    pub amount: i64,
    pub payment_status: PaymentStatus,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub church: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// PAYMENT EVENTS & RECORDS
// ============================================================================

/// Which channel reported the payment. All three converge on the same
/// reconcile path; the source decides how much verification is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentSource {
    ClientVerify,
    Webhook,
    AdminOverride,
}

impl PaymentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSource::ClientVerify => "client-verify",
            PaymentSource::Webhook => "webhook",
            PaymentSource::AdminOverride => "admin-override",
        }
    }
}

/// One attempt, from some channel, to report a successful payment.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub source: PaymentSource,
    pub email: String,
    pub reference: String,
    /// Amount the channel claims was paid, if it supplied one. Cross-checked
    /// against the computed fee; never authoritative.
    pub reported_amount: Option<i64>,
    /// Admin-requested category correction. Landed in the same transaction
    /// as the paid transition, so it cannot stick without the payment.
    pub pass_type_correction: Option<PassType>,
    pub received_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn new(source: PaymentSource, email: &str, reference: &str) -> Self {
        PaymentEvent {
            source,
            email: email.to_string(),
            reference: reference.to_string(),
            reported_amount: None,
            pass_type_correction: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_reported_amount(mut self, amount: i64) -> Self {
        self.reported_amount = Some(amount);
        self
    }

    pub fn with_pass_type_correction(mut self, pass_type: PassType) -> Self {
        self.pass_type_correction = Some(pass_type);
        self
    }

    /// Admin confirmation of an out-of-band bank transfer: no provider
    /// reference exists, so one is synthesized.
    pub fn bank_transfer(email: &str) -> Self {
        let reference = format!("BANK-{}", Utc::now().timestamp_millis());
        Self::new(PaymentSource::AdminOverride, email, &reference)
    }
}

/// Durable audit entry for one successfully reconciled payment. The
/// reference is unique per record; a replayed reference maps back to the
/// existing row instead of creating a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub reference: String,
    pub email: String,
    pub amount: i64,
    pub status: String,
    pub source: PaymentSource,
    pub recorded_at: DateTime<Utc>,
}
