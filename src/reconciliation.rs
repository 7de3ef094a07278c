// Reconciliation Engine: the single authority for the pending -> paid
// transition.
//
// Three independent channels feed it: the payment page polling the server
// (client-verify), the provider's asynchronous webhook, and a manual admin
// confirmation. The engine must produce the same final state no matter
// which channel fires first, how often a reference is redelivered, or
// whether two deliveries race each other.
//
// Contracts enforced here:
//   - idempotency: one PaymentRecord and at most one receipt per reference
//   - authenticity: client-supplied references are re-confirmed with the
//     gateway; webhook bodies arrive only after HMAC verification
//   - amount authority: the persisted amount is recomputed from the pass
//     category; reported amounts are cross-checked, never trusted

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::config::Tariff;
use crate::db::{self, TransitionOutcome};
use crate::error::{RegistrationError, Result};
use crate::gateway::PaymentGateway;
use crate::notifier::Notifier;
use crate::registrant::{PassType, PaymentEvent, PaymentRecord, PaymentSource};

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of applying one payment event. Both variants are successes:
/// `AlreadyRecorded` is the idempotency contract observed: a duplicate or
/// racing delivery sees the outcome the first delivery produced.
#[derive(Debug, Clone)]
pub enum ReconciliationOutcome {
    Applied { record: PaymentRecord },
    AlreadyRecorded { record: PaymentRecord },
}

impl ReconciliationOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            ReconciliationOutcome::Applied { record } => record,
            ReconciliationOutcome::AlreadyRecorded { record } => record,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, ReconciliationOutcome::Applied { .. })
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    db: Arc<Mutex<Connection>>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    tariff: Tariff,
}

impl ReconciliationEngine {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        tariff: Tariff,
    ) -> Self {
        ReconciliationEngine {
            db,
            gateway,
            notifier,
            tariff,
        }
    }

    /// Apply one payment event.
    ///
    /// The database lock is never held across an await: registrant lookup,
    /// gateway confirmation and the atomic transition are separate critical
    /// sections, and the UNIQUE(reference) constraint arbitrates whatever
    /// interleaving results.
    pub async fn reconcile(&self, event: PaymentEvent) -> Result<ReconciliationOutcome> {
        let (registrant, prior) = {
            let conn = self.db.lock().unwrap();
            let registrant = db::find_registrant_by_email(&conn, &event.email)?
                .ok_or_else(|| RegistrationError::NotFound(event.email.clone()))?;
            let prior = db::find_payment_by_reference(&conn, &event.reference)?;
            (registrant, prior)
        };

        // Fast idempotency path: this reference was already applied.
        if let Some(record) = prior {
            tracing::info!(
                reference = %event.reference,
                source = event.source.as_str(),
                "payment reference already recorded, returning prior outcome"
            );
            return Ok(ReconciliationOutcome::AlreadyRecorded { record });
        }

        let reported_amount = self.confirm_authenticity(&event).await?;

        // Amount authority: the fee schedule wins over anything reported
        // by the payment channel. An admin correction changes which line
        // of the schedule applies, never the schedule itself.
        let pass_type = event.pass_type_correction.unwrap_or(registrant.pass_type);
        let amount = pass_type.amount(&self.tariff);
        if let Some(reported) = reported_amount.or(event.reported_amount) {
            if reported != amount {
                tracing::warn!(
                    reference = %event.reference,
                    email = %event.email,
                    reported,
                    computed = amount,
                    "reported amount disagrees with fee schedule, keeping computed amount"
                );
            }
        }

        let record = PaymentRecord {
            reference: event.reference.clone(),
            email: registrant.email.clone(),
            amount,
            status: "success".to_string(),
            source: event.source,
            recorded_at: event.received_at,
        };

        // The correction rides in the same transaction as the transition:
        // it applies exactly when the payment does.
        let outcome = {
            let mut conn = self.db.lock().unwrap();
            db::transition_to_paid(&mut conn, &record, event.pass_type_correction)?
        };

        match outcome {
            TransitionOutcome::Applied(record) => {
                tracing::info!(
                    reference = %record.reference,
                    email = %record.email,
                    amount = record.amount,
                    source = record.source.as_str(),
                    "payment reconciled"
                );
                self.issue_receipt(pass_type, &record).await;
                Ok(ReconciliationOutcome::Applied { record })
            }
            TransitionOutcome::AlreadyRecorded(record) => {
                // Lost the first-success race. The winner sent the receipt.
                if event.pass_type_correction.is_some() {
                    tracing::warn!(
                        reference = %record.reference,
                        "reference already recorded, category correction not applied"
                    );
                }
                Ok(ReconciliationOutcome::AlreadyRecorded { record })
            }
        }
    }

    /// Source-specific authenticity check. Returns the amount the trusted
    /// side reported, when there is one, for cross-checking.
    async fn confirm_authenticity(&self, event: &PaymentEvent) -> Result<Option<i64>> {
        match event.source {
            // Never trust the browser: re-confirm with the provider.
            PaymentSource::ClientVerify => {
                let verified = self.gateway.verify_transaction(&event.reference).await?;
                if !verified.success {
                    return Err(RegistrationError::PaymentNotConfirmed {
                        reference: event.reference.clone(),
                        status: verified.raw_status,
                    });
                }
                Ok(Some(verified.amount))
            }
            // The raw body already passed HMAC verification at the
            // transport boundary; the event is provably the provider's.
            PaymentSource::Webhook => Ok(event.reported_amount),
            // An authenticated admin vouching for an out-of-band transfer.
            PaymentSource::AdminOverride => Ok(None),
        }
    }

    /// Receipt issuance is downstream of the financial transition: a
    /// failure here is logged for out-of-band retry, never propagated.
    async fn issue_receipt(&self, pass_type: PassType, record: &PaymentRecord) {
        if let Err(e) = self
            .notifier
            .send_receipt(&record.email, &record.reference, record.amount, pass_type)
            .await
        {
            tracing::warn!(
                reference = %record.reference,
                email = %record.email,
                error = %e,
                "receipt delivery failed, payment state unaffected"
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
