// Outbound mail: registration confirmation and payment receipt.
//
// Delivery is a collaborator, not part of the financial state machine.
// Callers log a send failure and move on: a down SMTP relay must never
// roll back a recorded payment or fail a registration.

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::registrant::{PassType, Registrant};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Welcome mail with the computed fee and a payment link.
    async fn send_registration_confirmation(
        &self,
        registrant: &Registrant,
        payment_url: &str,
    ) -> Result<()>;

    /// Receipt for a successfully reconciled payment.
    async fn send_receipt(
        &self,
        email: &str,
        reference: &str,
        amount: i64,
        pass_type: PassType,
    ) -> Result<()>;
}

// ============================================================================
// SMTP (lettre)
// ============================================================================

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(SmtpNotifier {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    async fn send_html(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let message = Message::builder()
            .from(format!("REPLIB Youth Camp <{}>", self.from_address).parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_registration_confirmation(
        &self,
        registrant: &Registrant,
        payment_url: &str,
    ) -> Result<()> {
        let body = format!(
            "<h2>Hello {},</h2>\
             <p>Thank you for registering for <b>REPLIB Youth Camp</b>.</p>\
             <p>Your selected pass: <b>{}</b> | Amount: GHS {}</p>\
             <p>Please complete your payment to secure your spot:</p>\
             <a href=\"{}\">Proceed to Payment</a>",
            registrant.fullname,
            registrant.pass_type.as_str(),
            registrant.amount,
            payment_url,
        );

        self.send_html(
            &registrant.email,
            "Youth Camp Registration Successful",
            body,
        )
        .await
    }

    async fn send_receipt(
        &self,
        email: &str,
        reference: &str,
        amount: i64,
        pass_type: PassType,
    ) -> Result<()> {
        let body = format!(
            "<p>Dear Camper,</p>\
             <p>Thank you for your payment.</p>\
             <p><b>Pass:</b> {}<br>\
             <b>Amount Paid:</b> GHS {}<br>\
             <b>Reference:</b> {}</p>\
             <p>We look forward to seeing you at the camp.</p>",
            pass_type.as_str(),
            amount,
            reference,
        );

        self.send_html(email, "Youth Camp Payment Receipt", body).await
    }
}

// ============================================================================
// LOG-ONLY FALLBACK
// ============================================================================

/// Used when no SMTP credentials are configured (local development).
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_registration_confirmation(
        &self,
        registrant: &Registrant,
        payment_url: &str,
    ) -> Result<()> {
        tracing::info!(
            email = %registrant.email,
            amount = registrant.amount,
            %payment_url,
            "registration confirmation (mail disabled)"
        );
        Ok(())
    }

    async fn send_receipt(
        &self,
        email: &str,
        reference: &str,
        amount: i64,
        pass_type: PassType,
    ) -> Result<()> {
        tracing::info!(
            %email,
            %reference,
            amount,
            pass = pass_type.as_str(),
            "payment receipt (mail disabled)"
        );
        Ok(())
    }
}
