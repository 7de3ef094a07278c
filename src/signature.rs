// Webhook Signature Verifier.
//
// Paystack signs every webhook delivery with HMAC-SHA512 over the raw
// request body, hex-encoded into the x-paystack-signature header. The
// check runs on the exact bytes as received; reparsing or reserializing
// the JSON first would change the byte layout and break the signature.
// Verify-then-parse: nothing downstream touches an unverified body.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{RegistrationError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Header the provider carries the signature in.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        WebhookVerifier {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Verify `signature` (hex) against the HMAC of `raw_body`.
    ///
    /// Comparison is constant-time over the hex encodings, so a forged
    /// signature learns nothing from timing.
    pub fn verify(&self, raw_body: &[u8], signature: &str) -> Result<()> {
        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .map_err(|_| RegistrationError::InvalidSignature)?;
        mac.update(raw_body);

        let expected = format!("{:x}", mac.finalize().into_bytes());
        let provided = signature.trim().to_ascii_lowercase();

        if constant_time_eq::constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            Ok(())
        } else {
            Err(RegistrationError::InvalidSignature)
        }
    }
}
