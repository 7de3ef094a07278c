// Environment configuration.
//
// Everything the original deployment configured through its .env file is
// read here once at startup. Development defaults are provided for local
// runs; the Paystack secret and admin credentials must come from the
// environment in any real deployment.

use std::env;

/// Fee table: amount (GHS, whole units) per pass category.
///
/// Amounts are a pure function of pass type. They are configuration, not
/// client input, and never overridden by values reported from a payment
/// channel.
#[derive(Debug, Clone, Copy)]
pub struct Tariff {
    pub general: i64,
    pub team: i64,
}

impl Default for Tariff {
    fn default() -> Self {
        Tariff {
            general: 999,
            team: 4500,
        }
    }
}

/// SMTP settings for registration/receipt mail. Absent in development,
/// in which case the server falls back to a logging notifier.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub paystack_secret_key: String,
    pub paystack_public_key: String,
    pub paystack_base_url: String,
    pub gateway_timeout_secs: u64,
    pub admin_username: String,
    pub admin_password: String,
    pub session_ttl_hours: i64,
    pub smtp: Option<SmtpConfig>,
    pub tariff: Tariff,
}

impl Config {
    pub fn from_env() -> Self {
        let smtp = match (env::var("EMAIL_USER"), env::var("EMAIL_PASS")) {
            (Ok(username), Ok(password)) => Some(SmtpConfig {
                server: env::var("SMTP_SERVER").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                from_address: env::var("EMAIL_FROM").unwrap_or_else(|_| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        let tariff = Tariff {
            general: env_i64("GENERAL_PASS_FEE", Tariff::default().general),
            team: env_i64("TEAM_PASS_FEE", Tariff::default().team),
        };

        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "registrations.db".to_string()),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:10000".to_string()),
            paystack_secret_key: env::var("PAYSTACK_SECRET_KEY").unwrap_or_default(),
            paystack_public_key: env::var("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
            paystack_base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            admin_username: env::var("ADMIN_USER").unwrap_or_default(),
            admin_password: env::var("ADMIN_PASS").unwrap_or_default(),
            session_ttl_hours: env_i64("SESSION_TTL_HOURS", 12),
            smtp,
            tariff,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
