// Admin authentication.
//
// Credentials come from configuration; a successful login mints an opaque
// session token persisted server-side (see db::admin_sessions), so the
// gate keeps working when several server instances share the database.
// Both credential comparisons are constant-time.

use constant_time_eq::constant_time_eq;
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::error::Result;

/// Check the submitted credentials. Empty configured credentials mean the
/// admin surface is disabled, never that any login succeeds.
pub fn credentials_match(config: &Config, username: &str, password: &str) -> bool {
    if config.admin_username.is_empty() || config.admin_password.is_empty() {
        return false;
    }

    let user_ok = constant_time_eq(config.admin_username.as_bytes(), username.as_bytes());
    let pass_ok = constant_time_eq(config.admin_password.as_bytes(), password.as_bytes());
    user_ok && pass_ok
}

/// Mint and persist a new session token.
pub fn issue_session(conn: &Connection, ttl_hours: i64) -> Result<String> {
    let token = Uuid::new_v4().to_string();
    db::create_admin_session(conn, &token, ttl_hours)?;
    Ok(token)
}

/// True when `token` names a live, unexpired session.
pub fn session_valid(conn: &Connection, token: &str) -> Result<bool> {
    db::admin_session_valid(conn, token)
}
