// Registrant Store: durable CRUD for registrants, payment audit records
// and admin sessions on SQLite.
//
// The payments table carries a UNIQUE constraint on the payment reference.
// That constraint is the final idempotency backstop: the reconcile path
// checks first, but under concurrent delivery the database is what decides
// who wins, and the loser is handed the winner's record.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, ErrorCode};

use crate::error::{RegistrationError, Result};
use crate::registrant::{
    PassType, PaymentRecord, PaymentSource, PaymentStatus, Registrant,
};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS registrants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fullname TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            pass_type TEXT NOT NULL,
            amount INTEGER NOT NULL,
            payment_status TEXT NOT NULL DEFAULT 'pending',
            age INTEGER,
            gender TEXT,
            church TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // One row per successfully applied payment. reference UNIQUE is the
    // storage-level guard against duplicate webhook delivery.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference TEXT NOT NULL UNIQUE,
            registrant_email TEXT NOT NULL,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL,
            source TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )",
        [],
    )?;

    // Server-side admin sessions, keyed by an opaque token. Survives
    // multiple server instances sharing the database.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS admin_sessions (
            token TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payments_email ON payments(registrant_email)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// REGISTRANTS
// ============================================================================

pub fn create_registrant(conn: &Connection, registrant: &Registrant) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO registrants (
            fullname, email, phone, pass_type, amount, payment_status,
            age, gender, church, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            registrant.fullname,
            registrant.email,
            registrant.phone,
            registrant.pass_type.as_str(),
            registrant.amount,
            registrant.payment_status.as_str(),
            registrant.age,
            registrant.gender,
            registrant.church,
            registrant.created_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(RegistrationError::Validation(format!(
                "{} is already registered",
                registrant.email
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_registrant_by_email(conn: &Connection, email: &str) -> Result<Option<Registrant>> {
    let mut stmt = conn.prepare(
        "SELECT fullname, email, phone, pass_type, amount, payment_status,
                age, gender, church, created_at
         FROM registrants
         WHERE email = ?1",
    )?;

    let mut rows = stmt.query_map(params![email], map_registrant_row)?;

    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// All registrants in insertion order, for the admin listing and export.
pub fn list_registrants(conn: &Connection) -> Result<Vec<Registrant>> {
    let mut stmt = conn.prepare(
        "SELECT fullname, email, phone, pass_type, amount, payment_status,
                age, gender, church, created_at
         FROM registrants
         ORDER BY id",
    )?;

    let registrants = stmt
        .query_map([], map_registrant_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(registrants)
}

fn map_registrant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Registrant> {
    let pass_type_str: String = row.get(3)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(9)?;

    Ok(Registrant {
        fullname: row.get(0)?,
        email: row.get(1)?,
        phone: row.get(2)?,
        pass_type: PassType::parse(&pass_type_str).ok_or(rusqlite::Error::InvalidQuery)?,
        amount: row.get(4)?,
        payment_status: PaymentStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        age: row.get(6)?,
        gender: row.get(7)?,
        church: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

// ============================================================================
// PAYMENTS
// ============================================================================

/// Outcome of the atomic paid-transition. Both variants are successes from
/// the caller's point of view; `AlreadyRecorded` means some earlier (or
/// concurrent) attempt with the same reference got there first.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(PaymentRecord),
    AlreadyRecorded(PaymentRecord),
}

impl TransitionOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            TransitionOutcome::Applied(r) => r,
            TransitionOutcome::AlreadyRecorded(r) => r,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Atomically mark the registrant paid and insert the audit record.
///
/// All writes happen inside one SQLite transaction: the status change,
/// the audit row and any admin category correction land together, or none
/// does. A UNIQUE violation on the reference means another attempt already
/// recorded this payment; the existing record is returned instead of an
/// error, and the correction does not apply.
pub fn transition_to_paid(
    conn: &mut Connection,
    record: &PaymentRecord,
    correction: Option<PassType>,
) -> Result<TransitionOutcome> {
    let tx = conn.transaction()?;

    let insert = tx.execute(
        "INSERT INTO payments (reference, registrant_email, amount, status, source, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.reference,
            record.email,
            record.amount,
            record.status,
            record.source.as_str(),
            record.recorded_at.to_rfc3339(),
        ],
    );

    match insert {
        Ok(_) => {
            match correction {
                Some(pass_type) => {
                    tx.execute(
                        "UPDATE registrants
                         SET payment_status = 'paid', pass_type = ?1, amount = ?2
                         WHERE email = ?3",
                        params![pass_type.as_str(), record.amount, record.email],
                    )?;
                }
                None => {
                    tx.execute(
                        "UPDATE registrants SET payment_status = 'paid' WHERE email = ?1",
                        params![record.email],
                    )?;
                }
            }
            tx.commit()?;
            Ok(TransitionOutcome::Applied(record.clone()))
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            // Lost the first-success race (or a straight replay). Hand the
            // caller the record the winner wrote.
            drop(tx);
            let prior = find_payment_by_reference(conn, &record.reference)?.ok_or(
                RegistrationError::Storage(rusqlite::Error::QueryReturnedNoRows),
            )?;
            Ok(TransitionOutcome::AlreadyRecorded(prior))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_payment_by_reference(
    conn: &Connection,
    reference: &str,
) -> Result<Option<PaymentRecord>> {
    let mut stmt = conn.prepare(
        "SELECT reference, registrant_email, amount, status, source, recorded_at
         FROM payments
         WHERE reference = ?1",
    )?;

    let mut rows = stmt.query_map(params![reference], map_payment_row)?;

    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn count_payments(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))?;
    Ok(count)
}

fn map_payment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaymentRecord> {
    let source_str: String = row.get(4)?;
    let recorded_at_str: String = row.get(5)?;

    let source = match source_str.as_str() {
        "client-verify" => PaymentSource::ClientVerify,
        "webhook" => PaymentSource::Webhook,
        "admin-override" => PaymentSource::AdminOverride,
        _ => return Err(rusqlite::Error::InvalidQuery),
    };

    Ok(PaymentRecord {
        reference: row.get(0)?,
        email: row.get(1)?,
        amount: row.get(2)?,
        status: row.get(3)?,
        source,
        recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

// ============================================================================
// ADMIN SESSIONS
// ============================================================================

pub fn create_admin_session(conn: &Connection, token: &str, ttl_hours: i64) -> Result<()> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO admin_sessions (token, created_at, expires_at) VALUES (?1, ?2, ?3)",
        params![
            token,
            now.to_rfc3339(),
            (now + Duration::hours(ttl_hours)).to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn admin_session_valid(conn: &Connection, token: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT expires_at FROM admin_sessions WHERE token = ?1")?;
    let mut rows = stmt.query_map(params![token], |row| row.get::<_, String>(0))?;

    match rows.next() {
        Some(expires_at) => {
            let expires_at = DateTime::parse_from_rfc3339(&expires_at?)
                .map_err(|_| rusqlite::Error::InvalidQuery)?
                .with_timezone(&Utc);
            Ok(expires_at > Utc::now())
        }
        None => Ok(false),
    }
}
