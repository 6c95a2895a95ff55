//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, Connection};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{
    Attendee, Checkout, Donation, EntityKind, ImportErrorEntry, ImportHistory, ImportStats,
    ImportedRecord, Member, Program, ProgramType,
};
use crate::ports::{NaturalKey, ReferenceLookup};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Check if an insert failed on a unique index
fn is_unique_violation(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("constraint") && (lower.contains("duplicate key") || lower.contains("unique"))
}

const MEMBER_COLUMNS: &str = "member_id, first_name, last_name, email, phone, address, city, state,
    zip_code, date_of_birth::VARCHAR, membership_type, parent_email, notes, import_id, created_at";

const PROGRAM_COLUMNS: &str = "program_id, name, program_type, description, location,
    start_date::VARCHAR, end_date::VARCHAR, auto_sync_attendees, import_id, created_at";

const HISTORY_COLUMNS: &str = "import_id, import_type, imported_by, source, file_name,
    total_rows, successful, failed, skipped, error_log, manifest, status, started_at, completed_at";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process (a second CLI invocation, the web
    /// server) holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "Database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Database(format!(
                "Failed to open database after {} retries",
                MAX_RETRIES
            ))
            .into()
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is statically linked via the "json" feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        Ok(conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.lock()?;
        let migration_service = MigrationService::new(&conn);
        let result = migration_service.run_pending()?;
        if !result.applied.is_empty() {
            debug!(applied = ?result.applied, "Applied migrations");
        }
        Ok(result)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Member operations ===

    pub fn insert_member(&self, member: &Member) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO members (member_id, first_name, last_name, email, phone, address, city,
                                  state, zip_code, date_of_birth, membership_type, parent_email,
                                  notes, import_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                member.id.to_string(),
                member.first_name,
                member.last_name,
                member.email,
                member.phone,
                member.address,
                member.city,
                member.state,
                member.zip_code,
                member.date_of_birth.map(|d| d.to_string()),
                member.membership_type,
                member.parent_email,
                member.notes,
                member.import_id.map(|id| id.to_string()),
                member.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                let key = NaturalKey::MemberEmail(member.email.clone().unwrap_or_default());
                anyhow::Error::new(Error::Duplicate(format!("{} already exists", key)))
            } else {
                anyhow::Error::new(e).context("Failed to insert member")
            }
        })?;
        Ok(())
    }

    // === Checkout / donation operations ===

    pub fn insert_checkout(&self, checkout: &Checkout) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO checkouts (checkout_id, member_id, book_title, author, isbn,
                                    checkout_date, due_date, return_date, number_of_books,
                                    notes, import_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                checkout.id.to_string(),
                checkout.member_id.to_string(),
                checkout.book_title,
                checkout.author,
                checkout.isbn,
                checkout.checkout_date.to_string(),
                checkout.due_date.map(|d| d.to_string()),
                checkout.return_date.map(|d| d.to_string()),
                checkout.number_of_books,
                checkout.notes,
                checkout.import_id.map(|id| id.to_string()),
                checkout.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert checkout")?;
        Ok(())
    }

    pub fn get_checkouts_by_member(&self, member_id: Uuid) -> Result<Vec<Checkout>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT checkout_id, member_id, book_title, author, isbn, checkout_date::VARCHAR,
                    due_date::VARCHAR, return_date::VARCHAR, number_of_books, notes, import_id,
                    created_at
             FROM checkouts WHERE member_id = ? ORDER BY checkout_date",
        )?;
        let checkouts = stmt
            .query_map([member_id.to_string()], |row| {
                let id_str: String = row.get(0)?;
                let member_str: String = row.get(1)?;
                let checkout_date: String = row.get(5)?;
                let due: Option<String> = row.get(6)?;
                let returned: Option<String> = row.get(7)?;
                let import_id: Option<String> = row.get(10)?;
                let created: String = row.get(11)?;
                Ok(Checkout {
                    id: parse_uuid(&id_str),
                    member_id: parse_uuid(&member_str),
                    book_title: row.get(2)?,
                    author: row.get(3)?,
                    isbn: row.get(4)?,
                    checkout_date: parse_date(&checkout_date),
                    due_date: due.as_deref().map(parse_date),
                    return_date: returned.as_deref().map(parse_date),
                    number_of_books: row.get(8)?,
                    notes: row.get(9)?,
                    import_id: import_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
                    created_at: parse_timestamp(&created),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(checkouts)
    }

    pub fn insert_donation(&self, donation: &Donation) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO donations (donation_id, donor_name, donor_email, member_id, donated_at,
                                    number_of_books, weight, book_condition, notes, import_id,
                                    created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                donation.id.to_string(),
                donation.donor_name,
                donation.donor_email,
                donation.member_id.map(|id| id.to_string()),
                donation.donated_at.to_string(),
                donation.number_of_books,
                donation.weight.and_then(|w| w.to_f64()),
                donation.book_condition,
                donation.notes,
                donation.import_id.map(|id| id.to_string()),
                donation.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert donation")?;
        Ok(())
    }

    pub fn get_donations(&self) -> Result<Vec<Donation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT donation_id, donor_name, donor_email, member_id, donated_at::VARCHAR,
                    number_of_books, weight, book_condition, notes, import_id, created_at
             FROM donations ORDER BY donated_at",
        )?;
        let donations = stmt
            .query_map([], |row| {
                let id_str: String = row.get(0)?;
                let member_id: Option<String> = row.get(3)?;
                let donated_at: String = row.get(4)?;
                let weight: Option<f64> = row.get(6)?;
                let import_id: Option<String> = row.get(9)?;
                let created: String = row.get(10)?;
                Ok(Donation {
                    id: parse_uuid(&id_str),
                    donor_name: row.get(1)?,
                    donor_email: row.get(2)?,
                    member_id: member_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
                    donated_at: parse_date(&donated_at),
                    number_of_books: row.get(5)?,
                    weight: weight.and_then(Decimal::from_f64),
                    book_condition: row.get(7)?,
                    notes: row.get(8)?,
                    import_id: import_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
                    created_at: parse_timestamp(&created),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(donations)
    }

    // === Program / attendee operations ===

    pub fn insert_program(&self, program: &Program) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO programs (program_id, name, program_type, description, location,
                                   start_date, end_date, auto_sync_attendees, import_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                program.id.to_string(),
                program.name,
                program.program_type.as_str(),
                program.description,
                program.location,
                program.start_date.map(|d| d.to_string()),
                program.end_date.map(|d| d.to_string()),
                program.auto_sync_attendees,
                program.import_id.map(|id| id.to_string()),
                program.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                let key = NaturalKey::ProgramName(program.name.clone());
                anyhow::Error::new(Error::Duplicate(format!("{} already exists", key)))
            } else {
                anyhow::Error::new(e).context("Failed to insert program")
            }
        })?;
        Ok(())
    }

    pub fn insert_attendee(&self, attendee: &Attendee) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO attendees (attendee_id, program_id, first_name, last_name, date_of_birth,
                                    parent_name, parent_email, parent_phone, member_id, notes,
                                    import_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                attendee.id.to_string(),
                attendee.program_id.to_string(),
                attendee.first_name,
                attendee.last_name,
                attendee.date_of_birth.map(|d| d.to_string()),
                attendee.parent_name,
                attendee.parent_email,
                attendee.parent_phone,
                attendee.member_id.map(|id| id.to_string()),
                attendee.notes,
                attendee.import_id.map(|id| id.to_string()),
                attendee.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert attendee")?;
        Ok(())
    }

    pub fn get_attendees_by_program(&self, program_id: Uuid) -> Result<Vec<Attendee>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT attendee_id, program_id, first_name, last_name, date_of_birth::VARCHAR,
                    parent_name, parent_email, parent_phone, member_id, notes, import_id,
                    created_at
             FROM attendees WHERE program_id = ? ORDER BY last_name, first_name",
        )?;
        let attendees = stmt
            .query_map([program_id.to_string()], |row| {
                let id_str: String = row.get(0)?;
                let program_str: String = row.get(1)?;
                let dob: Option<String> = row.get(4)?;
                let member_id: Option<String> = row.get(8)?;
                let import_id: Option<String> = row.get(10)?;
                let created: String = row.get(11)?;
                Ok(Attendee {
                    id: parse_uuid(&id_str),
                    program_id: parse_uuid(&program_str),
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    date_of_birth: dob.as_deref().map(parse_date),
                    parent_name: row.get(5)?,
                    parent_email: row.get(6)?,
                    parent_phone: row.get(7)?,
                    member_id: member_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
                    notes: row.get(9)?,
                    import_id: import_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
                    created_at: parse_timestamp(&created),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(attendees)
    }

    // === Generic entity operations (used by the entity stores) ===

    /// Delete one entity row by id; returns false when nothing matched
    pub fn delete_entity(&self, kind: EntityKind, id: Uuid) -> Result<bool> {
        let (table, key) = entity_table(kind);
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE {} = ?", table, key),
                params![id.to_string()],
            )
            .with_context(|| format!("Failed to delete {} {}", kind, id))?;
        Ok(deleted > 0)
    }

    pub fn count_entities(&self, kind: EntityKind) -> Result<i64> {
        let (table, _) = entity_table(kind);
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn entity_exists(&self, kind: EntityKind, id: Uuid) -> Result<bool> {
        let (table, key) = entity_table(kind);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, key),
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // === Import history operations ===

    pub fn insert_import_history(&self, history: &ImportHistory) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO sys_import_history ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                HISTORY_COLUMNS
            ),
            params![
                history.id.to_string(),
                history.import_type.as_str(),
                history.imported_by,
                history.source.as_str(),
                history.file_name,
                history.stats.total_rows,
                history.stats.successful,
                history.stats.failed,
                history.stats.skipped,
                serde_json::to_string(&history.errors)?,
                serde_json::to_string(&history.imported_records)?,
                history.status.as_str(),
                history.started_at.to_rfc3339(),
                history.completed_at.map(|t| t.to_rfc3339()),
            ],
        )
        .context("Failed to insert import history")?;
        Ok(())
    }

    /// Persist the mutable parts of a run: stats, errors, manifest, status
    pub fn update_import_history(&self, history: &ImportHistory) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE sys_import_history SET
                    total_rows = ?, successful = ?, failed = ?, skipped = ?,
                    error_log = ?, manifest = ?, status = ?, completed_at = ?
                 WHERE import_id = ?",
                params![
                    history.stats.total_rows,
                    history.stats.successful,
                    history.stats.failed,
                    history.stats.skipped,
                    serde_json::to_string(&history.errors)?,
                    serde_json::to_string(&history.imported_records)?,
                    history.status.as_str(),
                    history.completed_at.map(|t| t.to_rfc3339()),
                    history.id.to_string(),
                ],
            )
            .context("Failed to update import history")?;
        if updated == 0 {
            return Err(Error::not_found(format!("Import {}", history.id)).into());
        }
        Ok(())
    }

    pub fn get_import_history(&self, id: Uuid) -> Result<Option<ImportHistory>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_import_history WHERE import_id = ?",
            HISTORY_COLUMNS
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_history(row)?)),
            None => Ok(None),
        }
    }

    /// Most recent runs first
    pub fn list_import_histories(&self, limit: usize) -> Result<Vec<ImportHistory>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_import_history ORDER BY started_at DESC LIMIT ?",
            HISTORY_COLUMNS
        ))?;
        let mut rows = stmt.query([limit as i64])?;
        let mut histories = Vec::new();
        while let Some(row) = rows.next()? {
            histories.push(row_to_history(row)?);
        }
        Ok(histories)
    }
}

impl ReferenceLookup for DuckDbRepository {
    fn find_member_by_email(&self, email: &str) -> Result<Option<Member>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM members WHERE email = ?",
            MEMBER_COLUMNS
        ))?;
        let mut rows = stmt.query([crate::domain::normalize_email(email)])?;
        Ok(rows.next()?.map(row_to_member))
    }

    /// Child members only: adults carry an email and are never matched here
    fn find_member_by_name_and_birth_date(
        &self,
        first_name: &str,
        last_name: &str,
        date_of_birth: Option<NaiveDate>,
    ) -> Result<Option<Member>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM members
             WHERE lower(first_name) = lower(?) AND lower(last_name) = lower(?)
               AND date_of_birth IS NOT DISTINCT FROM CAST(? AS DATE)
               AND email IS NULL
             LIMIT 1",
            MEMBER_COLUMNS
        ))?;
        let mut rows = stmt.query(params![
            first_name,
            last_name,
            date_of_birth.map(|d| d.to_string())
        ])?;
        Ok(rows.next()?.map(row_to_member))
    }

    fn find_program_by_name(&self, name: &str) -> Result<Option<Program>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM programs WHERE name = ?",
            PROGRAM_COLUMNS
        ))?;
        let mut rows = stmt.query([name])?;
        Ok(rows.next()?.map(row_to_program))
    }

    fn link_attendee_member(&self, attendee_id: Uuid, member_id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE attendees SET member_id = ? WHERE attendee_id = ?",
            params![member_id.to_string(), attendee_id.to_string()],
        )
        .context("Failed to link attendee to member")?;
        Ok(())
    }

    fn natural_key_exists(&self, key: &NaturalKey) -> Result<bool> {
        let (sql, value) = match key {
            NaturalKey::MemberEmail(email) => (
                "SELECT COUNT(*) FROM members WHERE email = ?",
                crate::domain::normalize_email(email),
            ),
            NaturalKey::ProgramName(name) => {
                ("SELECT COUNT(*) FROM programs WHERE name = ?", name.clone())
            }
        };
        let conn = self.lock()?;
        let count: i64 = conn.query_row(sql, [value], |row| row.get(0))?;
        Ok(count > 0)
    }
}

/// Table and primary key column for an entity kind
fn entity_table(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Member => ("members", "member_id"),
        EntityKind::Checkout => ("checkouts", "checkout_id"),
        EntityKind::Donation => ("donations", "donation_id"),
        EntityKind::Program => ("programs", "program_id"),
        EntityKind::Attendee => ("attendees", "attendee_id"),
    }
}

fn row_to_member(row: &duckdb::Row) -> Member {
    // Column order follows MEMBER_COLUMNS
    let id_str: String = row.get(0).unwrap_or_default();
    let dob: Option<String> = row.get(9).ok().flatten();
    let import_id: Option<String> = row.get(13).ok().flatten();
    let created_str: String = row.get(14).unwrap_or_default();

    Member {
        id: parse_uuid(&id_str),
        first_name: row.get(1).unwrap_or_default(),
        last_name: row.get(2).unwrap_or_default(),
        email: row.get(3).ok().flatten(),
        phone: row.get(4).ok().flatten(),
        address: row.get(5).ok().flatten(),
        city: row.get(6).ok().flatten(),
        state: row.get(7).ok().flatten(),
        zip_code: row.get(8).ok().flatten(),
        date_of_birth: dob.as_deref().map(parse_date),
        membership_type: row.get(10).ok().flatten(),
        parent_email: row.get(11).ok().flatten(),
        notes: row.get(12).ok().flatten(),
        import_id: import_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        created_at: parse_timestamp(&created_str),
    }
}

fn row_to_program(row: &duckdb::Row) -> Program {
    // Column order follows PROGRAM_COLUMNS
    let id_str: String = row.get(0).unwrap_or_default();
    let type_str: String = row.get(2).unwrap_or_default();
    let start: Option<String> = row.get(5).ok().flatten();
    let end: Option<String> = row.get(6).ok().flatten();
    let import_id: Option<String> = row.get(8).ok().flatten();
    let created_str: String = row.get(9).unwrap_or_default();

    Program {
        id: parse_uuid(&id_str),
        name: row.get(1).unwrap_or_default(),
        program_type: type_str.parse().unwrap_or(ProgramType::Other),
        description: row.get(3).ok().flatten(),
        location: row.get(4).ok().flatten(),
        start_date: start.as_deref().map(parse_date),
        end_date: end.as_deref().map(parse_date),
        auto_sync_attendees: row.get(7).unwrap_or(false),
        import_id: import_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        created_at: parse_timestamp(&created_str),
    }
}

fn row_to_history(row: &duckdb::Row) -> Result<ImportHistory> {
    // Column order follows HISTORY_COLUMNS
    let id_str: String = row.get(0)?;
    let import_type: String = row.get(1)?;
    let source: String = row.get(3)?;
    let errors_json: String = row.get(9)?;
    let manifest_json: String = row.get(10)?;
    let status: String = row.get(11)?;
    let started: String = row.get(12)?;
    let completed: Option<String> = row.get(13)?;

    let errors: Vec<ImportErrorEntry> =
        serde_json::from_str(&errors_json).context("Corrupt import error log")?;
    let imported_records: Vec<ImportedRecord> =
        serde_json::from_str(&manifest_json).context("Corrupt import manifest")?;

    Ok(ImportHistory {
        id: Uuid::parse_str(&id_str).context("Invalid import id")?,
        import_type: import_type.parse()?,
        imported_by: row.get(2)?,
        source: source.parse()?,
        file_name: row.get(4)?,
        stats: ImportStats {
            total_rows: row.get(5)?,
            successful: row.get(6)?,
            failed: row.get(7)?,
            skipped: row.get(8)?,
        },
        errors,
        imported_records,
        status: status.parse()?,
        started_at: parse_timestamp(&started),
        completed_at: completed.as_deref().map(parse_timestamp),
    })
}

// Helper functions

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}
