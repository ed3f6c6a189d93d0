//! libSQL backend for the async `RecipientStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::sms::Recipient;
use crate::store::migrations;
use crate::store::traits::{Celebrant, NewSenior, RecipientStore, preferred_number};

/// Senior citizen records in a libSQL database.
///
/// One connection serves every query; `libsql::Connection` is `Send + Sync`.
pub struct LibSqlBackend {
    /// Held so the database outlives the connection.
    _db: LibSqlDatabase,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) the database file at `path`, creating parent
    /// directories as needed.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }
        let backend = Self::open(path).await?;
        info!(path = %path.display(), "Senior citizen database ready");
        Ok(backend)
    }

    /// Throwaway in-memory database, used by tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        Self::open(Path::new(":memory:")).await
    }

    async fn open(target: &Path) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(target)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Cannot open {}: {e}", target.display())))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Cannot connect: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self { _db: db, conn })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a senior query and collect the rows, skipping any that fail to map.
    async fn collect_seniors(
        &self,
        mut rows: libsql::Rows,
        context: &str,
    ) -> Result<Vec<SeniorRow>, DatabaseError> {
        let mut seniors = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("{context}: {e}")))?
        {
            match row_to_senior(&row) {
                Ok(senior) => seniors.push(senior),
                Err(e) => tracing::warn!("Skipping senior row: {e}"),
            }
        }
        Ok(seniors)
    }
}

// ── Helper functions ────────────────────────────────────────────────

const SENIOR_COLUMNS: &str =
    "first_name, last_name, contact_number, emergency_contact_number, birth_date";

/// Projection of a `senior_citizens` row used for notifications.
struct SeniorRow {
    first_name: String,
    last_name: String,
    contact_number: Option<String>,
    emergency_contact_number: Option<String>,
    birth_date: Option<String>,
}

impl SeniorRow {
    fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    fn recipient(&self) -> Option<Recipient> {
        let number = preferred_number(
            self.contact_number.as_deref(),
            self.emergency_contact_number.as_deref(),
        )?;
        Some(Recipient::new(number).with_name(self.display_name()))
    }
}

/// Map a libsql Row to a SeniorRow. Column order matches SENIOR_COLUMNS.
fn row_to_senior(row: &libsql::Row) -> Result<SeniorRow, libsql::Error> {
    Ok(SeniorRow {
        first_name: row.get(0)?,
        last_name: row.get(1)?,
        contact_number: row.get(2).ok(),
        emergency_contact_number: row.get(3).ok(),
        birth_date: row.get(4).ok(),
    })
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

// ── RecipientStore impl ─────────────────────────────────────────────

#[async_trait]
impl RecipientStore for LibSqlBackend {
    async fn insert_senior(&self, senior: &NewSenior) -> Result<String, DatabaseError> {
        for (field, value) in [
            ("first_name", &senior.first_name),
            ("last_name", &senior.last_name),
            ("barangay", &senior.barangay),
        ] {
            if value.trim().is_empty() {
                return Err(DatabaseError::Constraint(format!("{field} is required")));
            }
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let birth_date = senior.birth_date.map(|d| d.format("%Y-%m-%d").to_string());

        self.conn()
            .execute(
                "INSERT INTO senior_citizens (id, first_name, last_name, barangay, contact_number,
                    emergency_contact_number, birth_date, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id.clone(),
                    senior.first_name.trim(),
                    senior.last_name.trim(),
                    senior.barangay.trim(),
                    opt_text(senior.contact_number.as_deref()),
                    opt_text(senior.emergency_contact_number.as_deref()),
                    opt_text(birth_date.as_deref()),
                    senior.status.as_str(),
                    now.clone(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_senior: {e}")))?;

        debug!(senior_id = %id, barangay = %senior.barangay, "Inserted senior citizen");
        Ok(id)
    }

    async fn active_recipients(
        &self,
        barangay: Option<&str>,
    ) -> Result<Vec<Recipient>, DatabaseError> {
        let conn = self.conn();
        let rows = match barangay.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => {
                conn.query(
                    &format!(
                        "SELECT {SENIOR_COLUMNS} FROM senior_citizens
                         WHERE status = 'active' AND lower(barangay) = lower(?1)
                         ORDER BY last_name, first_name"
                    ),
                    params![b],
                )
                .await
            }
            None => {
                conn.query(
                    &format!(
                        "SELECT {SENIOR_COLUMNS} FROM senior_citizens
                         WHERE status = 'active'
                         ORDER BY last_name, first_name"
                    ),
                    (),
                )
                .await
            }
        }
        .map_err(|e| DatabaseError::Query(format!("active_recipients: {e}")))?;

        let seniors = self.collect_seniors(rows, "active_recipients").await?;
        let total = seniors.len();
        let recipients: Vec<Recipient> = seniors.iter().filter_map(SeniorRow::recipient).collect();

        debug!(
            barangay = ?barangay,
            seniors = total,
            reachable = recipients.len(),
            "Loaded SMS recipients"
        );
        Ok(recipients)
    }

    async fn birthday_celebrants(
        &self,
        date: NaiveDate,
        barangay: Option<&str>,
    ) -> Result<Vec<Celebrant>, DatabaseError> {
        let conn = self.conn();
        let month_day = date.format("%m-%d").to_string();
        // Leap-day births are greeted on Feb 28 in common years.
        let common_year = NaiveDate::from_ymd_opt(date.year(), 2, 29).is_none();
        let leap_day = if month_day == "02-28" && common_year {
            "02-29".to_string()
        } else {
            month_day.clone()
        };
        let rows = match barangay.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => {
                conn.query(
                    &format!(
                        "SELECT {SENIOR_COLUMNS} FROM senior_citizens
                         WHERE status = 'active' AND strftime('%m-%d', birth_date) IN (?1, ?2)
                           AND lower(barangay) = lower(?3)
                         ORDER BY last_name, first_name"
                    ),
                    params![month_day, leap_day, b],
                )
                .await
            }
            None => {
                conn.query(
                    &format!(
                        "SELECT {SENIOR_COLUMNS} FROM senior_citizens
                         WHERE status = 'active' AND strftime('%m-%d', birth_date) IN (?1, ?2)
                         ORDER BY last_name, first_name"
                    ),
                    params![month_day, leap_day],
                )
                .await
            }
        }
        .map_err(|e| DatabaseError::Query(format!("birthday_celebrants: {e}")))?;

        let seniors = self.collect_seniors(rows, "birthday_celebrants").await?;
        let celebrants = seniors
            .iter()
            .filter_map(|s| {
                let born = NaiveDate::parse_from_str(s.birth_date.as_deref()?, "%Y-%m-%d").ok()?;
                // Month and day already match, so the age is the year difference.
                let age = u32::try_from(date.year() - born.year()).ok()?;
                Some(Celebrant {
                    recipient: s.recipient()?,
                    age,
                })
            })
            .collect();
        Ok(celebrants)
    }
}
