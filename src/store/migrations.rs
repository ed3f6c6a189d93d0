//! Schema migrations for the senior citizen database.
//!
//! Applied versions are recorded in `_migrations`; only newer ones run.

use libsql::Connection;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Append-only, ordered by version.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "senior_citizens",
        sql: r#"
            CREATE TABLE IF NOT EXISTS senior_citizens (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                barangay TEXT NOT NULL,
                contact_number TEXT,
                emergency_contact_number TEXT,
                birth_date TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_seniors_status ON senior_citizens(status);
            CREATE INDEX IF NOT EXISTS idx_seniors_barangay ON senior_citizens(barangay);
        "#,
    },
];

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

fn failed(what: &str, e: libsql::Error) -> DatabaseError {
    DatabaseError::Migration(format!("{what}: {e}"))
}

/// Bring the schema up to date. Safe to call on every start.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(LEDGER_DDL, ())
        .await
        .map_err(|e| failed("creating _migrations", e))?;

    let applied = get_current_version(conn).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        tracing::debug!(version = applied, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");
        conn.execute_batch(migration.sql)
            .await
            .map_err(|e| failed(&format!("V{} {}", migration.version, migration.name), e))?;
        seed_version(conn, migration).await?;
    }
    Ok(())
}

/// Highest applied version; 0 on a fresh database.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| failed("reading schema version", e))?;
    match rows.next().await.map_err(|e| failed("reading schema version", e))? {
        Some(row) => row.get(0).map_err(|e| failed("decoding schema version", e)),
        None => Ok(0),
    }
}

async fn seed_version(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![migration.version, migration.name],
    )
    .await
    .map_err(|e| failed(&format!("recording V{}", migration.version), e))?;
    Ok(())
}
