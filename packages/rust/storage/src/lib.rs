//! libSQL metrics store (offline mode) for dashboard runs.
//!
//! [`MetricsStore`] keeps one `publications` row per dashboard run plus a
//! `persona_stats` snapshot per persona, suitable for charting in Grafana
//! or any SQLite-capable tool.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use pbnforge_shared::{PbnError, Result};

/// Aggregate outcome of one run, as stored in `publications`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationRecord {
    pub timestamp: DateTime<Utc>,
    pub success_count: u64,
    pub error_count: u64,
    pub links_inserted: u64,
    pub cost_usd: f64,
}

/// One `persona_stats` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaStat {
    pub persona: String,
    pub posts_count: u64,
    pub avg_length: u64,
}

/// Storage handle wrapping a libSQL database.
pub struct MetricsStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

fn storage_err(e: libsql::Error) -> PbnError {
    PbnError::Storage(e.to_string())
}

impl MetricsStore {
    /// Open or create a database at `path` and apply migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PbnError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PbnError::Storage(format!("migration v{} failed: {e}", migration.version))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Publications
    // -----------------------------------------------------------------------

    /// Insert one run aggregate. Returns the new row ID.
    pub async fn record_publication(&self, record: &PublicationRecord) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO publications (timestamp, success_count, error_count, links_inserted, cost_usd)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.timestamp.to_rfc3339(),
                    record.success_count as i64,
                    record.error_count as i64,
                    record.links_inserted as i64,
                    record.cost_usd,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All run aggregates, oldest first.
    pub async fn list_publications(&self) -> Result<Vec<PublicationRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT timestamp, success_count, error_count, links_inserted, cost_usd
                 FROM publications ORDER BY id",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let ts: String = row.get(0).map_err(storage_err)?;
            let timestamp = DateTime::parse_from_rfc3339(&ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| PbnError::Storage(format!("invalid timestamp '{ts}': {e}")))?;
            results.push(PublicationRecord {
                timestamp,
                success_count: row.get::<i64>(1).map_err(storage_err)? as u64,
                error_count: row.get::<i64>(2).map_err(storage_err)? as u64,
                links_inserted: row.get::<i64>(3).map_err(storage_err)? as u64,
                cost_usd: row.get::<f64>(4).map_err(storage_err)?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Persona stats
    // -----------------------------------------------------------------------

    /// Append a persona snapshot.
    pub async fn record_persona_stats(&self, stats: &[PersonaStat]) -> Result<()> {
        for stat in stats {
            self.conn
                .execute(
                    "INSERT INTO persona_stats (persona, posts_count, avg_length) VALUES (?1, ?2, ?3)",
                    params![
                        stat.persona.as_str(),
                        stat.posts_count as i64,
                        stat.avg_length as i64,
                    ],
                )
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }

    /// Every persona row in insertion order.
    pub async fn list_persona_stats(&self) -> Result<Vec<PersonaStat>> {
        let mut rows = self
            .conn
            .query(
                "SELECT persona, posts_count, avg_length FROM persona_stats ORDER BY rowid",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(PersonaStat {
                persona: row.get(0).map_err(storage_err)?,
                posts_count: row.get::<i64>(1).map_err(storage_err)? as u64,
                avg_length: row.get::<i64>(2).map_err(storage_err)? as u64,
            });
        }
        Ok(results)
    }
}
