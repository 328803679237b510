//! SQL migration definitions for the metrics database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: publications, persona_stats",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per dashboard run
CREATE TABLE IF NOT EXISTS publications (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp      TEXT NOT NULL,
    success_count  INTEGER NOT NULL,
    error_count    INTEGER NOT NULL,
    links_inserted INTEGER NOT NULL,
    cost_usd       REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_publications_timestamp ON publications(timestamp);

-- Per-persona snapshot, appended on every dashboard run
CREATE TABLE IF NOT EXISTS persona_stats (
    persona     TEXT NOT NULL,
    posts_count INTEGER NOT NULL,
    avg_length  INTEGER NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
