//! Versioned schema migrations.
//!
//! Provides a compile-time embedded migration system that upgrades the
//! database schema once at startup. The resolution core only ever reads and
//! writes rows matching the migrated schema; it never mutates the schema
//! itself.

use crate::{Error, Result};
use rusqlite::Connection;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements separated by semicolons).
    pub sql: &'static str,
}

/// The embedded migration list.
///
/// Version 1 creates the tables the core owns. Version 2 creates the
/// boundary tables (`documents`, `entities`) that the ingestion and
/// business-data subsystems populate; the core only reads them, plus the
/// skip marker.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "core tables: links, suggestions, learned_patterns, decisions, skip ledger",
        sql: r"
            CREATE TABLE IF NOT EXISTS links (
                document_id TEXT PRIMARY KEY,
                entity_code TEXT NOT NULL,
                confidence REAL NOT NULL,
                method TEXT NOT NULL,
                evidence TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS suggestions (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                proposed_entity_code TEXT NOT NULL,
                confidence REAL NOT NULL,
                method TEXT NOT NULL,
                evidence TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL,
                decided_at INTEGER
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_suggestions_pending_document
                ON suggestions(document_id) WHERE status = 'pending';
            CREATE INDEX IF NOT EXISTS idx_suggestions_status
                ON suggestions(status, created_at);
            CREATE TABLE IF NOT EXISTS learned_patterns (
                pattern_type TEXT NOT NULL,
                key TEXT NOT NULL,
                target_code TEXT NOT NULL,
                confidence REAL NOT NULL,
                occurrences INTEGER NOT NULL DEFAULT 0,
                last_used INTEGER NOT NULL,
                PRIMARY KEY (pattern_type, key, target_code)
            );
            CREATE TABLE IF NOT EXISTS decisions (
                suggestion_id TEXT NOT NULL,
                action TEXT NOT NULL,
                corrected_entity_code TEXT,
                actor TEXT NOT NULL,
                decided_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS skipped_documents (
                document_id TEXT PRIMARY KEY,
                marked_at INTEGER NOT NULL
            );
        ",
    },
    Migration {
        version: 2,
        description: "boundary tables populated by ingestion and business-data subsystems",
        sql: r"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                origin_identifier TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                timestamp INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                canonical_code TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL DEFAULT ''
            );
        ",
    },
];

/// Runs embedded migrations against a `SQLite` connection.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Runs all pending migrations.
    ///
    /// Each migration's statements and its version record are applied within
    /// a single transaction, so a failed migration never leaves the schema
    /// half-updated.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails to apply.
    pub fn run(conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
        Self::ensure_migrations_table(conn)?;

        let current = Self::current_version(conn)?;
        for migration in migrations {
            if migration.version > current {
                Self::apply_migration(conn, migration)?;
            }
        }

        Ok(())
    }

    /// Returns the current schema version (0 if no migration has run).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn current_version(conn: &Connection) -> Result<i32> {
        let version = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);
        Ok(version)
    }

    fn ensure_migrations_table(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            )
            ",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_migrations_table".to_string(),
            cause: e.to_string(),
        })
    }

    fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
        let tx = conn.transaction().map_err(|e| Error::OperationFailed {
            operation: "migration_begin".to_string(),
            cause: e.to_string(),
        })?;

        tx.execute_batch(migration.sql)
            .map_err(|e| Error::OperationFailed {
                operation: format!("migration_v{}", migration.version),
                cause: e.to_string(),
            })?;

        tx.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                i64::try_from(crate::current_timestamp()).unwrap_or(0),
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "migration_record_version".to_string(),
            cause: e.to_string(),
        })?;

        tx.commit().map_err(|e| Error::OperationFailed {
            operation: "migration_commit".to_string(),
            cause: e.to_string(),
        })?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied schema migration"
        );

        Ok(())
    }
}
