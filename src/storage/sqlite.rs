//! `SQLite` persistence for links, suggestions and learned patterns.
//!
//! All shared-state writes are single-row statements or short transactions
//! keyed by the row's natural key; the connection sits behind a mutex with
//! poison recovery.

use crate::models::{
    Decision, Document, DocumentId, Entity, EntityCode, LearnedPattern, Link, LinkMethod,
    PatternType, Suggestion, SuggestionId, SuggestionStatus,
};
use crate::storage::migrations::{MigrationRunner, MIGRATIONS};
use crate::storage::{DocumentSource, EntityCatalog};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Helper to acquire the connection mutex with poison recovery.
///
/// If the mutex is poisoned (a panic in a previous critical section), we
/// recover the inner value and log a warning. The connection state is still
/// valid; this prevents cascading failures when one operation panics.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Escapes SQL LIKE wildcards in a string.
///
/// `%` and `_` in user-derived tokens must be treated literally when used in
/// a LIKE clause. Uses `\` as the escape character (requires `ESCAPE '\'`).
fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Configures a `SQLite` connection for concurrent access.
///
/// WAL journal mode for concurrent readers, NORMAL synchronous, and a 5
/// second busy timeout so lock contention waits instead of failing.
fn configure_connection(conn: &Connection) {
    // journal_mode returns a string result which execute_batch would choke on
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
}

fn op_err(operation: &str, cause: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: cause.to_string(),
    }
}

#[allow(clippy::cast_possible_wrap)]
fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[allow(clippy::cast_sign_loss)]
fn to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Store contents summary.
#[derive(Debug, Clone, Default)]
pub struct StoreStatus {
    /// Confirmed links, by method.
    pub links_by_method: Vec<(String, u64)>,
    /// Total confirmed links.
    pub links: u64,
    /// Suggestions awaiting review.
    pub pending_suggestions: u64,
    /// Suggestions already decided.
    pub decided_suggestions: u64,
    /// Learned patterns.
    pub patterns: u64,
    /// Documents marked skipped.
    pub skipped_documents: u64,
}

/// SQLite-backed store for the resolution core.
pub struct SqliteStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path and applies pending
    /// schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| op_err("create_data_dir", e))?;
            }
        }

        let mut conn = Connection::open(path).map_err(|e| op_err("open_database", e))?;
        configure_connection(&conn);
        MigrationRunner::run(&mut conn, MIGRATIONS)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store with the full schema applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|e| op_err("open_database", e))?;
        configure_connection(&conn);
        MigrationRunner::run(&mut conn, MIGRATIONS)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ----- links -----

    /// Returns the link for a document, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn link_for_document(&self, document_id: &DocumentId) -> Result<Option<Link>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT document_id, entity_code, confidence, method, evidence, created_at
             FROM links WHERE document_id = ?1",
            [document_id.as_str()],
            link_from_row,
        )
        .optional()
        .map_err(|e| op_err("link_for_document", e))
    }

    /// Inserts a link unless the document is already linked.
    ///
    /// Returns `true` when the link was written, `false` when a link already
    /// existed (idempotent no-op).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_link(&self, link: &Link) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let rows = conn
            .execute(
                "INSERT OR IGNORE INTO links
                 (document_id, entity_code, confidence, method, evidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    link.document_id.as_str(),
                    link.entity_code.as_str(),
                    link.confidence,
                    link.method.as_str(),
                    link.evidence,
                    to_i64(link.created_at),
                ],
            )
            .map_err(|e| op_err("insert_link", e))?;
        Ok(rows > 0)
    }

    // ----- suggestions -----

    /// Enqueues a suggestion unless the document already has a pending one.
    ///
    /// Returns `true` when enqueued, `false` when a pending suggestion for
    /// the document already existed (idempotent no-op).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let rows = conn
            .execute(
                "INSERT OR IGNORE INTO suggestions
                 (id, document_id, proposed_entity_code, confidence, method, evidence,
                  status, created_at, decided_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
                params![
                    suggestion.id.as_str(),
                    suggestion.document_id.as_str(),
                    suggestion.proposed_entity_code.as_str(),
                    suggestion.confidence,
                    suggestion.method.as_str(),
                    suggestion.evidence,
                    suggestion.status.as_str(),
                    to_i64(suggestion.created_at),
                ],
            )
            .map_err(|e| op_err("insert_suggestion", e))?;
        Ok(rows > 0)
    }

    /// Returns a suggestion by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn suggestion(&self, id: &SuggestionId) -> Result<Option<Suggestion>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT id, document_id, proposed_entity_code, confidence, method, evidence,
                    status, created_at, decided_at
             FROM suggestions WHERE id = ?1",
            [id.as_str()],
            suggestion_from_row,
        )
        .optional()
        .map_err(|e| op_err("suggestion", e))
    }

    /// Lists pending suggestions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pending_suggestions(&self, limit: usize) -> Result<Vec<Suggestion>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT id, document_id, proposed_entity_code, confidence, method, evidence,
                        status, created_at, decided_at
                 FROM suggestions WHERE status = 'pending'
                 ORDER BY created_at ASC LIMIT ?1",
            )
            .map_err(|e| op_err("pending_suggestions", e))?;
        let rows = stmt
            .query_map([to_i64(limit as u64)], suggestion_from_row)
            .map_err(|e| op_err("pending_suggestions", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| op_err("pending_suggestions", e))
    }

    /// Finalizes a suggestion and persists its decision atomically.
    ///
    /// The status transition is guarded by `status = 'pending'`, so a second
    /// decision attempt rolls back and surfaces [`Error::Conflict`] with the
    /// terminal status it found — exactly-once semantics without long-held
    /// locks. When `link` is present it is written in the same transaction;
    /// a skip decision writes the skip ledger row too.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the suggestion is already terminal,
    /// [`Error::InvalidInput`] if it does not exist, or
    /// [`Error::OperationFailed`] if the transaction fails.
    pub fn apply_decision(
        &self,
        decision: &Decision,
        link: Option<&Link>,
        skip_document: Option<&DocumentId>,
    ) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| op_err("decision_begin", e))?;

        let status = decision.action.terminal_status();
        let updated = tx
            .execute(
                "UPDATE suggestions SET status = ?1, decided_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![
                    status.as_str(),
                    to_i64(decision.decided_at),
                    decision.suggestion_id.as_str(),
                ],
            )
            .map_err(|e| op_err("decision_update", e))?;

        if updated == 0 {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT status FROM suggestions WHERE id = ?1",
                    [decision.suggestion_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| op_err("decision_status", e))?;
            // transaction drops without commit; nothing was mutated
            return match existing {
                Some(terminal) => {
                    metrics::counter!("suggestion_decision_conflicts_total").increment(1);
                    Err(Error::Conflict {
                        suggestion_id: decision.suggestion_id.as_str().to_string(),
                        status: terminal,
                    })
                },
                None => Err(Error::InvalidInput(format!(
                    "no such suggestion: {}",
                    decision.suggestion_id
                ))),
            };
        }

        if let Some(link) = link {
            // Corrections supersede; approvals never overwrite an existing link
            let sql = if link.method == LinkMethod::Manual {
                "INSERT OR REPLACE INTO links
                 (document_id, entity_code, confidence, method, evidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            } else {
                "INSERT OR IGNORE INTO links
                 (document_id, entity_code, confidence, method, evidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            };
            tx.execute(
                sql,
                params![
                    link.document_id.as_str(),
                    link.entity_code.as_str(),
                    link.confidence,
                    link.method.as_str(),
                    link.evidence,
                    to_i64(link.created_at),
                ],
            )
            .map_err(|e| op_err("decision_link", e))?;
        }

        if let Some(document_id) = skip_document {
            tx.execute(
                "INSERT OR IGNORE INTO skipped_documents (document_id, marked_at) VALUES (?1, ?2)",
                params![document_id.as_str(), to_i64(decision.decided_at)],
            )
            .map_err(|e| op_err("decision_skip_marker", e))?;
        }

        tx.execute(
            "INSERT INTO decisions (suggestion_id, action, corrected_entity_code, actor, decided_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                decision.suggestion_id.as_str(),
                decision.action.as_str(),
                decision.corrected_entity_code.as_ref().map(EntityCode::as_str),
                decision.actor,
                to_i64(decision.decided_at),
            ],
        )
        .map_err(|e| op_err("decision_record", e))?;

        tx.commit().map_err(|e| op_err("decision_commit", e))
    }

    // ----- learned patterns -----

    /// Returns patterns for a key, ranked by confidence descending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn patterns_for_key(
        &self,
        pattern_type: PatternType,
        key: &str,
    ) -> Result<Vec<LearnedPattern>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT pattern_type, key, target_code, confidence, occurrences, last_used
                 FROM learned_patterns WHERE pattern_type = ?1 AND key = ?2
                 ORDER BY confidence DESC",
            )
            .map_err(|e| op_err("patterns_for_key", e))?;
        let rows = stmt
            .query_map(params![pattern_type.as_str(), key], pattern_from_row)
            .map_err(|e| op_err("patterns_for_key", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| op_err("patterns_for_key", e))
    }

    /// Returns one pattern by its full natural key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pattern(
        &self,
        pattern_type: PatternType,
        key: &str,
        target: &EntityCode,
    ) -> Result<Option<LearnedPattern>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT pattern_type, key, target_code, confidence, occurrences, last_used
             FROM learned_patterns
             WHERE pattern_type = ?1 AND key = ?2 AND target_code = ?3",
            params![pattern_type.as_str(), key, target.as_str()],
            pattern_from_row,
        )
        .optional()
        .map_err(|e| op_err("pattern", e))
    }

    /// Inserts or replaces a pattern row, keyed by
    /// `(pattern_type, key, target_code)`.
    ///
    /// Only the learning loop calls this; matchers are read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn upsert_pattern(&self, pattern: &LearnedPattern) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO learned_patterns
             (pattern_type, key, target_code, confidence, occurrences, last_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(pattern_type, key, target_code) DO UPDATE SET
               confidence = excluded.confidence,
               occurrences = excluded.occurrences,
               last_used = excluded.last_used",
            params![
                pattern.pattern_type.as_str(),
                pattern.key,
                pattern.target_code.as_str(),
                pattern.confidence,
                to_i64(pattern.occurrences),
                to_i64(pattern.last_used),
            ],
        )
        .map_err(|e| op_err("upsert_pattern", e))?;
        Ok(())
    }

    /// Lists all patterns ranked by confidence descending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_patterns(&self, limit: usize) -> Result<Vec<LearnedPattern>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT pattern_type, key, target_code, confidence, occurrences, last_used
                 FROM learned_patterns ORDER BY confidence DESC, occurrences DESC LIMIT ?1",
            )
            .map_err(|e| op_err("all_patterns", e))?;
        let rows = stmt
            .query_map([to_i64(limit as u64)], pattern_from_row)
            .map_err(|e| op_err("all_patterns", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| op_err("all_patterns", e))
    }

    // ----- skip ledger -----

    /// Marks a document so future runs never resurface it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn mark_skipped(&self, document_id: &DocumentId) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT OR IGNORE INTO skipped_documents (document_id, marked_at) VALUES (?1, ?2)",
            params![document_id.as_str(), to_i64(crate::current_timestamp())],
        )
        .map_err(|e| op_err("mark_skipped", e))?;
        Ok(())
    }

    /// Returns a document by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn document(&self, document_id: &DocumentId) -> Result<Option<Document>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT id, origin_identifier, subject, body, timestamp
             FROM documents WHERE id = ?1",
            [document_id.as_str()],
            document_from_row,
        )
        .optional()
        .map_err(|e| op_err("document", e))
    }

    // ----- status -----

    /// Summarizes store contents.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn status(&self) -> Result<StoreStatus> {
        let conn = acquire_lock(&self.conn);

        let count = |sql: &str| -> Result<u64> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(to_u64)
                .map_err(|e| op_err("status", e))
        };

        let mut status = StoreStatus {
            links: count("SELECT COUNT(*) FROM links")?,
            pending_suggestions: count(
                "SELECT COUNT(*) FROM suggestions WHERE status = 'pending'",
            )?,
            decided_suggestions: count(
                "SELECT COUNT(*) FROM suggestions WHERE status != 'pending'",
            )?,
            patterns: count("SELECT COUNT(*) FROM learned_patterns")?,
            skipped_documents: count("SELECT COUNT(*) FROM skipped_documents")?,
            ..StoreStatus::default()
        };

        let mut stmt = conn
            .prepare("SELECT method, COUNT(*) FROM links GROUP BY method ORDER BY method")
            .map_err(|e| op_err("status", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, to_u64(row.get::<_, i64>(1)?)))
            })
            .map_err(|e| op_err("status", e))?;
        status.links_by_method = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| op_err("status", e))?;

        Ok(status)
    }

    // ----- ingestion-side helpers -----

    /// Inserts a document on behalf of the ingestion boundary.
    ///
    /// Corrlink never calls this during resolution; it exists for ingestion
    /// tooling and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_document(&self, document: &Document) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT OR IGNORE INTO documents (id, origin_identifier, subject, body, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                document.id.as_str(),
                document.origin_identifier,
                document.subject,
                document.body,
                to_i64(document.timestamp),
            ],
        )
        .map_err(|e| op_err("insert_document", e))?;
        Ok(())
    }

    /// Inserts an entity on behalf of the business-data boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert_entity(&self, entity: &Entity) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT OR IGNORE INTO entities (id, canonical_code, display_name)
             VALUES (?1, ?2, ?3)",
            params![entity.id, entity.canonical_code.as_str(), entity.display_name],
        )
        .map_err(|e| op_err("insert_entity", e))?;
        Ok(())
    }
}

impl DocumentSource for SqliteStore {
    fn fetch_unresolved(&self, limit: usize) -> Result<Vec<Document>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT d.id, d.origin_identifier, d.subject, d.body, d.timestamp
                 FROM documents d
                 WHERE NOT EXISTS (SELECT 1 FROM links l WHERE l.document_id = d.id)
                   AND NOT EXISTS (SELECT 1 FROM skipped_documents s WHERE s.document_id = d.id)
                   AND NOT EXISTS (SELECT 1 FROM suggestions g
                                   WHERE g.document_id = d.id AND g.status = 'pending')
                 ORDER BY d.timestamp ASC LIMIT ?1",
            )
            .map_err(|e| op_err("fetch_unresolved", e))?;
        let rows = stmt
            .query_map([to_i64(limit as u64)], document_from_row)
            .map_err(|e| op_err("fetch_unresolved", e))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| op_err("fetch_unresolved", e))
    }
}

impl EntityCatalog for SqliteStore {
    fn entity_by_code(&self, code: &EntityCode) -> Result<Option<Entity>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT id, canonical_code, display_name FROM entities WHERE canonical_code = ?1",
            [code.as_str()],
            entity_from_row,
        )
        .optional()
        .map_err(|e| op_err("entity_by_code", e))
    }

    fn candidate_shortlist(&self, document: &Document, limit: usize) -> Result<Vec<Entity>> {
        let conn = acquire_lock(&self.conn);
        let mut candidates: Vec<Entity> = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

        // Name tokens from the subject first: the most specific signal
        let mut tokens: Vec<String> = document
            .subject
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 4)
            .map(str::to_lowercase)
            .collect();
        tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
        tokens.truncate(5);

        for token in &tokens {
            let pattern = format!("%{}%", escape_like_wildcards(token));
            let mut stmt = conn
                .prepare(
                    "SELECT id, canonical_code, display_name FROM entities
                     WHERE LOWER(display_name) LIKE ?1 ESCAPE '\\' LIMIT ?2",
                )
                .map_err(|e| op_err("candidate_shortlist", e))?;
            let rows = stmt
                .query_map(params![pattern, to_i64(limit as u64)], entity_from_row)
                .map_err(|e| op_err("candidate_shortlist", e))?;
            for entity in rows {
                let entity = entity.map_err(|e| op_err("candidate_shortlist", e))?;
                if seen.insert(entity.canonical_code.as_str().to_string()) {
                    candidates.push(entity);
                }
            }
        }

        // Fill the remainder with recently-linked entities
        if candidates.len() < limit {
            let mut stmt = conn
                .prepare(
                    "SELECT e.id, e.canonical_code, e.display_name
                     FROM entities e
                     JOIN links l ON l.entity_code = e.canonical_code
                     GROUP BY e.canonical_code
                     ORDER BY MAX(l.created_at) DESC LIMIT ?1",
                )
                .map_err(|e| op_err("candidate_shortlist", e))?;
            let rows = stmt
                .query_map([to_i64(limit as u64)], entity_from_row)
                .map_err(|e| op_err("candidate_shortlist", e))?;
            for entity in rows {
                let entity = entity.map_err(|e| op_err("candidate_shortlist", e))?;
                if seen.insert(entity.canonical_code.as_str().to_string()) {
                    candidates.push(entity);
                }
            }
        }

        candidates.truncate(limit);
        Ok(candidates)
    }
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    let method: String = row.get(3)?;
    Ok(Link {
        document_id: DocumentId::new(row.get::<_, String>(0)?),
        entity_code: EntityCode::new(row.get::<_, String>(1)?),
        confidence: row.get(2)?,
        method: LinkMethod::parse(&method).unwrap_or(LinkMethod::Manual),
        evidence: row.get(4)?,
        created_at: to_u64(row.get(5)?),
    })
}

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<Suggestion> {
    let method: String = row.get(4)?;
    let status: String = row.get(6)?;
    Ok(Suggestion {
        id: SuggestionId::new(row.get::<_, String>(0)?),
        document_id: DocumentId::new(row.get::<_, String>(1)?),
        proposed_entity_code: EntityCode::new(row.get::<_, String>(2)?),
        confidence: row.get(3)?,
        method: LinkMethod::parse(&method).unwrap_or(LinkMethod::Oracle),
        evidence: row.get(5)?,
        status: SuggestionStatus::parse(&status).unwrap_or(SuggestionStatus::Pending),
        created_at: to_u64(row.get(7)?),
        decided_at: row.get::<_, Option<i64>>(8)?.map(to_u64),
    })
}

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<LearnedPattern> {
    let pattern_type: String = row.get(0)?;
    Ok(LearnedPattern {
        pattern_type: PatternType::parse(&pattern_type).unwrap_or(PatternType::Sender),
        key: row.get(1)?,
        target_code: EntityCode::new(row.get::<_, String>(2)?),
        confidence: row.get(3)?,
        occurrences: to_u64(row.get(4)?),
        last_used: to_u64(row.get(5)?),
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: DocumentId::new(row.get::<_, String>(0)?),
        origin_identifier: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        timestamp: to_u64(row.get(4)?),
    })
}

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        canonical_code: EntityCode::new(row.get::<_, String>(1)?),
        display_name: row.get(2)?,
    })
}
