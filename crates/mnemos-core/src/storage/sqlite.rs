//! SQLite-backed storage for memory entries, the entity graph, the access
//! log, and the Hebbian co-activation graph.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::memory::{AccessLogEntry, GraphLink, HebbianLink, Layer, MemoryEntry, MemoryKind};

/// Storage-layer error type.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("memory not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// An access-log row paired with the memory it refers to.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub memory_id: String,
    pub entry: AccessLogEntry,
}

/// Durable storage for the whole engine state: memory entries, the
/// caller-supplied entity graph, the access log, and the Hebbian graph.
///
/// Uses separate reader/writer connections for interior mutability; every
/// method takes `&self`, so the engine façade can share one `Store` behind
/// an `Arc` without an outer mutex.
pub struct Store {
    writer: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
}

impl Store {
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (creating if necessary) a store at `path`, applying any pending
    /// migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer_conn = Connection::open(path)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(writer_conn)),
            reader: Arc::new(Mutex::new(reader_conn)),
        })
    }

    /// Open a private, in-memory store. Useful for tests and ephemeral
    /// sessions; state does not survive past the `Store` being dropped.
    pub fn open_in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        // A second in-memory connection would be a distinct, empty database,
        // so the in-memory store shares one connection for both roles.
        let shared = Arc::new(Mutex::new(writer_conn));
        Ok(Self {
            writer: Arc::clone(&shared),
            reader: shared,
        })
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryEntry> {
        let kind_str: String = row.get("kind")?;
        let layer_str: String = row.get("layer")?;
        let embedding: Option<Vec<u8>> = row.get("embedding")?;

        Ok(MemoryEntry {
            id: row.get("id")?,
            content: row.get("content")?,
            summary: row.get("summary")?,
            kind: MemoryKind::parse_name(&kind_str).unwrap_or_default(),
            layer: Layer::parse_name(&layer_str).unwrap_or_default(),
            created_at: row.get("created_at")?,
            working_strength: row.get("working_strength")?,
            core_strength: row.get("core_strength")?,
            importance: row.get("importance")?,
            pinned: row.get::<_, i64>("pinned")? != 0,
            consolidation_count: row.get::<_, i64>("consolidation_count")? as u32,
            last_consolidated: row.get("last_consolidated")?,
            source: row.get("source")?,
            contradicts: row.get("contradicts")?,
            contradicted_by: row.get("contradicted_by")?,
            embedding: embedding.map(|bytes| bytes_to_vec_f32(&bytes)),
        })
    }

    /// Insert a brand-new entry.
    pub fn insert(&self, entry: &MemoryEntry) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "INSERT INTO memories (
                id, content, summary, kind, layer, created_at,
                working_strength, core_strength, importance, pinned,
                consolidation_count, last_consolidated, source,
                contradicts, contradicted_by, embedding
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                entry.id,
                entry.content,
                entry.summary,
                entry.kind.as_str(),
                entry.layer.as_str(),
                entry.created_at,
                entry.working_strength,
                entry.core_strength,
                entry.importance,
                entry.pinned as i64,
                entry.consolidation_count,
                entry.last_consolidated,
                entry.source,
                entry.contradicts,
                entry.contradicted_by,
                entry.embedding.as_ref().map(|v| vec_f32_to_bytes(v)),
            ],
        )?;

        if entry.contradicts.is_some() {
            if let Some(ref prior_id) = entry.contradicts {
                conn.execute(
                    "UPDATE memories SET contradicted_by = ?1 WHERE id = ?2",
                    params![entry.id, prior_id],
                )?;
            }
        }

        tracing::debug!(id = %entry.id, kind = %entry.kind.as_str(), "inserted memory");
        Ok(())
    }

    /// Fetch an entry without recording an access.
    pub fn peek(&self, id: &str) -> Result<Option<MemoryEntry>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row("SELECT * FROM memories WHERE id = ?1", params![id], |row| {
            Self::row_to_entry(row)
        })
        .optional()
        .map_err(StorageError::from)
    }

    /// Fetch an entry and record the access in the access log.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<MemoryEntry>> {
        let entry = self.peek(id)?;
        if entry.is_some() {
            self.record_access(id, now)?;
        }
        Ok(entry)
    }

    /// Persist an updated entry (full overwrite of the mutable columns).
    pub fn update(&self, entry: &MemoryEntry) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let changed = conn.execute(
            "UPDATE memories SET
                content = ?2, summary = ?3, kind = ?4, layer = ?5,
                working_strength = ?6, core_strength = ?7, importance = ?8,
                pinned = ?9, consolidation_count = ?10, last_consolidated = ?11,
                source = ?12, contradicts = ?13, contradicted_by = ?14, embedding = ?15
             WHERE id = ?1",
            params![
                entry.id,
                entry.content,
                entry.summary,
                entry.kind.as_str(),
                entry.layer.as_str(),
                entry.working_strength,
                entry.core_strength,
                entry.importance,
                entry.pinned as i64,
                entry.consolidation_count,
                entry.last_consolidated,
                entry.source,
                entry.contradicts,
                entry.contradicted_by,
                entry.embedding.as_ref().map(|v| vec_f32_to_bytes(v)),
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(entry.id.clone()));
        }
        Ok(())
    }

    /// Delete an entry (cascades to its access log rows, graph links, and
    /// Hebbian links).
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let changed = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        if changed > 0 {
            tracing::debug!(id = %id, "deleted memory");
        } else {
            tracing::warn!(id = %id, "delete requested for a memory that no longer exists");
        }
        Ok(changed > 0)
    }

    /// Every entry in the store, unfiltered. Used by consolidation sweeps.
    pub fn all_entries(&self) -> Result<Vec<MemoryEntry>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT * FROM memories")?;
        let rows = stmt.query_map([], Self::row_to_entry)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Full-text search over content + summary via FTS5, sanitized against
    /// operator injection by quoting every token.
    pub fn search_fts(&self, query: &str, limit: usize) -> Result<Vec<MemoryEntry>> {
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT m.* FROM memories m
             JOIN memories_fts f ON f.id = m.id
             WHERE memories_fts MATCH ?1
             ORDER BY bm25(memories_fts) LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![sanitized, limit as i64], Self::row_to_entry)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// All entries linked to `entity` in the caller-supplied entity graph.
    pub fn search_by_entity(&self, entity: &str) -> Result<Vec<MemoryEntry>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT m.* FROM memories m
             JOIN graph_links g ON g.memory_id = m.id
             WHERE g.entity = ?1",
        )?;
        let rows = stmt.query_map(params![entity], Self::row_to_entry)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Entity graph edges attached to `memory_id`.
    pub fn graph_links_for(&self, memory_id: &str) -> Result<Vec<GraphLink>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT memory_id, entity, relation FROM graph_links WHERE memory_id = ?1")?;
        let rows = stmt.query_map(params![memory_id], |row| {
            Ok(GraphLink {
                memory_id: row.get(0)?,
                entity: row.get(1)?,
                relation: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Other memories that share at least one entity with `memory_id`.
    pub fn related_entities(&self, memory_id: &str) -> Result<Vec<MemoryEntry>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT DISTINCT m.* FROM memories m
             JOIN graph_links g2 ON g2.memory_id = m.id
             WHERE g2.entity IN (SELECT entity FROM graph_links WHERE memory_id = ?1)
               AND m.id != ?1",
        )?;
        let rows = stmt.query_map(params![memory_id], Self::row_to_entry)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Replace the entity-graph edges for `memory_id`.
    pub fn set_graph_links(&self, memory_id: &str, links: &[(String, String)]) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "DELETE FROM graph_links WHERE memory_id = ?1",
            params![memory_id],
        )?;
        for (entity, relation) in links {
            conn.execute(
                "INSERT OR IGNORE INTO graph_links (memory_id, entity, relation) VALUES (?1, ?2, ?3)",
                params![memory_id, entity, relation],
            )?;
        }
        Ok(())
    }

    /// Cosine-similarity ranking against every stored embedding. Acceptable
    /// as a linear scan at the scale this store targets; swapping in an
    /// approximate index is an external concern, not this store's job.
    pub fn vector_search(&self, query: &[f32], limit: usize) -> Result<Vec<(MemoryEntry, f32)>> {
        let entries = self.all_entries()?;
        let mut scored: Vec<(MemoryEntry, f32)> = entries
            .into_iter()
            .filter_map(|entry| {
                let sim = entry
                    .embedding
                    .as_deref()
                    .map(|vec| cosine_similarity(query, vec))?;
                Some((entry, sim))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Record one access of `memory_id` at `at`.
    pub fn record_access(&self, memory_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "INSERT INTO access_log (memory_id, accessed_at) VALUES (?1, ?2)",
            params![memory_id, at],
        )?;
        Ok(())
    }

    /// Every access timestamp recorded for `memory_id`, oldest first.
    pub fn access_history(&self, memory_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT accessed_at FROM access_log WHERE memory_id = ?1 ORDER BY accessed_at ASC",
        )?;
        let rows = stmt.query_map(params![memory_id], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// The `limit` most recent access-log rows across all memories, newest
    /// first. Used to find the window a reward call should strengthen.
    pub fn recent_accesses(&self, limit: usize) -> Result<Vec<AccessRecord>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT memory_id, accessed_at FROM access_log ORDER BY accessed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(AccessRecord {
                memory_id: row.get(0)?,
                entry: AccessLogEntry {
                    timestamp: row.get(1)?,
                },
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Fetch a Hebbian link between `a` and `b` (order-independent).
    pub fn hebbian_get(&self, a: &str, b: &str) -> Result<Option<HebbianLink>> {
        let (lo, hi) = HebbianLink::canonical_pair(a, b);
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row(
            "SELECT a, b, strength, co_activation_count, created_at FROM hebbian_links
             WHERE a = ?1 AND b = ?2",
            params![lo, hi],
            |row| {
                Ok(HebbianLink {
                    a: row.get(0)?,
                    b: row.get(1)?,
                    strength: row.get(2)?,
                    co_activation_count: row.get::<_, i64>(3)? as u32,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(StorageError::from)
    }

    /// Insert or overwrite a Hebbian link.
    pub fn hebbian_upsert(&self, link: &HebbianLink) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "INSERT INTO hebbian_links (a, b, strength, co_activation_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(a, b) DO UPDATE SET
                strength = excluded.strength,
                co_activation_count = excluded.co_activation_count",
            params![
                link.a,
                link.b,
                link.strength,
                link.co_activation_count,
                link.created_at
            ],
        )?;
        Ok(())
    }

    /// Remove a Hebbian link.
    pub fn hebbian_delete(&self, a: &str, b: &str) -> Result<()> {
        let (lo, hi) = HebbianLink::canonical_pair(a, b);
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "DELETE FROM hebbian_links WHERE a = ?1 AND b = ?2",
            params![lo, hi],
        )?;
        Ok(())
    }

    /// Every Hebbian link touching `id` with strength at or above `floor`.
    pub fn hebbian_neighbors(&self, id: &str, floor: f64) -> Result<Vec<HebbianLink>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT a, b, strength, co_activation_count, created_at FROM hebbian_links
             WHERE (a = ?1 OR b = ?1) AND strength >= ?2",
        )?;
        let rows = stmt.query_map(params![id, floor], |row| {
            Ok(HebbianLink {
                a: row.get(0)?,
                b: row.get(1)?,
                strength: row.get(2)?,
                co_activation_count: row.get::<_, i64>(3)? as u32,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Every Hebbian link in the store. Used by consolidation's decay pass.
    pub fn hebbian_all(&self) -> Result<Vec<HebbianLink>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT a, b, strength, co_activation_count, created_at FROM hebbian_links")?;
        let rows = stmt.query_map([], |row| {
            Ok(HebbianLink {
                a: row.get(0)?,
                b: row.get(1)?,
                strength: row.get(2)?,
                co_activation_count: row.get::<_, i64>(3)? as u32,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)
    }

    /// Total number of Hebbian links currently materialized.
    pub fn hebbian_count(&self) -> Result<u64> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row("SELECT COUNT(*) FROM hebbian_links", [], |row| row.get(0))
            .map(|n: i64| n as u64)
            .map_err(StorageError::from)
    }

    /// Write a self-contained snapshot of the whole database to `dest`,
    /// using SQLite's online backup API so an in-flight writer never
    /// produces a torn copy.
    pub fn export(&self, dest: &Path) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let mut dest_conn = Connection::open(dest)?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest_conn)?;
        backup.run_to_completion(5, std::time::Duration::from_millis(50), None)?;
        tracing::info!(dest = %dest.display(), "exported store snapshot");
        Ok(())
    }
}

/// Quote every token so `:`, `"`, `*`, `-`, and other FTS5 operator
/// characters in user queries can never be interpreted as query syntax.
fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| format!("\"{}\"", tok.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn vec_f32_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vec_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity of two equal-length vectors; 0.0 if either is empty or
/// zero-norm, or their lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKind;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn entry(content: &str) -> MemoryEntry {
        MemoryEntry::new(content, MemoryKind::Factual, Utc::now())
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store = store();
        let e = entry("the sky is blue");
        store.insert(&e).unwrap();

        let fetched = store.get(&e.id, Utc::now()).unwrap().unwrap();
        assert_eq!(fetched.content, "the sky is blue");
        assert_eq!(store.access_history(&e.id).unwrap().len(), 1);
    }

    #[test]
    fn peek_does_not_log_access() {
        let store = store();
        let e = entry("quiet fact");
        store.insert(&e).unwrap();

        store.peek(&e.id).unwrap();
        assert!(store.access_history(&e.id).unwrap().is_empty());
    }

    #[test]
    fn fts_search_finds_matching_content() {
        let store = store();
        let e1 = entry("rust programming is fun");
        let e2 = entry("the weather today is sunny");
        store.insert(&e1).unwrap();
        store.insert(&e2).unwrap();

        let results = store.search_fts("rust", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, e1.id);
    }

    #[test]
    fn fts_search_sanitizes_operator_characters() {
        let store = store();
        let e = entry("quote marks and colons: like this");
        store.insert(&e).unwrap();

        // would be a syntax error if passed through raw to FTS5
        let results = store.search_fts("colons: \"unterminated", 10).unwrap();
        assert!(results.is_empty() || results[0].id == e.id);
    }

    #[test]
    fn delete_cascades_access_log() {
        let store = store();
        let e = entry("ephemeral");
        store.insert(&e).unwrap();
        store.get(&e.id, Utc::now()).unwrap();

        assert!(store.delete(&e.id).unwrap());
        assert!(store.peek(&e.id).unwrap().is_none());
    }

    #[test]
    fn graph_links_round_trip_and_relate() {
        let store = store();
        let e1 = entry("alice likes rust");
        let e2 = entry("alice also likes climbing");
        store.insert(&e1).unwrap();
        store.insert(&e2).unwrap();

        store
            .set_graph_links(&e1.id, &[("alice".into(), "mentions".into())])
            .unwrap();
        store
            .set_graph_links(&e2.id, &[("alice".into(), "mentions".into())])
            .unwrap();

        let by_entity = store.search_by_entity("alice").unwrap();
        assert_eq!(by_entity.len(), 2);

        let related = store.related_entities(&e1.id).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, e2.id);
    }

    #[test]
    fn hebbian_link_canonical_ordering() {
        let store = store();
        let e1 = entry("x");
        let e2 = entry("y");
        store.insert(&e1).unwrap();
        store.insert(&e2).unwrap();
        let (lo, hi) = HebbianLink::canonical_pair(&e1.id, &e2.id);
        let link = HebbianLink {
            a: lo,
            b: hi,
            strength: 0.5,
            co_activation_count: 1,
            created_at: Utc::now(),
        };
        store.hebbian_upsert(&link).unwrap();

        assert!(store.hebbian_get(&e2.id, &e1.id).unwrap().is_some());
        assert_eq!(store.hebbian_count().unwrap(), 1);
    }

    #[test]
    fn vector_search_ranks_by_cosine_similarity() {
        let store = store();
        let mut e1 = entry("close vector");
        e1.embedding = Some(vec![1.0, 0.0]);
        let mut e2 = entry("far vector");
        e2.embedding = Some(vec![0.0, 1.0]);
        store.insert(&e1).unwrap();
        store.insert(&e2).unwrap();

        let results = store.vector_search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(results[0].0.id, e1.id);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn cosine_similarity_handles_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
