//! Database migrations.
//!
//! Additive-only: each version's `up` script only creates tables/columns/
//! indices, never drops data. Applied once in order by [`apply_migrations`].

/// Ordered migration definitions.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: memories, access log, graph links, FTS5 index",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Hebbian co-activation graph",
        up: MIGRATION_V2_UP,
    },
];

/// A single database migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    summary TEXT,
    kind TEXT NOT NULL DEFAULT 'factual',
    layer TEXT NOT NULL DEFAULT 'working',
    created_at TEXT NOT NULL,

    working_strength REAL NOT NULL DEFAULT 1.0,
    core_strength REAL NOT NULL DEFAULT 0.0,

    importance REAL NOT NULL DEFAULT 0.5,
    pinned INTEGER NOT NULL DEFAULT 0,

    consolidation_count INTEGER NOT NULL DEFAULT 0,
    last_consolidated TEXT,

    source TEXT,
    contradicts TEXT REFERENCES memories(id) ON DELETE SET NULL,
    contradicted_by TEXT REFERENCES memories(id) ON DELETE SET NULL,

    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_memories_layer ON memories(layer);
CREATE INDEX IF NOT EXISTS idx_memories_kind ON memories(kind);
CREATE INDEX IF NOT EXISTS idx_memories_pinned ON memories(pinned);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);
CREATE INDEX IF NOT EXISTS idx_memories_contradicted_by ON memories(contradicted_by);

CREATE TABLE IF NOT EXISTS access_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    accessed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_access_log_memory ON access_log(memory_id);
CREATE INDEX IF NOT EXISTS idx_access_log_time ON access_log(accessed_at);

CREATE TABLE IF NOT EXISTS graph_links (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    entity TEXT NOT NULL,
    relation TEXT NOT NULL,
    PRIMARY KEY (memory_id, entity, relation)
);

CREATE INDEX IF NOT EXISTS idx_graph_links_entity ON graph_links(entity);

CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id UNINDEXED,
    content,
    summary,
    content='memories',
    content_rowid='rowid',
    tokenize='porter ascii'
);

CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, id, content, summary)
    VALUES (NEW.rowid, NEW.id, NEW.content, COALESCE(NEW.summary, ''));
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, id, content, summary)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, COALESCE(OLD.summary, ''));
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, id, content, summary)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, COALESCE(OLD.summary, ''));
    INSERT INTO memories_fts(rowid, id, content, summary)
    VALUES (NEW.rowid, NEW.id, NEW.content, COALESCE(NEW.summary, ''));
END;

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS hebbian_links (
    a TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    b TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    strength REAL NOT NULL DEFAULT 0.0,
    co_activation_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    PRIMARY KEY (a, b),
    CHECK (a < b)
);

CREATE INDEX IF NOT EXISTS idx_hebbian_b ON hebbian_links(b);
CREATE INDEX IF NOT EXISTS idx_hebbian_strength ON hebbian_links(strength);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Highest schema version currently applied.
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply every migration newer than the current schema version.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
