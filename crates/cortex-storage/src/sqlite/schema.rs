//! DDL statements for the SQLite schema.
//!
//! Timestamps are stored as TEXT in ISO 8601 format (SQLite has no native
//! datetime type). Enums are stored as their canonical strings. The
//! `snap_*` tables hold per-commit copies of the live tables, keyed by
//! commit hash; they are what makes branching, tagging, reset, and
//! time-travel reads possible on a plain embedded database.

/// Current schema version. Bumped whenever DDL changes.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Column list shared by `entities` and `snap_entities`.
pub const ENTITY_COLUMNS: &str = "id, name, entity_type, file_path, line_start, line_end, \
     signature, visibility, language, status, created_at, updated_at";

/// Column list shared by `dependencies` and `snap_dependencies`.
pub const DEPENDENCY_COLUMNS: &str = "from_id, to_id, type, created_at";

/// Column list shared by `metrics` and `snap_metrics`.
pub const METRIC_COLUMNS: &str =
    "entity_id, page_rank, betweenness, in_degree, out_degree, computed_at";

/// Column list shared by `file_index` and `snap_file_index`.
pub const FILE_COLUMNS: &str = "file_path, language, last_scanned, content_hash";

/// Column list shared by `coverage` and `snap_coverage`.
pub const COVERAGE_COLUMNS: &str =
    "entity_id, coverage_percent, lines_covered, lines_total, source_tag";

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Entities ------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS entities (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        entity_type TEXT NOT NULL DEFAULT 'function',
        file_path   TEXT NOT NULL,
        line_start  INTEGER,
        line_end    INTEGER,
        signature   TEXT NOT NULL DEFAULT '',
        visibility  TEXT NOT NULL DEFAULT 'private',
        language    TEXT NOT NULL DEFAULT '',
        status      TEXT NOT NULL DEFAULT 'active',
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_entities_file_path ON entities(file_path)",
    "CREATE INDEX IF NOT EXISTS idx_entities_status ON entities(status)",
    "CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type)",
    "CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name)",
    // -- Dependencies --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS dependencies (
        from_id    TEXT NOT NULL,
        to_id      TEXT NOT NULL,
        type       TEXT NOT NULL DEFAULT 'calls',
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        PRIMARY KEY (from_id, to_id, type),
        FOREIGN KEY (from_id) REFERENCES entities(id) ON DELETE CASCADE,
        FOREIGN KEY (to_id) REFERENCES entities(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dependencies_from ON dependencies(from_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_to ON dependencies(to_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_to_type ON dependencies(to_id, type)",
    // -- Metrics -------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        entity_id   TEXT PRIMARY KEY,
        page_rank   REAL NOT NULL DEFAULT 0,
        betweenness REAL NOT NULL DEFAULT 0,
        in_degree   INTEGER NOT NULL DEFAULT 0,
        out_degree  INTEGER NOT NULL DEFAULT 0,
        computed_at TEXT NOT NULL,
        FOREIGN KEY (entity_id) REFERENCES entities(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metrics_page_rank ON metrics(page_rank)",
    // -- File index ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS file_index (
        file_path    TEXT PRIMARY KEY,
        language     TEXT NOT NULL DEFAULT '',
        last_scanned TEXT NOT NULL,
        content_hash TEXT NOT NULL DEFAULT ''
    )
    "#,
    // -- Coverage ------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS coverage (
        entity_id        TEXT PRIMARY KEY,
        coverage_percent REAL NOT NULL DEFAULT 0,
        lines_covered    INTEGER NOT NULL DEFAULT 0,
        lines_total      INTEGER NOT NULL DEFAULT 0,
        source_tag       TEXT NOT NULL DEFAULT ''
    )
    "#,
    // -- Config and metadata -------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    // -- Versioning ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS commits (
        hash       TEXT PRIMARY KEY,
        parent     TEXT NOT NULL DEFAULT '',
        branch     TEXT NOT NULL DEFAULT '',
        message    TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS branches (
        name TEXT PRIMARY KEY,
        head TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        name        TEXT PRIMARY KEY,
        commit_hash TEXT NOT NULL
    )
    "#,
    // -- Per-commit snapshots ------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS snap_entities (
        commit_hash TEXT NOT NULL,
        id          TEXT NOT NULL,
        name        TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        file_path   TEXT NOT NULL,
        line_start  INTEGER,
        line_end    INTEGER,
        signature   TEXT NOT NULL,
        visibility  TEXT NOT NULL,
        language    TEXT NOT NULL,
        status      TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        PRIMARY KEY (commit_hash, id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS snap_dependencies (
        commit_hash TEXT NOT NULL,
        from_id     TEXT NOT NULL,
        to_id       TEXT NOT NULL,
        type        TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        PRIMARY KEY (commit_hash, from_id, to_id, type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS snap_metrics (
        commit_hash TEXT NOT NULL,
        entity_id   TEXT NOT NULL,
        page_rank   REAL NOT NULL,
        betweenness REAL NOT NULL,
        in_degree   INTEGER NOT NULL,
        out_degree  INTEGER NOT NULL,
        computed_at TEXT NOT NULL,
        PRIMARY KEY (commit_hash, entity_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS snap_file_index (
        commit_hash  TEXT NOT NULL,
        file_path    TEXT NOT NULL,
        language     TEXT NOT NULL,
        last_scanned TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        PRIMARY KEY (commit_hash, file_path)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS snap_coverage (
        commit_hash      TEXT NOT NULL,
        entity_id        TEXT NOT NULL,
        coverage_percent REAL NOT NULL,
        lines_covered    INTEGER NOT NULL,
        lines_total      INTEGER NOT NULL,
        source_tag       TEXT NOT NULL,
        PRIMARY KEY (commit_hash, entity_id)
    )
    "#,
];

/// Metadata rows inserted on first init (INSERT OR IGNORE, idempotent).
pub const DEFAULT_METADATA: &[(&str, &str)] = &[("branch", "main"), ("dirty", "0")];
