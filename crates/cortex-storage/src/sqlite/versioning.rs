//! Versioning operations for [`SqliteStore`]: commit, branch, tag,
//! checkout, reset, log, status, and time-travel reads.
//!
//! The commit graph lives in the `commits`/`branches`/`tags` tables and
//! each commit carries full copies of the live tables in `snap_*`,
//! keyed by commit hash. Restoring a snapshot replaces the live tables
//! wholesale, which is what makes `reset --hard` and branch switching
//! cheap to reason about.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use cortex_core::dependency::Dependency;
use cortex_core::entity::Entity;
use cortex_core::idgen;

use crate::error::{Result, StorageError};
use crate::sqlite::dependencies::scan_dependency;
use crate::sqlite::entities::{format_datetime, parse_datetime, scan_entity};
use crate::sqlite::schema::{
    COVERAGE_COLUMNS, DEPENDENCY_COLUMNS, ENTITY_COLUMNS, FILE_COLUMNS, METRIC_COLUMNS,
};
use crate::sqlite::store::{clear_dirty, get_metadata, set_metadata, SqliteStore};
use crate::traits::{CommitInfo, ResetMode, WorkingStatus};

// ---------------------------------------------------------------------------
// Ref resolution
// ---------------------------------------------------------------------------

/// Minimum length for commit-hash prefix lookup.
const MIN_HASH_PREFIX: usize = 4;

/// Returns the head commit of the working set: the detached commit if
/// HEAD is detached, otherwise the current branch's head. `None` before
/// the first commit.
pub(crate) fn head_commit(conn: &Connection) -> Result<Option<String>> {
    let detached = get_metadata(conn, "detached_head", "")?;
    if !detached.is_empty() {
        return Ok(Some(detached));
    }
    let branch = get_metadata(conn, "branch", "main")?;
    let head: Option<String> = conn
        .query_row(
            "SELECT head FROM branches WHERE name = ?1",
            params![branch],
            |row| row.get(0),
        )
        .optional()?;
    Ok(head.filter(|h| !h.is_empty()))
}

/// Resolves a ref string to a commit hash.
///
/// Resolution order: `HEAD`, branch name, tag name, full commit hash,
/// unique commit-hash prefix (at least [`MIN_HASH_PREFIX`] chars).
pub(crate) fn resolve_ref(conn: &Connection, reference: &str) -> Result<String> {
    if reference == "HEAD" {
        return head_commit(conn)?
            .ok_or_else(|| StorageError::invalid_ref(reference, "no commits yet"));
    }

    let branch_head: Option<String> = conn
        .query_row(
            "SELECT head FROM branches WHERE name = ?1",
            params![reference],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(head) = branch_head {
        return Ok(head);
    }

    let tagged: Option<String> = conn
        .query_row(
            "SELECT commit_hash FROM tags WHERE name = ?1",
            params![reference],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(hash) = tagged {
        return Ok(hash);
    }

    let exact: Option<String> = conn
        .query_row(
            "SELECT hash FROM commits WHERE hash = ?1",
            params![reference],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(hash) = exact {
        return Ok(hash);
    }

    if reference.len() >= MIN_HASH_PREFIX {
        let mut stmt = conn.prepare(
            "SELECT hash FROM commits WHERE substr(hash, 1, ?1) = ?2 LIMIT 2",
        )?;
        let rows = stmt.query_map(params![reference.len() as i64, reference], |row| {
            row.get::<_, String>(0)
        })?;
        let matches: Vec<String> = rows.collect::<rusqlite::Result<_>>()?;
        match matches.as_slice() {
            [hash] => return Ok(hash.clone()),
            [_, _, ..] => {
                return Err(StorageError::invalid_ref(reference, "ambiguous commit prefix"));
            }
            [] => {}
        }
    }

    Err(StorageError::invalid_ref(
        reference,
        "unknown branch, tag, or commit",
    ))
}

// ---------------------------------------------------------------------------
// Snapshot copy / restore
// ---------------------------------------------------------------------------

/// Copies the live tables into the `snap_*` tables under `hash`.
fn snapshot_commit(conn: &Connection, hash: &str) -> Result<()> {
    let copies = [
        format!(
            "INSERT INTO snap_entities (commit_hash, {ENTITY_COLUMNS})
             SELECT ?1, {ENTITY_COLUMNS} FROM entities"
        ),
        format!(
            "INSERT INTO snap_dependencies (commit_hash, {DEPENDENCY_COLUMNS})
             SELECT ?1, {DEPENDENCY_COLUMNS} FROM dependencies"
        ),
        format!(
            "INSERT INTO snap_metrics (commit_hash, {METRIC_COLUMNS})
             SELECT ?1, {METRIC_COLUMNS} FROM metrics"
        ),
        format!(
            "INSERT INTO snap_file_index (commit_hash, {FILE_COLUMNS})
             SELECT ?1, {FILE_COLUMNS} FROM file_index"
        ),
        format!(
            "INSERT INTO snap_coverage (commit_hash, {COVERAGE_COLUMNS})
             SELECT ?1, {COVERAGE_COLUMNS} FROM coverage"
        ),
    ];
    for sql in &copies {
        conn.execute(sql, params![hash])?;
    }
    Ok(())
}

/// Replaces the live tables with the snapshot stored under `hash`.
///
/// Entities are inserted before dependencies and metrics to satisfy
/// foreign keys.
fn restore_snapshot(conn: &Connection, hash: &str) -> Result<()> {
    for table in ["dependencies", "metrics", "coverage", "file_index", "entities"] {
        conn.execute(&format!("DELETE FROM {table}"), [])?;
    }

    let restores = [
        format!(
            "INSERT INTO entities ({ENTITY_COLUMNS})
             SELECT {ENTITY_COLUMNS} FROM snap_entities WHERE commit_hash = ?1"
        ),
        format!(
            "INSERT INTO dependencies ({DEPENDENCY_COLUMNS})
             SELECT {DEPENDENCY_COLUMNS} FROM snap_dependencies WHERE commit_hash = ?1"
        ),
        format!(
            "INSERT INTO metrics ({METRIC_COLUMNS})
             SELECT {METRIC_COLUMNS} FROM snap_metrics WHERE commit_hash = ?1"
        ),
        format!(
            "INSERT INTO file_index ({FILE_COLUMNS})
             SELECT {FILE_COLUMNS} FROM snap_file_index WHERE commit_hash = ?1"
        ),
        format!(
            "INSERT INTO coverage ({COVERAGE_COLUMNS})
             SELECT {COVERAGE_COLUMNS} FROM snap_coverage WHERE commit_hash = ?1"
        ),
    ];
    for sql in &restores {
        conn.execute(sql, params![hash])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub(crate) fn commit_impl(&self, message: &str) -> Result<String> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let branch = get_metadata(&tx, "branch", "main")?;
        if branch.is_empty() {
            return Err(StorageError::Conflict(
                "cannot commit with a detached HEAD; create a branch first".into(),
            ));
        }

        let parent: String = tx
            .query_row(
                "SELECT head FROM branches WHERE name = ?1",
                params![branch],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_default();

        let now = Utc::now();
        let hash = idgen::commit_hash(&parent, message, now);

        tx.execute(
            "INSERT INTO commits (hash, parent, branch, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![hash, parent, branch, message, format_datetime(&now)],
        )?;
        snapshot_commit(&tx, &hash)?;
        tx.execute(
            "INSERT OR REPLACE INTO branches (name, head) VALUES (?1, ?2)",
            params![branch, hash],
        )?;
        clear_dirty(&tx)?;
        tx.commit()?;

        info!(%hash, branch, "committed working set");
        Ok(hash)
    }

    pub(crate) fn branch_impl(&self, name: &str, from: Option<&str>) -> Result<()> {
        if name.is_empty() || name == "HEAD" || name.contains(char::is_whitespace) {
            return Err(StorageError::invalid_argument(format!(
                "invalid branch name {name:?}"
            )));
        }

        let conn = self.lock_conn()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM branches WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::AlreadyExists { id: name.into() });
        }

        let target = match from {
            Some(reference) => resolve_ref(&conn, reference)?,
            None => head_commit(&conn)?
                .ok_or_else(|| StorageError::invalid_ref("HEAD", "no commits to branch from"))?,
        };

        conn.execute(
            "INSERT INTO branches (name, head) VALUES (?1, ?2)",
            params![name, target],
        )?;
        debug!(name, %target, "created branch");
        Ok(())
    }

    pub(crate) fn checkout_impl(&self, reference: &str) -> Result<()> {
        let mut conn = self.lock_conn()?;

        let branch_head: Option<String> = conn
            .query_row(
                "SELECT head FROM branches WHERE name = ?1",
                params![reference],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(head) = branch_head {
            let tx = conn.transaction()?;
            restore_snapshot(&tx, &head)?;
            set_metadata(&tx, "branch", reference)?;
            set_metadata(&tx, "detached_head", "")?;
            clear_dirty(&tx)?;
            tx.commit()?;
            info!(branch = reference, "checked out branch");
            return Ok(());
        }

        // The initial branch has no row before the first commit; switching
        // to it is a no-op.
        if get_metadata(&conn, "branch", "main")? == reference {
            return Ok(());
        }

        let hash = resolve_ref(&conn, reference)?;
        let tx = conn.transaction()?;
        restore_snapshot(&tx, &hash)?;
        set_metadata(&tx, "branch", "")?;
        set_metadata(&tx, "detached_head", &hash)?;
        clear_dirty(&tx)?;
        tx.commit()?;
        info!(%hash, "checked out detached commit");
        Ok(())
    }

    pub(crate) fn tag_impl(&self, name: &str, reference: Option<&str>) -> Result<()> {
        if name.is_empty() || name == "HEAD" || name.contains(char::is_whitespace) {
            return Err(StorageError::invalid_argument(format!(
                "invalid tag name {name:?}"
            )));
        }

        let conn = self.lock_conn()?;
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM tags WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::AlreadyExists { id: name.into() });
        }

        let target = resolve_ref(&conn, reference.unwrap_or("HEAD"))?;
        conn.execute(
            "INSERT INTO tags (name, commit_hash) VALUES (?1, ?2)",
            params![name, target],
        )?;
        debug!(name, %target, "created tag");
        Ok(())
    }

    pub(crate) fn reset_impl(&self, reference: &str, mode: ResetMode) -> Result<()> {
        let mut conn = self.lock_conn()?;

        let branch = get_metadata(&conn, "branch", "main")?;
        if branch.is_empty() {
            return Err(StorageError::Conflict(
                "cannot reset with a detached HEAD".into(),
            ));
        }

        let hash = resolve_ref(&conn, reference)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO branches (name, head) VALUES (?1, ?2)",
            params![branch, hash],
        )?;
        if mode == ResetMode::Hard {
            restore_snapshot(&tx, &hash)?;
            clear_dirty(&tx)?;
        }
        tx.commit()?;

        info!(%hash, branch, mode = mode.as_str(), "reset branch");
        Ok(())
    }

    pub(crate) fn log_impl(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        let conn = self.lock_conn()?;
        let mut log = Vec::new();
        let mut cursor = head_commit(&conn)?;

        while let Some(hash) = cursor {
            if log.len() >= limit {
                break;
            }
            let row: Option<(String, String, String, String)> = conn
                .query_row(
                    "SELECT parent, branch, message, created_at FROM commits WHERE hash = ?1",
                    params![hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;
            let Some((parent, branch, message, created_at)) = row else {
                break;
            };
            cursor = if parent.is_empty() {
                None
            } else {
                Some(parent.clone())
            };
            log.push(CommitInfo {
                hash,
                parent,
                branch,
                message,
                created_at: parse_datetime(&created_at),
            });
        }
        Ok(log)
    }

    pub(crate) fn status_impl(&self) -> Result<WorkingStatus> {
        let conn = self.lock_conn()?;

        let count = |sql: &str| -> Result<i64> {
            Ok(conn.query_row(sql, [], |row| row.get(0))?)
        };

        Ok(WorkingStatus {
            branch: get_metadata(&conn, "branch", "main")?,
            head: head_commit(&conn)?,
            dirty: get_metadata(&conn, "dirty", "0")? == "1",
            active_entities: count("SELECT COUNT(*) FROM entities WHERE status = 'active'")?,
            archived_entities: count("SELECT COUNT(*) FROM entities WHERE status = 'archived'")?,
            dependencies: count("SELECT COUNT(*) FROM dependencies")?,
            files: count("SELECT COUNT(*) FROM file_index")?,
        })
    }

    pub(crate) fn entities_at_impl(&self, reference: &str) -> Result<Vec<Entity>> {
        let conn = self.lock_conn()?;
        let hash = resolve_ref(&conn, reference)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTITY_COLUMNS} FROM snap_entities WHERE commit_hash = ?1
             ORDER BY file_path, COALESCE(line_start, 0), name"
        ))?;
        let rows = stmt.query_map(params![hash], scan_entity)?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }

    pub(crate) fn dependencies_at_impl(&self, reference: &str) -> Result<Vec<Dependency>> {
        let conn = self.lock_conn()?;
        let hash = resolve_ref(&conn, reference)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {DEPENDENCY_COLUMNS} FROM snap_dependencies WHERE commit_hash = ?1
             ORDER BY from_id, to_id, type"
        ))?;
        let rows = stmt.query_map(params![hash], scan_dependency)?;

        let mut deps = Vec::new();
        for row in rows {
            deps.push(row?);
        }
        Ok(deps)
    }
}
