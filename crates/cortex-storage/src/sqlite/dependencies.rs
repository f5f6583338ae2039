//! Dependency CRUD operations for [`SqliteStore`].

use std::collections::HashSet;

use rusqlite::{params, Connection, Row};

use cortex_core::dependency::Dependency;
use cortex_core::enums::DepType;
use cortex_core::filter::DependencyFilter;

use crate::error::{Result, StorageError};
use crate::sqlite::entities::{entity_exists, format_datetime, parse_datetime};
use crate::sqlite::schema::DEPENDENCY_COLUMNS;
use crate::sqlite::store::{set_dirty, SqliteStore};

/// Builds a [`Dependency`] from a row selected with [`DEPENDENCY_COLUMNS`].
pub(crate) fn scan_dependency(row: &Row<'_>) -> rusqlite::Result<Dependency> {
    let type_str: String = row.get("type")?;
    let created_at_str: String = row.get("created_at")?;
    Ok(Dependency {
        from_id: row.get("from_id")?,
        to_id: row.get("to_id")?,
        dep_type: DepType::parse(&type_str).unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
    })
}

/// Inserts one edge, rejecting orphans. INSERT OR IGNORE gives (from, to,
/// type) idempotence.
pub(crate) fn insert_dependency_on_conn(conn: &Connection, dep: &Dependency) -> Result<()> {
    if !entity_exists(conn, &dep.from_id)? {
        return Err(StorageError::invalid_ref(
            &dep.from_id,
            "dependency source entity does not exist",
        ));
    }
    if !entity_exists(conn, &dep.to_id)? {
        return Err(StorageError::invalid_ref(
            &dep.to_id,
            "dependency target entity does not exist",
        ));
    }

    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO dependencies ({DEPENDENCY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4)"
        ),
        params![
            dep.from_id,
            dep.to_id,
            dep.dep_type.as_str(),
            format_datetime(&dep.created_at),
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    pub(crate) fn create_dependency_impl(&self, dep: &Dependency) -> Result<()> {
        let conn = self.lock_conn()?;
        insert_dependency_on_conn(&conn, dep)?;
        set_dirty(&conn)
    }

    /// Rebuilds the outgoing edge set of `from_id`.
    ///
    /// The scanner emits the complete new set on every rescan; stale edges
    /// are dropped and new ones inserted in one transaction.
    pub(crate) fn replace_dependencies_from_impl(
        &self,
        from_id: &str,
        deps: &[Dependency],
    ) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        if !entity_exists(&tx, from_id)? {
            return Err(StorageError::invalid_ref(
                from_id,
                "dependency source entity does not exist",
            ));
        }

        tx.execute(
            "DELETE FROM dependencies WHERE from_id = ?1",
            params![from_id],
        )?;

        let mut seen: HashSet<(String, DepType)> = HashSet::new();
        for dep in deps {
            if dep.from_id != from_id {
                return Err(StorageError::invalid_argument(format!(
                    "edge source {} does not match {from_id}",
                    dep.from_id
                )));
            }
            if !seen.insert((dep.to_id.clone(), dep.dep_type)) {
                continue;
            }
            insert_dependency_on_conn(&tx, dep)?;
        }

        set_dirty(&tx)?;
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn get_dependencies_impl(&self, filter: &DependencyFilter) -> Result<Vec<Dependency>> {
        let conn = self.lock_conn()?;

        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut idx = 1;

        if let Some(ref from_id) = filter.from_id {
            clauses.push(format!("from_id = ?{idx}"));
            values.push(Box::new(from_id.clone()));
            idx += 1;
        }
        if let Some(ref to_id) = filter.to_id {
            clauses.push(format!("to_id = ?{idx}"));
            values.push(Box::new(to_id.clone()));
            idx += 1;
        }
        if let Some(dep_type) = filter.dep_type {
            clauses.push(format!("type = ?{idx}"));
            values.push(Box::new(dep_type.as_str().to_owned()));
        }
        let _ = idx;

        let mut sql = format!("SELECT {DEPENDENCY_COLUMNS} FROM dependencies");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY from_id, to_id, type");

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt.query_map(params.as_slice(), scan_dependency)?;

        let mut deps = Vec::new();
        for row in rows {
            deps.push(row?);
        }
        Ok(deps)
    }

    pub(crate) fn count_dependencies_impl(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM dependencies", [], |row| row.get(0))?;
        Ok(count)
    }
}
