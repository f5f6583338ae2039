//! Entity CRUD operations for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use cortex_core::entity::Entity;
use cortex_core::enums::{EntityKind, EntityStatus, Visibility};
use cortex_core::filter::EntityFilter;

use crate::error::{Result, StorageError};
use crate::sqlite::schema::ENTITY_COLUMNS;
use crate::sqlite::store::{set_dirty, SqliteStore};

// ---------------------------------------------------------------------------
// Datetime helpers (shared across the sqlite modules)
// ---------------------------------------------------------------------------

/// Formats a `DateTime<Utc>` as ISO 8601 TEXT for SQLite storage.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an ISO 8601 TEXT string from SQLite into a `DateTime<Utc>`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
            .map(|ndt| ndt.and_utc())
            .unwrap_or_else(|_| Utc::now())
    })
}

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

/// Builds an [`Entity`] from a row selected with [`ENTITY_COLUMNS`].
pub(crate) fn scan_entity(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let entity_type_str: String = row.get("entity_type")?;
    let visibility_str: String = row.get("visibility")?;
    let status_str: String = row.get("status")?;
    let created_at_str: String = row.get("created_at")?;
    let updated_at_str: String = row.get("updated_at")?;

    Ok(Entity {
        id: row.get("id")?,
        name: row.get("name")?,
        entity_type: EntityKind::parse(&entity_type_str).unwrap_or_default(),
        file_path: row.get("file_path")?,
        line_start: row.get("line_start")?,
        line_end: row.get("line_end")?,
        signature: row.get("signature")?,
        visibility: Visibility::parse(&visibility_str).unwrap_or_default(),
        language: row.get("language")?,
        status: EntityStatus::parse(&status_str).unwrap_or_default(),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with bulk and versioning paths)
// ---------------------------------------------------------------------------

/// Inserts one entity. With `upsert`, an existing row is replaced.
pub(crate) fn insert_entity_on_conn(conn: &Connection, entity: &Entity, upsert: bool) -> Result<()> {
    entity.validate()?;

    if !upsert {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM entities WHERE id = ?1",
                params![entity.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageError::AlreadyExists {
                id: entity.id.clone(),
            });
        }
    }

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO entities ({ENTITY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            entity.id,
            entity.name,
            entity.entity_type.as_str(),
            entity.file_path,
            entity.line_start,
            entity.line_end,
            entity.signature,
            entity.visibility.as_str(),
            entity.language,
            entity.status.as_str(),
            format_datetime(&entity.created_at),
            format_datetime(&entity.updated_at),
        ],
    )?;
    Ok(())
}

/// Returns `true` if an entity row with this id exists (any status).
pub(crate) fn entity_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM entities WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(exists.is_some())
}

/// Builds the WHERE clause and parameters for an [`EntityFilter`].
fn build_entity_where(
    filter: &EntityFilter,
) -> (Vec<String>, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1;

    if let Some(ref file_path) = filter.file_path {
        clauses.push(format!("file_path = ?{idx}"));
        values.push(Box::new(file_path.clone()));
        idx += 1;
    }
    if let Some(status) = filter.status {
        clauses.push(format!("status = ?{idx}"));
        values.push(Box::new(status.as_str().to_owned()));
        idx += 1;
    }
    if let Some(entity_type) = filter.entity_type {
        clauses.push(format!("entity_type = ?{idx}"));
        values.push(Box::new(entity_type.as_str().to_owned()));
        idx += 1;
    }
    if let Some(visibility) = filter.visibility {
        clauses.push(format!("visibility = ?{idx}"));
        values.push(Box::new(visibility.as_str().to_owned()));
        idx += 1;
    }
    if let Some(ref language) = filter.language {
        clauses.push(format!("language = ?{idx}"));
        values.push(Box::new(language.clone()));
        idx += 1;
    }
    if let Some(ref name_like) = filter.name_like {
        clauses.push(format!("LOWER(name) LIKE ?{idx}"));
        values.push(Box::new(format!("%{}%", name_like.to_lowercase())));
        idx += 1;
    }
    if let Some(ref id_prefix) = filter.id_prefix {
        // substr avoids LIKE wildcard semantics for `_` in ids.
        clauses.push(format!("substr(id, 1, {}) = ?{idx}", id_prefix.len()));
        values.push(Box::new(id_prefix.clone()));
    }
    let _ = idx;

    (clauses, values)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub(crate) fn create_entity_impl(&self, entity: &Entity) -> Result<()> {
        let conn = self.lock_conn()?;
        insert_entity_on_conn(&conn, entity, false)?;
        set_dirty(&conn)
    }

    pub(crate) fn create_entities_bulk_impl(&self, entities: &[Entity], upsert: bool) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for entity in entities {
            insert_entity_on_conn(&tx, entity, upsert)?;
        }
        set_dirty(&tx)?;
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn get_entity_impl(&self, id: &str) -> Result<Entity> {
        let conn = self.lock_conn()?;
        conn.query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
            params![id],
            scan_entity,
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("entity", id))
    }

    pub(crate) fn query_entities_impl(&self, filter: &EntityFilter) -> Result<Vec<Entity>> {
        let conn = self.lock_conn()?;
        let (clauses, values) = build_entity_where(filter);

        let mut sql = format!("SELECT {ENTITY_COLUMNS} FROM entities");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY file_path, COALESCE(line_start, 0), name");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt.query_map(params.as_slice(), scan_entity)?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }

    pub(crate) fn count_entities_impl(&self, filter: &EntityFilter) -> Result<i64> {
        let conn = self.lock_conn()?;
        let (clauses, values) = build_entity_where(filter);

        let mut sql = "SELECT COUNT(*) FROM entities".to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let params: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let count: i64 = conn.query_row(&sql, params.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn update_entity_impl(&self, entity: &Entity) -> Result<()> {
        entity.validate()?;
        let conn = self.lock_conn()?;
        let now = Utc::now();

        let affected = conn.execute(
            "UPDATE entities SET
                name = ?2, entity_type = ?3, file_path = ?4, line_start = ?5,
                line_end = ?6, signature = ?7, visibility = ?8, language = ?9,
                status = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                entity.id,
                entity.name,
                entity.entity_type.as_str(),
                entity.file_path,
                entity.line_start,
                entity.line_end,
                entity.signature,
                entity.visibility.as_str(),
                entity.language,
                entity.status.as_str(),
                format_datetime(&now),
            ],
        )?;
        if affected == 0 {
            return Err(StorageError::not_found("entity", &entity.id));
        }
        set_dirty(&conn)
    }

    pub(crate) fn archive_entity_impl(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now();
        let affected = conn.execute(
            "UPDATE entities SET status = 'archived', updated_at = ?2 WHERE id = ?1",
            params![id, format_datetime(&now)],
        )?;
        if affected == 0 {
            return Err(StorageError::not_found("entity", id));
        }
        set_dirty(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::enums::EntityKind;
    use pretty_assertions::assert_eq;

    fn entity(name: &str, file: &str) -> Entity {
        Entity::new(name, EntityKind::Function, file)
    }

    #[test]
    fn create_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let e = entity("HandleRequest", "pkg/http.go");
        store.create_entity_impl(&e).unwrap();

        let back = store.get_entity_impl(&e.id).unwrap();
        assert_eq!(back.name, "HandleRequest");
        assert_eq!(back.file_path, "pkg/http.go");
    }

    #[test]
    fn duplicate_create_is_already_exists() {
        let store = SqliteStore::open_in_memory().unwrap();
        let e = entity("Foo", "a.go");
        store.create_entity_impl(&e).unwrap();

        let err = store.create_entity_impl(&e).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[test]
    fn bulk_upsert_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut e = entity("Foo", "a.go");
        store.create_entity_impl(&e).unwrap();

        e.signature = "func Foo(x int)".into();
        store.create_entities_bulk_impl(&[e.clone()], true).unwrap();

        let back = store.get_entity_impl(&e.id).unwrap();
        assert_eq!(back.signature, "func Foo(x int)");
    }

    #[test]
    fn bulk_without_upsert_aborts_whole_batch() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = entity("A", "a.go");
        store.create_entity_impl(&a).unwrap();

        let b = entity("B", "b.go");
        let err = store
            .create_entities_bulk_impl(&[b.clone(), a.clone()], false)
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        // B must not have been inserted: the batch is atomic.
        let err = store.get_entity_impl(&b.id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn query_filters_by_file_and_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = entity("A", "pkg/a.go");
        let b = entity("B", "pkg/b.go");
        store.create_entity_impl(&a).unwrap();
        store.create_entity_impl(&b).unwrap();
        store.archive_entity_impl(&b.id).unwrap();

        let active = store
            .query_entities_impl(&EntityFilter::active())
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "A");

        let all = store.query_entities_impl(&EntityFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn query_orders_by_file_then_line() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut a = entity("Second", "pkg/a.go");
        a.line_start = Some(20);
        let mut b = entity("First", "pkg/a.go");
        b.line_start = Some(3);
        store.create_entity_impl(&a).unwrap();
        store.create_entity_impl(&b).unwrap();

        let rows = store.query_entities_impl(&EntityFilter::default()).unwrap();
        assert_eq!(rows[0].name, "First");
        assert_eq!(rows[1].name, "Second");
    }

    #[test]
    fn name_like_is_case_insensitive() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_entity_impl(&entity("ParseConfig", "a.go"))
            .unwrap();

        let filter = EntityFilter {
            name_like: Some("parseconf".into()),
            ..EntityFilter::default()
        };
        let rows = store.query_entities_impl(&filter).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn count_matches_query() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_entity_impl(&entity("A", "a.go")).unwrap();
        store.create_entity_impl(&entity("B", "b.go")).unwrap();
        assert_eq!(
            store.count_entities_impl(&EntityFilter::default()).unwrap(),
            2
        );
    }

    #[test]
    fn archive_then_update_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let e = entity("Gone", "a.go");
        let err = store.archive_entity_impl(&e.id).unwrap_err();
        assert!(err.is_not_found());
    }
}
