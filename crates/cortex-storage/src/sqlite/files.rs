//! File index and coverage persistence for [`SqliteStore`].

use rusqlite::{params, OptionalExtension, Row};

use cortex_core::entity::{CoverageRecord, FileIndexEntry};

use crate::error::{Result, StorageError};
use crate::sqlite::entities::{format_datetime, parse_datetime};
use crate::sqlite::schema::{COVERAGE_COLUMNS, FILE_COLUMNS};
use crate::sqlite::store::{set_dirty, SqliteStore};

pub(crate) fn scan_file(row: &Row<'_>) -> rusqlite::Result<FileIndexEntry> {
    let last_scanned_str: String = row.get("last_scanned")?;
    Ok(FileIndexEntry {
        file_path: row.get("file_path")?,
        language: row.get("language")?,
        last_scanned: parse_datetime(&last_scanned_str),
        content_hash: row.get("content_hash")?,
    })
}

pub(crate) fn scan_coverage(row: &Row<'_>) -> rusqlite::Result<CoverageRecord> {
    Ok(CoverageRecord {
        entity_id: row.get("entity_id")?,
        coverage_percent: row.get("coverage_percent")?,
        lines_covered: row.get("lines_covered")?,
        lines_total: row.get("lines_total")?,
        source_tag: row.get("source_tag")?,
    })
}

impl SqliteStore {
    pub(crate) fn upsert_file_impl(&self, file: &FileIndexEntry) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO file_index ({FILE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4)"
            ),
            params![
                file.file_path,
                file.language,
                format_datetime(&file.last_scanned),
                file.content_hash,
            ],
        )?;
        set_dirty(&conn)
    }

    pub(crate) fn get_file_impl(&self, file_path: &str) -> Result<FileIndexEntry> {
        let conn = self.lock_conn()?;
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM file_index WHERE file_path = ?1"),
            params![file_path],
            scan_file,
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("file", file_path))
    }

    pub(crate) fn count_files_impl(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM file_index", [], |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn save_coverage_impl(&self, coverage: &CoverageRecord) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO coverage ({COVERAGE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![
                coverage.entity_id,
                coverage.coverage_percent,
                coverage.lines_covered,
                coverage.lines_total,
                coverage.source_tag,
            ],
        )?;
        set_dirty(&conn)
    }

    pub(crate) fn get_coverage_impl(&self, entity_id: &str) -> Result<Option<CoverageRecord>> {
        let conn = self.lock_conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {COVERAGE_COLUMNS} FROM coverage WHERE entity_id = ?1"),
                params![entity_id],
                scan_coverage,
            )
            .optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn file_upsert_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let entry = FileIndexEntry {
            file_path: "pkg/a.go".into(),
            language: "go".into(),
            last_scanned: Utc::now(),
            content_hash: "abc123".into(),
        };
        store.upsert_file_impl(&entry).unwrap();
        store.upsert_file_impl(&entry).unwrap();

        assert_eq!(store.count_files_impl().unwrap(), 1);
        let back = store.get_file_impl("pkg/a.go").unwrap();
        assert_eq!(back.content_hash, "abc123");
    }

    #[test]
    fn coverage_absent_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_coverage_impl("sa-fn-aaaaaa-X").unwrap().is_none());
    }

    #[test]
    fn coverage_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rec = CoverageRecord {
            entity_id: "sa-fn-aaaaaa-X".into(),
            coverage_percent: 83.5,
            lines_covered: 10,
            lines_total: 12,
            source_tag: "go-cover".into(),
        };
        store.save_coverage_impl(&rec).unwrap();
        let back = store.get_coverage_impl("sa-fn-aaaaaa-X").unwrap().unwrap();
        assert_eq!(back.coverage_percent, 83.5);
    }
}
