//! Metrics persistence for [`SqliteStore`].

use rusqlite::{params, Connection, OptionalExtension, Row};

use cortex_core::metrics::EntityMetrics;

use crate::error::{Result, StorageError};
use crate::sqlite::entities::{format_datetime, parse_datetime};
use crate::sqlite::schema::METRIC_COLUMNS;
use crate::sqlite::store::{set_dirty, SqliteStore};

/// Builds [`EntityMetrics`] from a row selected with [`METRIC_COLUMNS`].
pub(crate) fn scan_metrics(row: &Row<'_>) -> rusqlite::Result<EntityMetrics> {
    let computed_at_str: String = row.get("computed_at")?;
    Ok(EntityMetrics {
        entity_id: row.get("entity_id")?,
        page_rank: row.get("page_rank")?,
        betweenness: row.get("betweenness")?,
        in_degree: row.get("in_degree")?,
        out_degree: row.get("out_degree")?,
        computed_at: parse_datetime(&computed_at_str),
    })
}

fn upsert_metrics_on_conn(conn: &Connection, metrics: &EntityMetrics) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO metrics ({METRIC_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        ),
        params![
            metrics.entity_id,
            metrics.page_rank,
            metrics.betweenness,
            metrics.in_degree,
            metrics.out_degree,
            format_datetime(&metrics.computed_at),
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    pub(crate) fn save_metrics_impl(&self, metrics: &EntityMetrics) -> Result<()> {
        let conn = self.lock_conn()?;
        upsert_metrics_on_conn(&conn, metrics)?;
        set_dirty(&conn)
    }

    pub(crate) fn save_bulk_metrics_impl(&self, metrics: &[EntityMetrics]) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for m in metrics {
            upsert_metrics_on_conn(&tx, m)?;
        }
        set_dirty(&tx)?;
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn get_metrics_impl(&self, entity_id: &str) -> Result<EntityMetrics> {
        let conn = self.lock_conn()?;
        conn.query_row(
            &format!("SELECT {METRIC_COLUMNS} FROM metrics WHERE entity_id = ?1"),
            params![entity_id],
            scan_metrics,
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("metrics", entity_id))
    }

    pub(crate) fn get_all_metrics_impl(&self) -> Result<Vec<EntityMetrics>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {METRIC_COLUMNS} FROM metrics"))?;
        let rows = stmt.query_map([], scan_metrics)?;

        let mut all = Vec::new();
        for row in rows {
            all.push(row?);
        }
        Ok(all)
    }

    pub(crate) fn get_top_by_page_rank_impl(&self, n: usize) -> Result<Vec<EntityMetrics>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {METRIC_COLUMNS} FROM metrics
             ORDER BY page_rank DESC, entity_id LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![n as i64], scan_metrics)?;

        let mut top = Vec::new();
        for row in rows {
            top.push(row?);
        }
        Ok(top)
    }
}
