//! Read-only SQL introspection for [`SqliteStore`].

use rusqlite::types::ValueRef;

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;
use crate::traits::SqlRows;

/// Keywords a statement may start with on the introspection surface.
const READ_KEYWORDS: &[&str] = &["select", "with", "pragma", "explain"];

/// Returns an error unless the statement is a read.
///
/// Leading whitespace and `--` line comments are skipped before the first
/// keyword is checked. This is a guard against accidental writes through
/// the introspection surface, not a SQL sandbox.
fn ensure_read_only(sql: &str) -> Result<()> {
    let mut rest = sql.trim_start();
    while let Some(stripped) = rest.strip_prefix("--") {
        rest = match stripped.split_once('\n') {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }

    let first_word: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();

    if READ_KEYWORDS.contains(&first_word.as_str()) {
        Ok(())
    } else {
        Err(StorageError::invalid_argument(format!(
            "only read statements are allowed here, got {first_word:?}"
        )))
    }
}

/// Converts a JSON parameter into something rusqlite can bind.
fn bind_value(value: &serde_json::Value) -> Result<Box<dyn rusqlite::types::ToSql>> {
    use serde_json::Value;
    Ok(match value {
        Value::Null => Box::new(rusqlite::types::Null),
        Value::Bool(b) => Box::new(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else if let Some(f) = n.as_f64() {
                Box::new(f)
            } else {
                return Err(StorageError::invalid_argument(format!(
                    "unsupported numeric parameter: {n}"
                )));
            }
        }
        Value::String(s) => Box::new(s.clone()),
        other => {
            return Err(StorageError::invalid_argument(format!(
                "unsupported parameter type: {other}"
            )));
        }
    })
}

/// Converts a SQLite cell into JSON.
fn cell_to_json(cell: ValueRef<'_>) -> serde_json::Value {
    match cell {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::from(format!("<blob {} bytes>", b.len())),
    }
}

impl SqliteStore {
    pub(crate) fn query_sql_impl(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<SqlRows> {
        ensure_read_only(sql)?;

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let bound: Vec<Box<dyn rusqlite::types::ToSql>> = params
            .iter()
            .map(bind_value)
            .collect::<Result<Vec<_>>>()?;
        let bound_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|v| v.as_ref()).collect();

        let mut rows_out = Vec::new();
        let mut rows = stmt.query(bound_refs.as_slice())?;
        while let Some(row) = rows.next()? {
            let mut out = Vec::with_capacity(column_count);
            for i in 0..column_count {
                out.push(cell_to_json(row.get_ref(i)?));
            }
            rows_out.push(out);
        }

        Ok(SqlRows {
            columns,
            rows: rows_out,
        })
    }
}
