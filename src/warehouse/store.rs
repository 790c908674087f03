//! SQLite-backed warehouse implementation.
//!
//! One connection, one writer, held for the duration of a run and closed on
//! drop. Rows are buffered per table and written inside a transaction once
//! the buffer reaches `batch_size`; the default batch size of 1 keeps the
//! baseline semantics where every row is durable before the next begins.

use super::models::TargetTable;
use super::schema::WAREHOUSE_SCHEMA_SQL;
use super::trait_def::EventWarehouse;
use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite implementation of `EventWarehouse`.
pub struct SqliteWarehouse {
    conn: Mutex<Connection>,
    buffers: Mutex<HashMap<TargetTable, Vec<Vec<SqlValue>>>>,
    batch_size: usize,
}

/// Map a projected JSON value onto its SQLite storage class.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Null
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        // Nested structures are not part of any table contract; store their
        // JSON text rather than failing mid-run.
        other => SqlValue::Text(other.to_string()),
    }
}

impl SqliteWarehouse {
    /// Open or create a warehouse database.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open warehouse database: {:?}", path))?;
        Self::with_connection(conn, batch_size)
    }

    /// Create an in-memory warehouse (for testing).
    #[cfg(test)]
    pub fn in_memory(batch_size: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, batch_size)
    }

    fn with_connection(conn: Connection, batch_size: usize) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.execute_batch(WAREHOUSE_SCHEMA_SQL)
            .context("Failed to apply warehouse schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            buffers: Mutex::new(HashMap::new()),
            batch_size: batch_size.max(1),
        })
    }

    /// Write a batch of rows for one table inside a single transaction.
    fn write_rows(&self, table: TargetTable, rows: &[Vec<SqlValue>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&table.insert_sql())?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))
                    .with_context(|| format!("Failed to insert into {}", table.table_name()))?;
            }
        }
        tx.commit()?;
        debug!("Flushed {} rows into {}", rows.len(), table.table_name());
        Ok(())
    }

    fn take_buffer(&self, table: TargetTable) -> Vec<Vec<SqlValue>> {
        let mut buffers = self.buffers.lock().unwrap();
        buffers.remove(&table).unwrap_or_default()
    }
}

impl EventWarehouse for SqliteWarehouse {
    fn insert(&self, table: TargetTable, row: &[Value]) -> Result<()> {
        anyhow::ensure!(
            row.len() == table.columns().len(),
            "Row for {} has {} values, expected {}",
            table.table_name(),
            row.len(),
            table.columns().len()
        );

        let converted: Vec<SqlValue> = row.iter().map(to_sql_value).collect();
        let full = {
            let mut buffers = self.buffers.lock().unwrap();
            let buffer = buffers.entry(table).or_default();
            buffer.push(converted);
            if buffer.len() >= self.batch_size {
                std::mem::take(buffer)
            } else {
                Vec::new()
            }
        };
        self.write_rows(table, &full)
    }

    fn flush(&self) -> Result<()> {
        for table in TargetTable::ALL {
            let rows = self.take_buffer(table);
            self.write_rows(table, &rows)?;
        }
        Ok(())
    }

    fn lookup_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT s.song_id, s.artist_id
             FROM songs s
             JOIN artists a ON s.artist_id = a.artist_id
             WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
             LIMIT 1",
        )?;
        let result = stmt
            .query_row(params![title, artist_name, duration], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        Ok(result)
    }

    fn lookup_song_duration(&self, title: &str, artist_name: &str) -> Result<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT s.duration
             FROM songs s
             JOIN artists a ON s.artist_id = a.artist_id
             WHERE s.title = ?1 AND a.name = ?2
             LIMIT 1",
        )?;
        let result = stmt
            .query_row(params![title, artist_name], |row| row.get(0))
            .optional()?;
        Ok(result)
    }

    fn count(&self, table: TargetTable) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.table_name()),
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn song_row(song_id: &str, title: &str, artist_id: &str, duration: f64) -> Vec<Value> {
        vec![
            json!(song_id),
            json!(title),
            json!(artist_id),
            json!(2004),
            json!(duration),
        ]
    }

    fn artist_row(artist_id: &str, name: &str) -> Vec<Value> {
        vec![
            json!(artist_id),
            json!(name),
            json!("Oakland, CA"),
            Value::Null,
            Value::Null,
        ]
    }

    #[test]
    fn test_insert_and_count() {
        let warehouse = SqliteWarehouse::in_memory(1).unwrap();

        warehouse
            .insert(TargetTable::Songs, &song_row("S1", "Song A", "AR1", 210.5))
            .unwrap();
        warehouse
            .insert(TargetTable::Artists, &artist_row("AR1", "Artist A"))
            .unwrap();

        // Batch size 1: rows are durable without an explicit flush.
        assert_eq!(warehouse.count(TargetTable::Songs).unwrap(), 1);
        assert_eq!(warehouse.count(TargetTable::Artists).unwrap(), 1);
    }

    #[test]
    fn test_batched_rows_stay_buffered_until_flush() {
        let warehouse = SqliteWarehouse::in_memory(100).unwrap();

        for i in 0..5 {
            let id = format!("S{}", i);
            warehouse
                .insert(TargetTable::Songs, &song_row(&id, "Song", "AR1", 100.0))
                .unwrap();
        }
        assert_eq!(warehouse.count(TargetTable::Songs).unwrap(), 0);

        warehouse.flush().unwrap();
        assert_eq!(warehouse.count(TargetTable::Songs).unwrap(), 5);
    }

    #[test]
    fn test_buffer_flushes_itself_at_batch_size() {
        let warehouse = SqliteWarehouse::in_memory(3).unwrap();

        for i in 0..3 {
            let id = format!("S{}", i);
            warehouse
                .insert(TargetTable::Songs, &song_row(&id, "Song", "AR1", 100.0))
                .unwrap();
        }
        assert_eq!(warehouse.count(TargetTable::Songs).unwrap(), 3);
    }

    #[test]
    fn test_lookup_song_requires_all_three_fields() {
        let warehouse = SqliteWarehouse::in_memory(1).unwrap();
        warehouse
            .insert(TargetTable::Songs, &song_row("S1", "Song A", "AR1", 210.5))
            .unwrap();
        warehouse
            .insert(TargetTable::Artists, &artist_row("AR1", "Artist A"))
            .unwrap();

        let hit = warehouse.lookup_song("Song A", "Artist A", 210.5).unwrap();
        assert_eq!(hit, Some(("S1".to_string(), "AR1".to_string())));

        assert!(warehouse
            .lookup_song("Song B", "Artist A", 210.5)
            .unwrap()
            .is_none());
        assert!(warehouse
            .lookup_song("Song A", "Artist B", 210.5)
            .unwrap()
            .is_none());
        assert!(warehouse
            .lookup_song("Song A", "Artist A", 210.6)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lookup_song_duration_ignores_duration() {
        let warehouse = SqliteWarehouse::in_memory(1).unwrap();
        warehouse
            .insert(TargetTable::Songs, &song_row("S1", "Song A", "AR1", 210.5))
            .unwrap();
        warehouse
            .insert(TargetTable::Artists, &artist_row("AR1", "Artist A"))
            .unwrap();

        let duration = warehouse
            .lookup_song_duration("Song A", "Artist A")
            .unwrap();
        assert_eq!(duration, Some(210.5));
        assert!(warehouse
            .lookup_song_duration("Song A", "Artist B")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_null_identifiers_are_stored_as_null() {
        let warehouse = SqliteWarehouse::in_memory(1).unwrap();
        warehouse
            .insert(
                TargetTable::Songplays,
                &[
                    json!(1542241826796i64),
                    json!("26"),
                    json!("free"),
                    Value::Null,
                    Value::Null,
                    json!(583),
                    json!("San Jose-Sunnyvale-Santa Clara, CA"),
                    json!("Mozilla/5.0"),
                ],
            )
            .unwrap();

        let conn = warehouse.conn.lock().unwrap();
        let (song_id, artist_id): (Option<String>, Option<String>) = conn
            .query_row("SELECT song_id, artist_id FROM songplays", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert!(song_id.is_none());
        assert!(artist_id.is_none());
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let warehouse = SqliteWarehouse::in_memory(1).unwrap();
        let result = warehouse.insert(TargetTable::Songs, &[json!("S1")]);
        assert!(result.is_err());
    }
}
