//! EventWarehouse trait definition.
//!
//! The pipeline talks to the store through this trait so the load logic can
//! be exercised against any backend that offers parameterized inserts and
//! the one catalog lookup the fact table needs.

use super::models::TargetTable;
use anyhow::Result;
use serde_json::Value;

/// Storage backend for the analytics warehouse.
pub trait EventWarehouse: Send + Sync {
    /// Queue one row for insertion into `table`. Values arrive in the
    /// table's column order; nulls are inserted as SQL NULL. Durability is
    /// governed by the implementation's flush policy.
    fn insert(&self, table: TargetTable, row: &[Value]) -> Result<()>;

    /// Make all queued rows durable. The pipeline flushes between tables so
    /// later stages observe earlier ones.
    fn flush(&self) -> Result<()>;

    /// Find the (song_id, artist_id) pair matching a played song by exact
    /// title, artist name, and duration. First match wins when the catalog
    /// contains duplicates.
    fn lookup_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<(String, String)>>;

    /// Duration of the first song matching title and artist name alone.
    /// Used to detect lookups that missed only on float encoding.
    fn lookup_song_duration(&self, title: &str, artist_name: &str) -> Result<Option<f64>>;

    /// Durable row count of `table`, for run summaries.
    fn count(&self, table: TargetTable) -> Result<usize>;
}
