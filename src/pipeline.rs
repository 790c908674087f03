//! Run orchestration.
//!
//! One run loads, in order: songs → artists → time dimension → users →
//! songplay facts. The order is a correctness dependency, not a convenience:
//! fact resolution queries songs and artists through the store, so those
//! tables must be flushed before the first lookup.

use crate::discovery::collect_files;
use crate::projection::{project, RowPolicy};
use crate::records::{load_documents, load_line_records, Record};
use crate::resolver::resolve;
use crate::time_dim::decompose_event_times;
use crate::warehouse::{EventWarehouse, TargetTable};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Source fields projected into the songs dimension.
const SONG_COLUMNS: [&str; 5] = ["song_id", "title", "artist_id", "year", "duration"];

/// Source fields projected into the artists dimension. The first three are
/// the identity columns where empty strings count as missing.
const ARTIST_COLUMNS: [&str; 5] = [
    "artist_id",
    "artist_name",
    "artist_location",
    "artist_latitude",
    "artist_longitude",
];

/// Source fields projected into the users dimension.
const USER_COLUMNS: [&str; 5] = ["userId", "firstName", "lastName", "gender", "level"];

/// Tunables for a pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// File name suffix selecting input files during discovery.
    pub file_suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            file_suffix: ".json".to_string(),
        }
    }
}

/// Per-table load outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableStats {
    pub inserted: usize,
    pub dropped: usize,
    pub deduplicated: usize,
}

/// Aggregate outcome of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub catalog_files: usize,
    pub log_files: usize,
    pub songs: TableStats,
    pub artists: TableStats,
    pub time: TableStats,
    pub users: TableStats,
    pub songplays: TableStats,
    pub resolved_plays: usize,
    pub unresolved_plays: usize,
}

impl LoadStats {
    pub fn log_summary(&self) {
        info!(
            "Loaded {} catalog files and {} log files",
            self.catalog_files, self.log_files
        );
        for (name, table) in [
            ("songs", &self.songs),
            ("artists", &self.artists),
            ("time", &self.time),
            ("users", &self.users),
            ("songplays", &self.songplays),
        ] {
            info!(
                "{}: {} inserted, {} dropped, {} duplicates",
                name, table.inserted, table.dropped, table.deduplicated
            );
        }
        info!(
            "Songplay resolution: {} matched, {} without catalog identifiers",
            self.resolved_plays, self.unresolved_plays
        );
    }
}

/// One activity event that survived the songplay null drop, with the fields
/// fact derivation needs pulled out and typed.
struct PlayEvent {
    start_time: i64,
    user_id: Value,
    level: Value,
    song: String,
    artist: String,
    length: f64,
    session_id: Value,
    location: Value,
    user_agent: Value,
}

/// Extract a fact source from an event, or `None` to drop it.
///
/// The songplay policy is stricter than the time dimension's and is NOT
/// page-filtered: any null value anywhere in the record drops the event,
/// and the nine fields the fact row needs must be present with usable types.
/// The asymmetry with the time dimension (which filters on page and
/// tolerates nulls elsewhere) is deliberate; do not unify the two policies.
fn play_event(event: &Record) -> Option<PlayEvent> {
    if event.values().any(Value::is_null) {
        return None;
    }
    Some(PlayEvent {
        start_time: event.get("ts")?.as_i64()?,
        user_id: event.get("userId")?.clone(),
        level: event.get("level")?.clone(),
        song: event.get("song")?.as_str()?.to_string(),
        artist: event.get("artist")?.as_str()?.to_string(),
        length: event.get("length")?.as_f64()?,
        session_id: event.get("sessionId")?.clone(),
        location: event.get("location")?.clone(),
        user_agent: event.get("userAgent")?.clone(),
    })
}

fn optional_id(id: Option<String>) -> Value {
    id.map(Value::from).unwrap_or(Value::Null)
}

/// Sequences extraction, projection, and loading for all five tables.
pub struct LoadPipeline<'a> {
    warehouse: &'a dyn EventWarehouse,
    config: PipelineConfig,
}

impl<'a> LoadPipeline<'a> {
    pub fn new(warehouse: &'a dyn EventWarehouse, config: PipelineConfig) -> Self {
        Self { warehouse, config }
    }

    /// Run the whole load: catalog corpus into songs/artists, then the
    /// activity log corpus into time/users/songplays.
    pub fn run(&self, song_data_root: &Path, log_data_root: &Path) -> Result<LoadStats> {
        let mut stats = LoadStats::default();

        let catalog_files = collect_files(song_data_root, &self.config.file_suffix)
            .context("Discovering catalog files")?;
        stats.catalog_files = catalog_files.len();
        info!("Found {} catalog files", catalog_files.len());
        let catalog_records =
            load_documents(&catalog_files).context("Loading catalog records")?;

        stats.songs = self
            .load_projected(
                TargetTable::Songs,
                &catalog_records,
                &SONG_COLUMNS,
                RowPolicy::DropAnyNull,
            )
            .context("Loading songs table")?;
        stats.artists = self
            .load_projected(
                TargetTable::Artists,
                &catalog_records,
                &ARTIST_COLUMNS,
                RowPolicy::EmptyAsMissingOnFirst(3),
            )
            .context("Loading artists table")?;

        let log_files = collect_files(log_data_root, &self.config.file_suffix)
            .context("Discovering activity log files")?;
        stats.log_files = log_files.len();
        info!("Found {} activity log files", log_files.len());
        let events = load_line_records(&log_files).context("Loading activity events")?;
        info!("Loaded {} activity events", events.len());

        stats.time = self
            .load_time_dimension(&events)
            .context("Loading time table")?;
        stats.users = self
            .load_projected(
                TargetTable::Users,
                &events,
                &USER_COLUMNS,
                RowPolicy::DropAnyNullThenDedup,
            )
            .context("Loading users table")?;
        self.load_songplays(&events, &mut stats)
            .context("Loading songplays table")?;

        stats.log_summary();
        Ok(stats)
    }

    /// Project records into one table and flush it.
    fn load_projected(
        &self,
        table: TargetTable,
        records: &[Record],
        columns: &[&str],
        policy: RowPolicy,
    ) -> Result<TableStats> {
        let projection = project(records, columns, policy);
        for row in &projection.rows {
            self.warehouse.insert(table, row)?;
        }
        self.warehouse.flush()?;
        Ok(TableStats {
            inserted: projection.rows.len(),
            dropped: projection.dropped,
            deduplicated: projection.deduplicated,
        })
    }

    fn load_time_dimension(&self, events: &[Record]) -> Result<TableStats> {
        let (rows, unusable) = decompose_event_times(events);
        for row in &rows {
            self.warehouse.insert(TargetTable::Time, &row.to_row())?;
        }
        self.warehouse.flush()?;
        Ok(TableStats {
            inserted: rows.len(),
            dropped: unusable,
            deduplicated: 0,
        })
    }

    fn load_songplays(&self, events: &[Record], stats: &mut LoadStats) -> Result<()> {
        for event in events {
            let Some(play) = play_event(event) else {
                stats.songplays.dropped += 1;
                continue;
            };

            let resolved = resolve(self.warehouse, &play.song, &play.artist, play.length)?;
            if resolved.is_resolved() {
                stats.resolved_plays += 1;
            } else {
                stats.unresolved_plays += 1;
            }

            let row = vec![
                Value::from(play.start_time),
                play.user_id,
                play.level,
                optional_id(resolved.song_id),
                optional_id(resolved.artist_id),
                play.session_id,
                play.location,
                play.user_agent,
            ];
            self.warehouse.insert(TargetTable::Songplays, &row)?;
            stats.songplays.inserted += 1;
        }
        self.warehouse.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn next_song_event() -> serde_json::Value {
        json!({
            "page": "NextSong",
            "ts": 1542241826796i64,
            "userId": "26",
            "firstName": "Ryan",
            "lastName": "Smith",
            "gender": "M",
            "level": "free",
            "song": "Song A",
            "artist": "Artist A",
            "length": 210.5,
            "sessionId": 583,
            "location": "San Jose-Sunnyvale-Santa Clara, CA",
            "userAgent": "Mozilla/5.0"
        })
    }

    #[test]
    fn test_play_event_extracts_complete_record() {
        let play = play_event(&event(next_song_event())).unwrap();
        assert_eq!(play.start_time, 1542241826796);
        assert_eq!(play.song, "Song A");
        assert_eq!(play.artist, "Artist A");
        assert_eq!(play.length, 210.5);
    }

    #[test]
    fn test_play_event_drops_on_any_null() {
        let mut fixture = next_song_event();
        fixture["song"] = Value::Null;
        assert!(play_event(&event(fixture)).is_none());
    }

    #[test]
    fn test_play_event_drops_null_outside_projected_fields() {
        let mut fixture = next_song_event();
        // A null anywhere in the record drops it, even in a field the fact
        // row never uses.
        fixture["firstName"] = Value::Null;
        assert!(play_event(&event(fixture)).is_none());
    }

    #[test]
    fn test_play_event_drops_on_missing_required_field() {
        let mut fixture = next_song_event();
        fixture.as_object_mut().unwrap().remove("sessionId");
        assert!(play_event(&event(fixture)).is_none());
    }

    #[test]
    fn test_play_event_is_not_page_filtered() {
        let mut fixture = next_song_event();
        fixture["page"] = json!("Home");
        assert!(play_event(&event(fixture)).is_some());
    }
}
