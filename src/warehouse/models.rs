//! Target table metadata for the star schema.
//!
//! The pipeline addresses tables through this enum rather than raw names so
//! the column order used by projection and the column order used by the
//! insert statements cannot drift apart.

/// The five warehouse tables, in no particular order. Load order is the
/// pipeline's concern, not the table's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetTable {
    Songs,
    Artists,
    Time,
    Users,
    Songplays,
}

impl TargetTable {
    pub const ALL: [TargetTable; 5] = [
        TargetTable::Songs,
        TargetTable::Artists,
        TargetTable::Time,
        TargetTable::Users,
        TargetTable::Songplays,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            TargetTable::Songs => "songs",
            TargetTable::Artists => "artists",
            TargetTable::Time => "time",
            TargetTable::Users => "users",
            TargetTable::Songplays => "songplays",
        }
    }

    /// Column names in insert order. `songplays.songplay_id` is a SQLite
    /// rowid alias and is not listed: the store never supplies it.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TargetTable::Songs => &["song_id", "title", "artist_id", "year", "duration"],
            TargetTable::Artists => &["artist_id", "name", "location", "latitude", "longitude"],
            TargetTable::Time => &[
                "start_time",
                "hour",
                "day",
                "week",
                "month",
                "year",
                "weekday",
            ],
            TargetTable::Users => &["user_id", "first_name", "last_name", "gender", "level"],
            TargetTable::Songplays => &[
                "start_time",
                "user_id",
                "level",
                "song_id",
                "artist_id",
                "session_id",
                "location",
                "user_agent",
            ],
        }
    }

    /// Parameterized insert statement for this table.
    pub fn insert_sql(&self) -> String {
        let columns = self.columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name(),
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}
