//! Time-dimension decomposition of activity timestamps.
//!
//! Only `page == "NextSong"` events feed the time dimension. Each qualifying
//! event's `ts` (integer epoch milliseconds) decomposes into calendar
//! attributes so analytical queries can aggregate by hour/day/week without
//! repeating date arithmetic.
//!
//! Duplicate timestamps across events are NOT deduplicated: one qualifying
//! event, one row. Collapsing them would change fact/dimension join
//! cardinality for downstream queries.

use crate::records::Record;
use chrono::{DateTime, Datelike, Timelike};
use serde::Serialize;
use serde_json::Value;

/// Calendar attributes derived from one qualifying event timestamp.
///
/// `weekday` is the ISO weekday minus one: 0 = Monday .. 6 = Sunday. Epoch 0
/// (1970-01-01) was a Thursday and decomposes to weekday 3.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimeDimensionRow {
    /// Original timestamp, epoch milliseconds.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    /// ISO-8601 week number, 1-53.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl TimeDimensionRow {
    /// The row shape inserted into the `time` table.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.start_time),
            Value::from(self.hour),
            Value::from(self.day),
            Value::from(self.week),
            Value::from(self.month),
            Value::from(self.year),
            Value::from(self.weekday),
        ]
    }
}

/// Decompose one epoch-millisecond timestamp. Returns `None` when the value
/// is outside chrono's representable range.
pub fn decompose(ts_millis: i64) -> Option<TimeDimensionRow> {
    let datetime = DateTime::from_timestamp_millis(ts_millis)?;
    Some(TimeDimensionRow {
        start_time: ts_millis,
        hour: datetime.hour(),
        day: datetime.day(),
        week: datetime.iso_week().week(),
        month: datetime.month(),
        year: datetime.year(),
        weekday: datetime.weekday().num_days_from_monday(),
    })
}

fn is_next_song(event: &Record) -> bool {
    event.get("page").and_then(Value::as_str) == Some("NextSong")
}

/// Filter `events` to NextSong pages and decompose each `ts`.
///
/// Returns the rows plus the count of qualifying events that had no usable
/// integer timestamp (those produce no row).
pub fn decompose_event_times(events: &[Record]) -> (Vec<TimeDimensionRow>, usize) {
    let mut rows = Vec::new();
    let mut unusable = 0;

    for event in events.iter().filter(|e| is_next_song(e)) {
        let decomposed = event
            .get("ts")
            .and_then(Value::as_i64)
            .and_then(decompose);
        match decomposed {
            Some(row) => rows.push(row),
            None => unusable += 1,
        }
    }

    (rows, unusable)
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

    #[test]
    fn test_epoch_zero_is_a_thursday() {
        let row = decompose(0).unwrap();
        assert_eq!(row.start_time, 0);
        assert_eq!(row.hour, 0);
        assert_eq!(row.day, 1);
        assert_eq!(row.week, 1);
        assert_eq!(row.month, 1);
        assert_eq!(row.year, 1970);
        // 1970-01-01 was a Thursday; 0 = Monday, so Thursday is 3.
        assert_eq!(row.weekday, 3);
    }

    #[test]
    fn test_decompose_known_timestamp() {
        // 2018-11-15 00:30:26.796 UTC, a Thursday in ISO week 46.
        let row = decompose(1542241826796).unwrap();
        assert_eq!(row.hour, 0);
        assert_eq!(row.day, 15);
        assert_eq!(row.week, 46);
        assert_eq!(row.month, 11);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, 3);
    }

    #[test]
    fn test_round_trip_on_calendar_components() {
        use chrono::{TimeZone, Utc};

        let source = Utc.with_ymd_and_hms(2018, 11, 21, 17, 5, 9).unwrap();
        let row = decompose(source.timestamp_millis()).unwrap();

        let rebuilt = Utc
            .with_ymd_and_hms(row.year, row.month, row.day, row.hour, 0, 0)
            .unwrap();
        assert_eq!(rebuilt.year(), source.year());
        assert_eq!(rebuilt.month(), source.month());
        assert_eq!(rebuilt.day(), source.day());
        assert_eq!(rebuilt.hour(), source.hour());
    }

    #[test]
    fn test_only_next_song_events_qualify() {
        let events = vec![
            event(json!({"page": "NextSong", "ts": 1542241826796i64})),
            event(json!({"page": "Login", "ts": 1542241826796i64})),
            event(json!({"page": "Home", "ts": 1542241826796i64})),
        ];

        let (rows, unusable) = decompose_event_times(&events);
        assert_eq!(rows.len(), 1);
        assert_eq!(unusable, 0);
    }

    #[test]
    fn test_duplicate_timestamps_are_kept() {
        let events = vec![
            event(json!({"page": "NextSong", "ts": 1542241826796i64})),
            event(json!({"page": "NextSong", "ts": 1542241826796i64})),
        ];

        let (rows, _) = decompose_event_times(&events);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
    }

    #[test]
    fn test_next_song_without_timestamp_is_counted() {
        let events = vec![
            event(json!({"page": "NextSong", "ts": null})),
            event(json!({"page": "NextSong"})),
            event(json!({"page": "NextSong", "ts": 1542241826796i64})),
        ];

        let (rows, unusable) = decompose_event_times(&events);
        assert_eq!(rows.len(), 1);
        assert_eq!(unusable, 2);
    }
}
