//! Column projection and per-table row filtering.
//!
//! Each target table selects a fixed column list out of the heterogeneous
//! input records and applies its own policy for incomplete data. Dropping is
//! the only failure-absorption mechanism: rows are never repaired or
//! defaulted, and drops surface only as aggregate counts.

use crate::records::Record;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Policy applied to projected rows before they are handed to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowPolicy {
    /// Drop the row when any projected field is null or missing.
    DropAnyNull,

    /// Coerce empty strings to null on the first `n` projected columns, then
    /// drop the row when any of those is null. Remaining columns pass through
    /// unvalidated.
    EmptyAsMissingOnFirst(usize),

    /// Drop the row when any projected field is null or missing, then
    /// deduplicate by exact row equality, keeping first-seen order.
    DropAnyNullThenDedup,
}

/// Result of projecting a record set into rows for one target table.
#[derive(Debug, Default)]
pub struct Projection {
    pub rows: Vec<Vec<Value>>,
    pub dropped: usize,
    pub deduplicated: usize,
}

fn any_null(values: &[Value]) -> bool {
    values.iter().any(Value::is_null)
}

/// Select `columns` from each record in order and apply `policy`.
///
/// A field that is absent from a record projects as null, so missing and
/// explicitly-null fields are treated identically.
pub fn project(records: &[Record], columns: &[&str], policy: RowPolicy) -> Projection {
    let mut projection = Projection::default();
    let mut seen = HashSet::new();

    for record in records {
        let mut row: Vec<Value> = columns
            .iter()
            .map(|column| record.get(*column).cloned().unwrap_or(Value::Null))
            .collect();

        let keep = match policy {
            RowPolicy::DropAnyNull | RowPolicy::DropAnyNullThenDedup => !any_null(&row),
            RowPolicy::EmptyAsMissingOnFirst(n) => {
                for value in row.iter_mut().take(n) {
                    if matches!(value, Value::String(s) if s.is_empty()) {
                        *value = Value::Null;
                    }
                }
                !any_null(&row[..n.min(row.len())])
            }
        };
        if !keep {
            projection.dropped += 1;
            continue;
        }

        if policy == RowPolicy::DropAnyNullThenDedup {
            let key = Value::Array(row.clone()).to_string();
            if !seen.insert(key) {
                projection.deduplicated += 1;
                continue;
            }
        }

        projection.rows.push(row);
    }

    if projection.dropped > 0 || projection.deduplicated > 0 {
        debug!(
            "Projection kept {} rows ({} dropped, {} duplicates)",
            projection.rows.len(),
            projection.dropped,
            projection.deduplicated
        );
    }
    projection
}
