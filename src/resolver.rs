//! Song/artist reconciliation for songplay facts.
//!
//! Activity events carry a denormalized (song title, artist name, duration)
//! triple. Resolution joins that triple back to the normalized song/artist
//! identifiers already loaded into the warehouse. A miss is an expected
//! outcome, not an error: the fact row keeps null identifiers.

use crate::warehouse::EventWarehouse;
use anyhow::Result;
use tracing::warn;

/// Durations closer than this to a catalog candidate are treated as the same
/// recording for warning purposes. The match itself stays exact.
const NEAR_MISS_SECONDS: f64 = 0.01;

/// Identifier pair for a resolved play. Both fields are `None` on a miss.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedPlay {
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
}

impl ResolvedPlay {
    pub fn is_resolved(&self) -> bool {
        self.song_id.is_some()
    }
}

/// Look up the catalog identifiers for a played song.
///
/// The match requires exact equality on title, artist name, and duration.
/// Duration equality is exact floating-point comparison: catalog and log
/// sources are expected to carry the identical encoding. When they do not,
/// the lookup misses; a near-miss on duration alone is logged so the
/// fragility is visible in the run output.
pub fn resolve(
    warehouse: &dyn EventWarehouse,
    title: &str,
    artist_name: &str,
    duration: f64,
) -> Result<ResolvedPlay> {
    if let Some((song_id, artist_id)) = warehouse.lookup_song(title, artist_name, duration)? {
        return Ok(ResolvedPlay {
            song_id: Some(song_id),
            artist_id: Some(artist_id),
        });
    }

    if let Some(catalog_duration) = warehouse.lookup_song_duration(title, artist_name)? {
        if (catalog_duration - duration).abs() < NEAR_MISS_SECONDS {
            warn!(
                "Unresolved play {:?} by {:?}: catalog duration {} differs from event \
                 duration {} only in float encoding",
                title, artist_name, catalog_duration, duration
            );
        }
    }

    Ok(ResolvedPlay::default())
}
