//! Playmart ETL library
//!
//! Batch ingestion for a music-streaming analytics warehouse: song catalog
//! files and user activity logs go in, a SQLite star schema comes out. This
//! library exposes the internal modules for testing and potential reuse.

pub mod discovery;
pub mod pipeline;
pub mod projection;
pub mod records;
pub mod resolver;
pub mod time_dim;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use pipeline::{LoadPipeline, LoadStats, PipelineConfig, TableStats};
pub use warehouse::{EventWarehouse, SqliteWarehouse, TargetTable};
