mod models;
mod schema;
mod store;
mod trait_def;

pub use models::TargetTable;
pub use schema::WAREHOUSE_SCHEMA_SQL;
pub use store::SqliteWarehouse;
pub use trait_def::EventWarehouse;
