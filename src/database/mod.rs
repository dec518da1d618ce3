// Database module for Scan History
// SQLite persistence for scan records, their tags and user settings

pub mod manager;
pub mod migrations;
pub mod models;
pub mod scan_records_repo;
pub mod settings_repo;
pub mod tags_repo;

pub use manager::DatabaseManager;
pub use models::*;
