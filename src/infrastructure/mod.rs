// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod csv_export;
pub mod file_store;
pub mod http_api;
