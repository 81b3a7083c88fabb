//! Concrete adapter implementations for ports.

pub mod console_report;
pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
