//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_store;
pub mod file_config_adapter;
pub mod log_notifier;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "telegram")]
pub mod telegram_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
