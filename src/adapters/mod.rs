//! Concrete adapter implementations for ports.

#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod iex_adapter;
pub mod memory_store;
pub mod system_clock;
