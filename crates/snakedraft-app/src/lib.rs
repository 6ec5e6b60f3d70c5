// Library root: re-exports all modules so integration tests and the binary
// share one public API.

pub mod app;
pub mod config;
pub mod console;
pub mod db;
pub mod export;
pub mod pool_csv;
pub mod protocol;
