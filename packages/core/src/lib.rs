// Library root. The binary in `src/main.rs` and the integration tests in
// `tests/` both build on these modules.

pub mod api;
pub mod cache;
pub mod error;
pub mod formatters;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod realtime;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod session;
pub mod storage;
pub mod stores;
pub mod types;

pub mod cli;
pub mod config;
pub mod logging;
