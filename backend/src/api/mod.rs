//! HTTP surface: REST endpoints for the three ingestion paths, batch
//! registration, and a real-time log stream.

pub mod logs;
pub mod server;
pub mod types;
