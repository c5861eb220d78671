//! Register Service (regsrv)
//!
//! Operator console backend for Modbus TCP field devices: executes one
//! register transaction per request, logs every attempt to a durable store
//! and lets clients enrich logged responses with derived values.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod transport;

pub use error::{RegSrvError, Result};
