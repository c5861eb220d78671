//! HTTP API: request DTOs, handlers and route table

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{create_routes, AppState};
