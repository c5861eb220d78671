//! API handlers grouped by resource

pub mod health;
pub mod log_handlers;
pub mod transaction_handlers;
