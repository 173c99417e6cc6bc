//! Port traits the adapters implement.

pub mod config_port;
pub mod result_port;
pub mod series_port;
