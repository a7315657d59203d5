//! Port traits (interfaces) for hexagonal architecture.

pub mod config_port;
pub mod returns_port;
pub mod report_port;
