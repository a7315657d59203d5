//! Core domain types and logic.

pub mod returns;
pub mod position;
pub mod transaction;
pub mod intraday;
pub mod diff;
pub mod stats;
pub mod format;
pub mod report_table;
pub mod error;
