//! Substitution session lifecycle

pub mod manager;
pub mod report;

pub use manager::Session;
pub use report::SessionReport;
