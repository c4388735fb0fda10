pub mod log;

pub use log::{LogEntry, Severity};
