//! Error types for taskbell.

/// Top-level error type for the reminder service.
#[derive(Debug, thiserror::Error)]
pub enum TaskbellError {
    /// A task line matched none of the accepted layouts.
    #[error("parse error: {0}")]
    Parse(#[from] crate::tasks::parser::ParseError),

    /// A deadline fragment could not be turned into a timestamp.
    #[error("deadline error: {0}")]
    Deadline(#[from] crate::tasks::deadline::DeadlineError),

    /// Task file read/write failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Outbound message could not be delivered.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskbellError>;
