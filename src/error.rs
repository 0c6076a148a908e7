//! Crate-wide error type.

use thiserror::Error;

/// The error kinds a caller of this crate can observe.
///
/// `Resource` is never meant to be handled: the one place that would
/// construct it instead logs and aborts the process, per the fatal
/// allocation-failure policy.
#[derive(Debug, Error)]
pub enum Error {
    /// A file expected at a given path does not exist. Often benign: the
    /// heuristic loader treats this as "try the next option".
    #[error("not found: {0}")]
    NotFound(String),
    /// A file exists but its contents are inconsistent with the tileset
    /// or format it is supposed to hold.
    #[error("malformed: {0}")]
    Malformed(String),
    /// A transient read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid argument: unknown heuristic type, oversized thread count,
    /// or a request for functionality this crate intentionally does not
    /// implement.
    #[error("usage error: {0}")]
    Usage(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
