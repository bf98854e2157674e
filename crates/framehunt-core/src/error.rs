//! Crate-wide error type.
//!
//! Mirrors the error kinds of the session model: configuration failures are
//! fatal at startup, out-of-range requests are fatal to the current request
//! only, and external I/O failures never corrupt session state (see
//! `SessionCore::submit`).

use thiserror::Error;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A required configuration field was missing or ill-typed. Fatal at
    /// startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A history index, frame ID, or display type fell outside its valid
    /// range. Fatal to the current request; session state is left
    /// untouched.
    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i64 },

    /// A SOM-backed display was requested before the map finished training.
    /// Callers recover locally by treating this as an empty page rather
    /// than propagating it.
    #[error("self-organising map not ready")]
    NotReady,

    /// The evaluation server was unreachable or rejected the request.
    #[error("evaluation server error: {0}")]
    EvalServer(String),

    /// An internal invariant broke. Unrecoverable.
    #[error("internal error: {0}")]
    Internal(String),
}
