//! Error types for the postbox exporter
//!
//! Errors are split by component, mirroring the boundary at which they are
//! handled: everything wrapped in [`ItemError`] is recovered at the item
//! boundary and turned into an aggregate report entry, while [`BatchError`]
//! aborts a whole run.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a work source while reading or toggling an item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A display field could not be found for the item
    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    /// A display field was present but unusable
    #[error("malformed field '{field}': {value}")]
    Malformed { field: &'static str, value: String },

    /// Interacting with the item's rendering failed
    #[error("source interaction failed: {message}")]
    Interaction { message: String },
}

/// Errors raised by the polling wait primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// No probe invocation produced a value before the timeout elapsed
    #[error("condition not met within {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Errors raised by a resilient transfer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Every attempt failed; carries the cause of the last one
    #[error("transfer failed after {attempts} attempts: {last_cause}")]
    AttemptsExhausted { attempts: u32, last_cause: String },

    /// The transport reported an abort; not retried
    #[error("transfer aborted by transport")]
    Aborted,

    /// The transport reported a timeout; not retried
    #[error("transfer timed out")]
    TimedOut,
}

/// Errors raised when validating a filename template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A required token is absent from the template
    #[error("template is missing required token '{token}'")]
    MissingToken { token: &'static str },
}

/// Errors raised by the preference store
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// Reading or writing the backing file failed
    #[error("preference store I/O failed")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid TOML
    #[error("preference store is corrupt")]
    Parse(#[from] toml::de::Error),

    /// Serializing the preference map failed
    #[error("preference serialization failed")]
    Serialize(#[from] toml::ser::Error),
}

/// Any failure caught at the per-item boundary of a batch run
///
/// A single bad item never aborts the batch: these are converted into
/// aggregate report entries and iteration continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Failures outside the per-item guard, aborting the whole run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// A run is already in progress
    #[error("a batch run is already in progress")]
    AlreadyRunning,

    /// Environment or programming fault outside the per-item guard
    #[error("unexpected batch failure: {message}")]
    Unexpected { message: String },
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Extraction(_) => "extraction",
            AppError::Wait(_) => "wait",
            AppError::Transfer(_) => "transfer",
            AppError::Template(_) => "template",
            AppError::Preference(_) => "preference",
            AppError::Batch(_) => "batch",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Wait result type alias
pub type WaitResult<T> = std::result::Result<T, WaitError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Item result type alias
pub type ItemResult<T> = std::result::Result<T, ItemError>;
