//! Structured error types for the ingestion and memory pipeline
//!
//! Ingestion-side failures are logged and never crash the watcher loop; the
//! variants here exist so every caller can tell an I/O failure (retry later,
//! file stays in the inbox) from a parse failure (archive, never retry) from
//! a store failure (surfaced to the caller).

use std::fmt;

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    /// File read/hash/move error. The file is left in place for retry.
    IoFailure { path: String, details: String },

    /// Format-specific extraction error. The file is treated as empty and
    /// archived to avoid retrying indefinitely.
    ParseFailure { file: String, details: String },

    /// Missing/unusable directory or bad numeric setting. Logged at startup,
    /// falls back to defaults where safe.
    ConfigInvalid { field: String, reason: String },

    /// Write-path failure in the memory store. The caller decides whether to
    /// retry.
    StoreError(String),

    /// A stored record failed validation at construction (missing or
    /// malformed field).
    InvalidRecord { field: String, reason: String },

    /// Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl AppError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::IoFailure { .. } => "IO_FAILURE",
            Self::ParseFailure { .. } => "PARSE_FAILURE",
            Self::ConfigInvalid { .. } => "CONFIG_INVALID",
            Self::StoreError(_) => "STORE_ERROR",
            Self::InvalidRecord { .. } => "INVALID_RECORD",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::IoFailure { path, details } => {
                format!("I/O failure on '{path}': {details}")
            }
            Self::ParseFailure { file, details } => {
                format!("Failed to parse '{file}': {details}")
            }
            Self::ConfigInvalid { field, reason } => {
                format!("Invalid configuration for '{field}': {reason}")
            }
            Self::StoreError(msg) => format!("Store error: {msg}"),
            Self::InvalidRecord { field, reason } => {
                format!("Invalid record field '{field}': {reason}")
            }
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// I/O and store write failures are worth retrying; everything else is
    /// deterministic and is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IoFailure { .. } | Self::StoreError(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::IoFailure {
            path: String::new(),
            details: err.to_string(),
        }
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
