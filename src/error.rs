//! Error types for tzdb-ingest
//!
//! This module defines the error hierarchy that covers:
//! - Configuration and CLI errors
//! - File and directory validation errors
//! - Field grammar errors raised by the mini-parsers
//! - Tz database and gazetteer parser errors
//! - Sink (SQLite) errors
//! - Worker thread errors
//!
//! Lenient callers report a [`FieldError`] and substitute a default; strict
//! callers wrap it in a [`GazetteerError`] and propagate.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for an ingest run
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File or directory validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Tz database parser errors
    #[error("Tz database error: {0}")]
    Tz(#[from] TzError),

    /// Gazetteer parser errors
    #[error("Gazetteer error: {0}")]
    Gazetteer(#[from] GazetteerError),

    /// Sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither input directory is usable
    #[error("No valid input directory: provide a valid tz database directory, gazetteer directory, or both")]
    NoValidDirectory,

    /// The time zone index was never published
    #[error("Time zone name index unavailable: the tz database stage did not complete")]
    IndexUnavailable,

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither directory was given on the command line
    #[error("At least one of --tzdb or --gazetteer is required")]
    NoInputDirectory,

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Invalid current year
    #[error("Invalid year {year}: must be between 1 and {max}")]
    InvalidYear { year: i32, max: i32 },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// File and directory validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Path does not exist
    #[error("Path not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Directory is missing something it needs to be parsed
    #[error("Invalid directory '{path}': {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    /// File name is not one of the accepted names
    #[error("File '{path}' is not an accepted data file")]
    UnacceptedName { path: PathBuf },

    /// File extension is not accepted
    #[error("File '{path}' has unsupported extension")]
    UnsupportedExtension { path: PathBuf },

    /// First line did not match the expected header
    #[error("File '{path}' has an invalid header: {reason}")]
    InvalidHeader { path: PathBuf, reason: String },

    /// File could not be read
    #[error("Failed to read '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },
}

impl ValidationError {
    /// The path the error is about
    pub fn path(&self) -> &PathBuf {
        match self {
            ValidationError::NotFound { path }
            | ValidationError::InvalidDirectory { path, .. }
            | ValidationError::UnacceptedName { path }
            | ValidationError::UnsupportedExtension { path }
            | ValidationError::InvalidHeader { path, .. }
            | ValidationError::ReadFailed { path, .. } => path,
        }
    }
}

/// Grammar errors from a single field
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Year token could not be parsed
    #[error("invalid year '{0}'")]
    InvalidYear(String),

    /// Month token could not be parsed
    #[error("invalid month '{0}'")]
    InvalidMonth(String),

    /// Time or offset token could not be parsed
    #[error("invalid time '{0}'")]
    InvalidTime(String),

    /// Integer token could not be parsed
    #[error("invalid integer for {field}: '{value}'")]
    InvalidInteger { field: &'static str, value: String },

    /// Floating point token could not be parsed
    #[error("invalid number for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// Token was expected to be a single character
    #[error("invalid character for {field}: '{value}'")]
    InvalidChar { field: &'static str, value: String },

    /// Date token could not be parsed
    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

/// Tz database parser errors
#[derive(Error, Debug)]
pub enum TzError {
    /// A reference (.tab) file could not be read
    #[error("Failed to read reference file '{path}': {reason}")]
    ReferenceFile { path: PathBuf, reason: String },

    /// A data file could not be read
    #[error("Failed to read '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },
}

/// Gazetteer parser errors
#[derive(Error, Debug)]
pub enum GazetteerError {
    /// A strict numeric field failed; aborts the owning file and its worker
    #[error("{path}:{line}: {source}")]
    Field {
        path: PathBuf,
        line: u64,
        source: FieldError,
    },

    /// A city or feature-code file could not be read
    #[error("Failed to read '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },
}

/// Sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to create database file
    #[error("Failed to create database at '{path}': {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Writer channel closed unexpectedly
    #[error("Sink writer channel closed unexpectedly")]
    ChannelClosed,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker thread could not be spawned
    #[error("Failed to spawn {name}: {reason}")]
    SpawnFailed { name: String, reason: String },

    /// A stage thread panicked
    #[error("Stage '{stage}' panicked")]
    StagePanicked { stage: &'static str },
}

/// Result type alias for IngestError
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for FieldError
pub type FieldResult<T> = std::result::Result<T, FieldError>;

/// Result type alias for SinkError
pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let sink_err = SinkError::ChannelClosed;
        let err: IngestError = sink_err.into();
        assert!(matches!(err, IngestError::Sink(_)));
    }

    #[test]
    fn test_gazetteer_field_error_display() {
        let err = GazetteerError::Field {
            path: PathBuf::from("cities.txt"),
            line: 12,
            source: FieldError::InvalidInteger {
                field: "population",
                value: "abc".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "cities.txt:12: invalid integer for population: 'abc'"
        );
    }

    #[test]
    fn test_validation_error_path() {
        let err = ValidationError::UnsupportedExtension {
            path: PathBuf::from("/data/readme.md"),
        };
        assert_eq!(err.path(), &PathBuf::from("/data/readme.md"));
    }
}
