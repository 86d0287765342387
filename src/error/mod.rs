//! Error handling for window materialization.

pub mod util;

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for window materialization
#[derive(Debug, thiserror::Error)]
pub enum ParWindowError {
    /// The source file does not exist
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Rejected before any decoding started
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A requested field has no case-insensitive match in the schema
    #[error("Field '{field}' does not exist{}", describe_path(path.as_deref()))]
    UnknownField {
        field: String,
        path: Option<PathBuf>,
    },

    /// The decoder produced data that contradicts its own metadata
    #[error("Decode inconsistency: {context}")]
    DecodeInconsistency { context: String },

    /// A decoding task stopped because a sibling task failed
    #[error("Decoding cancelled after a sibling task failed")]
    Cancelled,

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error with Arrow data structures
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A background task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(String),

    /// A decoder error, annotated with the column and row group being read
    #[error("{source} (column '{field}', row group {row_group})")]
    InColumn {
        field: String,
        row_group: usize,
        #[source]
        source: Box<ParWindowError>,
    },

    /// Any of the above, annotated with the file it happened on
    #[error("{source} (file: {})", path.display())]
    WithPath {
        path: PathBuf,
        #[source]
        source: Box<ParWindowError>,
    },
}

fn describe_path(path: Option<&Path>) -> String {
    path.map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl ParWindowError {
    /// Create a decode inconsistency error
    pub fn inconsistency(context: impl Into<String>) -> Self {
        Self::DecodeInconsistency {
            context: context.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Attach the column and row group being decoded
    ///
    /// Decode inconsistencies get the location in their message; decoder
    /// errors are wrapped. Errors that already name a field, or that do not
    /// come from decoding, are returned as is.
    #[must_use]
    pub fn in_column(self, field: &str, row_group: usize) -> Self {
        match self {
            Self::DecodeInconsistency { context } => Self::DecodeInconsistency {
                context: format!("column '{field}' in row group {row_group}: {context}"),
            },
            Self::Parquet(_) | Self::Arrow(_) | Self::Io(_) | Self::Task(_) => Self::InColumn {
                field: field.to_string(),
                row_group,
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// Attach the file path to an error, unless it already names one
    #[must_use]
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            Self::NotFound { .. } | Self::WithPath { .. } => self,
            Self::UnknownField { field, path: None } => Self::UnknownField {
                field,
                path: Some(path.to_path_buf()),
            },
            Self::UnknownField { .. } => self,
            other => Self::WithPath {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        }
    }

    /// The error with any path annotation peeled off
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::WithPath { source, .. } | Self::InColumn { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error only reports that a sibling failed first
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

/// Result type for window materialization operations
pub type Result<T> = std::result::Result<T, ParWindowError>;
