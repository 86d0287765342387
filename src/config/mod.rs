//! Configuration for `WindowReader`.

use crate::error::{ParWindowError, Result};

/// Default batch size for decoding column values
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size override from the environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|size| *size > 0)
}

/// Column order of an assembled table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnOrder {
    /// Reorder columns to match the requested field selection
    #[default]
    Selection,
    /// Keep the order in which parallel subsets finished decoding
    Completion,
}

/// Configuration for the `WindowReader`
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Number of decoder handles opened on the file (one per parallel task)
    pub degree_of_parallelism: usize,
    /// Number of values decoded per batch when reading a column
    pub batch_size: usize,
    /// Column order of the assembled table
    pub column_order: ColumnOrder,
    /// Cross-check each opened row group's row count against file metadata
    pub verify_row_counts: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            degree_of_parallelism: 1,
            batch_size: get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE),
            column_order: ColumnOrder::default(),
            verify_row_counts: true,
        }
    }
}

impl ReaderConfig {
    /// Configuration with the given degree of parallelism
    #[must_use]
    pub fn with_parallelism(degree_of_parallelism: usize) -> Self {
        Self {
            degree_of_parallelism,
            ..Self::default()
        }
    }

    /// Configuration with one handle per available CPU
    #[must_use]
    pub fn with_available_parallelism() -> Self {
        Self::with_parallelism(num_cpus::get())
    }

    #[must_use]
    pub const fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn column_order(mut self, column_order: ColumnOrder) -> Self {
        self.column_order = column_order;
        self
    }

    #[must_use]
    pub const fn verify_row_counts(mut self, verify: bool) -> Self {
        self.verify_row_counts = verify;
        self
    }

    /// Reject configurations that cannot drive a decode
    pub fn validate(&self) -> Result<()> {
        if self.degree_of_parallelism == 0 {
            return Err(ParWindowError::invalid_config(
                "degree_of_parallelism must be a positive integer",
            ));
        }
        if self.batch_size == 0 {
            return Err(ParWindowError::invalid_config(
                "batch_size must be a positive integer",
            ));
        }
        Ok(())
    }
}
