//! Decoder boundary: sources of schema, row-group metadata and column values.
//!
//! A [`ColumnarSource`] is one open handle on a file. Row groups are read
//! through short-lived [`RowGroupCursor`]s which are always released through
//! [`ScopedCursor`], including on error paths.

pub mod memory;
pub mod parquet;

use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::error::util::swallow_cleanup_error;
use crate::error::Result;
use crate::schema::{Field, NativeValue, Schema};

pub use self::memory::{InMemorySource, SourceStats};
pub use self::parquet::ParquetSource;

/// Lazily decoded values of one column in one row group
pub type ColumnValues<'a> = Box<dyn Iterator<Item = Result<NativeValue>> + 'a>;

/// Access to the data of a single row group
pub trait RowGroupCursor {
    /// Index of the row group in the file
    fn index(&self) -> usize;

    /// Number of rows in the row group
    fn row_count(&self) -> u64;

    /// Start decoding one column; values are produced on demand
    fn read_column(&mut self, field: &Field) -> Result<ColumnValues<'_>>;

    /// Release decoding resources held by the cursor
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One open, read-only handle on a columnar file
pub trait ColumnarSource: Send + Sync {
    /// Path of the underlying file, if there is one
    fn path(&self) -> Option<&Path> {
        None
    }

    fn schema(&self) -> &Schema;

    fn row_group_count(&self) -> usize;

    /// Row count of every row group, from file metadata
    fn row_group_row_counts(&self) -> Result<Vec<u64>>;

    /// Open a cursor on one row group
    fn open_row_group(&self, index: usize) -> Result<Box<dyn RowGroupCursor + '_>>;

    /// Release the handle; called once when its owner is dropped
    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// A row-group cursor that is closed when it goes out of scope
pub struct ScopedCursor<'a> {
    cursor: Box<dyn RowGroupCursor + 'a>,
    closed: bool,
}

impl<'a> ScopedCursor<'a> {
    /// Open row group `index` on `source`
    pub fn open(source: &'a dyn ColumnarSource, index: usize) -> Result<Self> {
        Ok(Self {
            cursor: source.open_row_group(index)?,
            closed: false,
        })
    }

    /// Close the cursor now and report the outcome
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.cursor.close()
    }
}

impl<'a> Deref for ScopedCursor<'a> {
    type Target = dyn RowGroupCursor + 'a;

    fn deref(&self) -> &Self::Target {
        self.cursor.as_ref()
    }
}

impl DerefMut for ScopedCursor<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor.as_mut()
    }
}

impl Drop for ScopedCursor<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            let index = self.cursor.index();
            swallow_cleanup_error(&format!("row group {index} cursor"), self.cursor.close());
        }
    }
}

/// Owns a source and releases it when dropped
///
/// Wrapped in an `Arc`, release happens when the last task holding the handle
/// lets go of it.
#[derive(Debug)]
pub struct ReleaseOnDrop<S: ColumnarSource>(S);

impl<S: ColumnarSource> ReleaseOnDrop<S> {
    pub const fn new(source: S) -> Self {
        Self(source)
    }
}

impl<S: ColumnarSource> ColumnarSource for ReleaseOnDrop<S> {
    fn path(&self) -> Option<&Path> {
        self.0.path()
    }

    fn schema(&self) -> &Schema {
        self.0.schema()
    }

    fn row_group_count(&self) -> usize {
        self.0.row_group_count()
    }

    fn row_group_row_counts(&self) -> Result<Vec<u64>> {
        self.0.row_group_row_counts()
    }

    fn open_row_group(&self, index: usize) -> Result<Box<dyn RowGroupCursor + '_>> {
        self.0.open_row_group(index)
    }

    fn release(&self) -> Result<()> {
        self.0.release()
    }
}

impl<S: ColumnarSource> Drop for ReleaseOnDrop<S> {
    fn drop(&mut self) {
        let what = self.0.path().map_or_else(
            || "decoder handle".to_string(),
            |p| format!("decoder handle on {}", p.display()),
        );
        swallow_cleanup_error(&what, self.0.release());
    }
}
