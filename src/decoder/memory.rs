//! In-memory columnar source.
//!
//! Holds row groups as plain value vectors and counts every interaction, so
//! callers can check how many row groups were opened, closed and released and
//! how many values were pulled. Failures on close and release and slow reads
//! can be injected.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rustc_hash::FxHashMap;

use super::{ColumnValues, ColumnarSource, RowGroupCursor};
use crate::error::{ParWindowError, Result};
use crate::schema::{Field, NativeValue, Schema};

/// Interaction counters shared by a source and its clones
#[derive(Debug, Default)]
pub struct SourceStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    released: AtomicUsize,
    values_read: AtomicUsize,
    open_now: AtomicUsize,
    peak_open: AtomicUsize,
}

impl SourceStats {
    /// Row-group cursors opened
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Row-group cursors closed
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Calls to `release`
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Column values handed out
    #[must_use]
    pub fn values_read(&self) -> usize {
        self.values_read.load(Ordering::SeqCst)
    }

    /// Most cursors that were open at the same time
    #[must_use]
    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    fn cursor_opened(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let open = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(open, Ordering::SeqCst);
    }

    fn cursor_closed(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
struct MemoryRowGroup {
    row_count: u64,
    columns: FxHashMap<String, Arc<Vec<NativeValue>>>,
}

/// A columnar source backed by vectors of values
///
/// Cloning yields another handle on the same data with the same counters.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    schema: Schema,
    row_groups: Vec<MemoryRowGroup>,
    stats: Arc<SourceStats>,
    fail_close: bool,
    fail_release: bool,
    read_delay: Option<Duration>,
}

impl InMemorySource {
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            row_groups: Vec::new(),
            stats: Arc::new(SourceStats::default()),
            fail_close: false,
            fail_release: false,
            read_delay: None,
        }
    }

    /// Append a row group with the declared `row_count`
    ///
    /// Columns are matched to schema fields ignoring case. A column may hold
    /// fewer values than `row_count` to simulate a truncated decode.
    #[must_use]
    pub fn with_row_group<N: Into<String>>(
        mut self,
        row_count: u64,
        columns: impl IntoIterator<Item = (N, Vec<NativeValue>)>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, values)| (name.into().to_lowercase(), Arc::new(values)))
            .collect();
        self.row_groups.push(MemoryRowGroup { row_count, columns });
        self
    }

    /// Make every cursor close report an error
    #[must_use]
    pub const fn fail_on_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Make `release` report an error
    #[must_use]
    pub const fn fail_on_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Sleep for `delay` before handing out each value
    #[must_use]
    pub const fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<SourceStats> {
        Arc::clone(&self.stats)
    }
}

impl ColumnarSource for InMemorySource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    fn row_group_row_counts(&self) -> Result<Vec<u64>> {
        Ok(self.row_groups.iter().map(|rg| rg.row_count).collect())
    }

    fn open_row_group(&self, index: usize) -> Result<Box<dyn RowGroupCursor + '_>> {
        let row_group = self.row_groups.get(index).ok_or_else(|| {
            ParWindowError::inconsistency(format!(
                "row group {index} requested but the source has {}",
                self.row_groups.len()
            ))
        })?;
        self.stats.cursor_opened();

        Ok(Box::new(MemoryCursor {
            index,
            row_group,
            stats: &self.stats,
            fail_close: self.fail_close,
            read_delay: self.read_delay,
        }))
    }

    fn release(&self) -> Result<()> {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(ParWindowError::Io(std::io::Error::other(
                "in-memory source refused to release",
            )));
        }
        Ok(())
    }
}

struct MemoryCursor<'a> {
    index: usize,
    row_group: &'a MemoryRowGroup,
    stats: &'a SourceStats,
    fail_close: bool,
    read_delay: Option<Duration>,
}

impl RowGroupCursor for MemoryCursor<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn row_count(&self) -> u64 {
        self.row_group.row_count
    }

    fn read_column(&mut self, field: &Field) -> Result<ColumnValues<'_>> {
        let values = self
            .row_group
            .columns
            .get(&field.name().to_lowercase())
            .ok_or_else(|| ParWindowError::UnknownField {
                field: field.name().to_string(),
                path: None,
            })?;
        let stats = self.stats;
        let delay = self.read_delay;

        Ok(Box::new(values.iter().map(move |value| {
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            stats.values_read.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        })))
    }

    fn close(&mut self) -> Result<()> {
        self.stats.cursor_closed();
        if self.fail_close {
            return Err(ParWindowError::Io(std::io::Error::other(format!(
                "row group {} could not be closed",
                self.index
            ))));
        }
        Ok(())
    }
}
