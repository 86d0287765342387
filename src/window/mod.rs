//! Row windows and their mapping onto row groups.

pub mod partition;

pub use partition::partition;

use smallvec::SmallVec;

/// Half-open row range `[offset, offset + count)` requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: u64,
    pub count: u64,
}

impl Window {
    #[must_use]
    pub const fn new(offset: u64, count: u64) -> Self {
        Self { offset, count }
    }

    /// Number of rows this window covers in a file of `total_rows` rows
    #[must_use]
    pub const fn realized_len(&self, total_rows: u64) -> u64 {
        let available = total_rows.saturating_sub(self.offset);
        if self.count < available {
            self.count
        } else {
            available
        }
    }
}

/// The part of one row group that falls inside a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowGroupSlice {
    /// Row group index in the file
    pub index: usize,
    /// Rows to discard at the start of the group
    pub skip: u64,
    /// Rows to keep after the skipped ones
    pub take: u64,
}

/// Row groups intersecting a window, in ascending group order
pub type RowGroupSlices = SmallVec<[RowGroupSlice; 4]>;

/// Determine which rows of which row groups make up `window`
///
/// `row_counts[i]` is the number of rows in row group `i`. Groups entirely
/// before the window and empty groups produce nothing; iteration stops as soon
/// as the window is covered.
#[must_use]
pub fn locate(row_counts: &[u64], window: Window) -> RowGroupSlices {
    let mut slices = RowGroupSlices::new();
    let mut remaining = window.count;
    let mut rows_before: u64 = 0;

    for (index, &rows) in row_counts.iter().enumerate() {
        if remaining == 0 {
            break;
        }

        let rows_after = rows_before + rows;
        if rows == 0 || window.offset >= rows_after {
            rows_before = rows_after;
            continue;
        }

        let skip = window.offset.saturating_sub(rows_before);
        let take = (rows_after - window.offset).min(remaining).min(rows);
        remaining -= take;
        slices.push(RowGroupSlice { index, skip, take });

        rows_before = rows_after;
    }

    slices
}
