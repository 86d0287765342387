//! Counting the rows of a file through a dedicated handle.

use crate::decoder::{ColumnarSource, ScopedCursor};
use crate::error::{ParWindowError, Result};
use crate::reader::assemble::SourceHandle;

/// Total rows of the file, summed over every row group
///
/// Each row group is opened on `handle` to read its row count, so the handle
/// must not be used by any other task at the same time.
pub fn count_rows(handle: &dyn ColumnarSource) -> Result<u64> {
    let mut total: u64 = 0;
    for index in 0..handle.row_group_count() {
        let cursor = ScopedCursor::open(handle, index)?;
        total += cursor.row_count();
    }
    log::debug!(
        "Counted {total} rows in {} row groups",
        handle.row_group_count()
    );
    Ok(total)
}

/// [`count_rows`] on the blocking pool, so it can overlap with assembly
///
/// Waits for the handle's lease first; the count keeps it until it is done.
pub async fn count_rows_async(handle: SourceHandle) -> Result<u64> {
    let lease = handle.lease().await;
    tokio::task::spawn_blocking(move || count_rows(&*lease))
        .await
        .map_err(|e| ParWindowError::Task(e.to_string()))?
}
