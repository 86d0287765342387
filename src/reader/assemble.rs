//! Parallel assembly of a window from field subsets.
//!
//! The selection is split into contiguous field subsets, one per handle. Each
//! subset is materialized on its own handle over every row group the window
//! touches, and the partial tables are merged side by side.

use std::ops::Deref;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use rayon::prelude::*;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{ColumnOrder, ReaderConfig};
use crate::decoder::{ColumnarSource, ScopedCursor};
use crate::error::{ParWindowError, Result};
use crate::reader::CancelSignal;
use crate::reader::materialize::materialize;
use crate::schema::Field;
use crate::table::{Table, merge_by_index};
use crate::utils::logging::Benchmark;
use crate::window::{RowGroupSlice, Window, locate, partition};

/// Decoder handle shared with the tasks that read from it
///
/// At most one task reads through a handle at a time. A task holds the
/// handle's [`HandleLease`] until it finishes, even when the call that spawned
/// it has been dropped, so a later call waits for it instead of overlapping.
#[derive(Clone)]
pub struct SourceHandle {
    source: Arc<dyn ColumnarSource>,
    lease: Arc<Mutex<()>>,
}

impl SourceHandle {
    #[must_use]
    pub fn new(source: Arc<dyn ColumnarSource>) -> Self {
        Self {
            source,
            lease: Arc::new(Mutex::new(())),
        }
    }

    /// The source, for metadata only; decoding goes through a lease
    #[must_use]
    pub fn source(&self) -> &dyn ColumnarSource {
        self.source.as_ref()
    }

    /// Wait until no other task reads through this handle
    pub async fn lease(&self) -> HandleLease {
        HandleLease {
            source: Arc::clone(&self.source),
            _guard: Arc::clone(&self.lease).lock_owned().await,
        }
    }

    /// Blocking form of [`Self::lease`]
    ///
    /// Must be called outside of an async context, e.g. on a rayon worker.
    #[must_use]
    pub fn blocking_lease(&self) -> HandleLease {
        HandleLease {
            source: Arc::clone(&self.source),
            _guard: Arc::clone(&self.lease).blocking_lock_owned(),
        }
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("path", &self.source.path())
            .field("busy", &self.lease.try_lock().is_err())
            .finish()
    }
}

/// Exclusive use of a [`SourceHandle`], given up on drop
pub struct HandleLease {
    source: Arc<dyn ColumnarSource>,
    _guard: OwnedMutexGuard<()>,
}

impl Deref for HandleLease {
    type Target = dyn ColumnarSource;

    fn deref(&self) -> &Self::Target {
        self.source.as_ref()
    }
}

/// What every task needs to know before decoding starts
struct Plan {
    fields: Vec<Field>,
    subsets: Vec<Vec<Field>>,
    slices: Arc<[RowGroupSlice]>,
}

impl Plan {
    fn new<S: AsRef<str>>(
        handles: &[SourceHandle],
        selection: &[S],
        window: Window,
    ) -> Result<Self> {
        let Some(first) = handles.first().map(SourceHandle::source) else {
            return Err(ParWindowError::invalid_config(
                "at least one decoder handle is required",
            ));
        };

        let fields = first.schema().resolve(selection).map_err(|e| match first.path() {
            Some(path) => e.with_path(path),
            None => e,
        })?;
        let slices = locate(&first.row_group_row_counts()?, window);
        let subsets = partition(&fields, handles.len());

        log::debug!(
            "Window {}..{} covers {} row groups, {} fields in {} subsets",
            window.offset,
            window.offset.saturating_add(window.count),
            slices.len(),
            fields.len(),
            subsets.len()
        );

        Ok(Self {
            fields,
            subsets,
            slices: slices.into_iter().collect(),
        })
    }

    fn finish(&self, mut table: Table, column_order: ColumnOrder) -> Result<Table> {
        if column_order == ColumnOrder::Selection {
            let names: Vec<&str> = self.fields.iter().map(Field::name).collect();
            table.reorder_columns(&names)?;
        }
        Ok(table)
    }
}

/// Materialize one field subset over all row-group slices on one handle
///
/// Raises `cancel` when it fails so sibling subsets can stop early.
pub fn materialize_subset(
    handle: &dyn ColumnarSource,
    fields: &[Field],
    slices: &[RowGroupSlice],
    verify_row_counts: bool,
    cancel: &CancelSignal,
) -> Result<Table> {
    let result = materialize_slices(handle, fields, slices, verify_row_counts, cancel);
    if result.is_err() {
        cancel.raise();
    }
    result
}

fn materialize_slices(
    handle: &dyn ColumnarSource,
    fields: &[Field],
    slices: &[RowGroupSlice],
    verify_row_counts: bool,
    cancel: &CancelSignal,
) -> Result<Table> {
    let mut table = Table::for_fields(fields);
    if fields.is_empty() {
        return Ok(table);
    }

    let expected_rows = if verify_row_counts {
        handle.row_group_row_counts()?
    } else {
        Vec::new()
    };

    for slice in slices {
        cancel.check()?;

        let mut cursor = ScopedCursor::open(handle, slice.index)?;
        if let Some(&expected) = expected_rows.get(slice.index) {
            if cursor.row_count() != expected {
                return Err(ParWindowError::inconsistency(format!(
                    "row group {} has {} rows but metadata reports {expected}",
                    slice.index,
                    cursor.row_count()
                )));
            }
        }

        materialize(&mut *cursor, fields, slice.skip, slice.take, &mut table, cancel)?;
    }

    Ok(table)
}

/// Running merge of partial tables that remembers the most relevant error
#[derive(Default)]
struct Merger {
    table: Table,
    error: Option<ParWindowError>,
}

impl Merger {
    fn accept(&mut self, outcome: Result<Table>, cancel: &CancelSignal) {
        match outcome {
            Ok(partial) if self.error.is_none() => {
                match merge_by_index(std::mem::take(&mut self.table), partial) {
                    Ok(merged) => self.table = merged,
                    Err(e) => self.fail(e, cancel),
                }
            }
            Ok(_) => {}
            Err(e) => self.fail(e, cancel),
        }
    }

    /// A real failure always wins over a cancellation it caused
    fn fail(&mut self, error: ParWindowError, cancel: &CancelSignal) {
        cancel.raise();
        let replace = match &self.error {
            None => true,
            Some(current) => current.is_cancelled() && !error.is_cancelled(),
        };
        if replace {
            self.error = Some(error);
        }
    }

    fn into_result(self) -> Result<Table> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.table),
        }
    }
}

/// Raises the signal if the assembling future is dropped before it finishes
struct CancelOnDrop(CancelSignal);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.raise();
    }
}

/// Assemble a window on the blocking thread pool, merging in completion order
///
/// `handles` must all be open on the same file; at most one subset runs per
/// handle. Column names are the schema's spelling of the requested fields.
///
/// # Errors
/// `UnknownField` before any row group is opened; otherwise the first
/// decoding or merge error of any subset.
pub async fn assemble<S: AsRef<str>>(
    handles: &[SourceHandle],
    selection: &[S],
    window: Window,
    config: &ReaderConfig,
) -> Result<Table> {
    let _benchmark = Benchmark::new("assemble window");
    let plan = Plan::new(handles, selection, window)?;
    let cancel = CancelSignal::new();
    let _guard = CancelOnDrop(cancel.clone());

    let mut tasks = FuturesUnordered::new();
    for (subset, handle) in plan.subsets.iter().zip(handles) {
        let lease = handle.lease().await;
        let subset = subset.clone();
        let slices = Arc::clone(&plan.slices);
        let cancel = cancel.clone();
        let verify = config.verify_row_counts;
        tasks.push(tokio::task::spawn_blocking(move || {
            materialize_subset(&*lease, &subset, &slices, verify, &cancel)
        }));
    }

    let mut merger = Merger::default();
    while let Some(joined) = tasks.next().await {
        let outcome = joined.map_err(|e| ParWindowError::Task(e.to_string())).and_then(|r| r);
        merger.accept(outcome, &cancel);
    }

    plan.finish(merger.into_result()?, config.column_order)
}

/// Assemble a window on the rayon pool, merging in subset order
///
/// # Errors
/// Same as [`assemble`].
pub fn assemble_blocking<S: AsRef<str>>(
    handles: &[SourceHandle],
    selection: &[S],
    window: Window,
    config: &ReaderConfig,
) -> Result<Table> {
    let _benchmark = Benchmark::new("assemble window (blocking)");
    let plan = Plan::new(handles, selection, window)?;
    let cancel = CancelSignal::new();

    let outcomes: Vec<Result<Table>> = plan
        .subsets
        .par_iter()
        .zip(handles.par_iter())
        .map(|(subset, handle)| {
            let lease = handle.blocking_lease();
            materialize_subset(
                &*lease,
                subset,
                &plan.slices,
                config.verify_row_counts,
                &cancel,
            )
        })
        .collect();

    let mut merger = Merger::default();
    for outcome in outcomes {
        merger.accept(outcome, &cancel);
    }

    plan.finish(merger.into_result()?, config.column_order)
}
