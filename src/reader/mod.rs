//! Window reader over a single columnar file.
//!
//! A [`WindowReader`] opens one decoder handle per degree of parallelism plus
//! one dedicated to counting rows, and reuses them for every window it
//! materializes.

pub mod assemble;
pub mod materialize;
pub mod row_count;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::OnceCell;

use crate::config::ReaderConfig;
use crate::decoder::{ColumnarSource, ParquetSource, ReleaseOnDrop};
use crate::error::{ParWindowError, Result};
use crate::schema::Schema;
use crate::table::Table;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};
use crate::window::Window;

pub use self::assemble::{HandleLease, SourceHandle, assemble, assemble_blocking};
pub use self::row_count::count_rows_async;

/// Stop flag shared by the tasks of one assembly
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the signal has been raised
    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(ParWindowError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Materializes row windows of one file into tables
pub struct WindowReader {
    path: Option<PathBuf>,
    config: ReaderConfig,
    handles: Vec<SourceHandle>,
    counter: SourceHandle,
    row_count: Arc<OnceCell<u64>>,
}

impl WindowReader {
    /// Open `config.degree_of_parallelism` handles on a Parquet file plus one
    /// for counting rows
    ///
    /// When called inside a tokio runtime the row count starts in the
    /// background right away.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a zero degree of parallelism, `NotFound` if
    /// the file does not exist, or the error of opening any handle.
    pub fn open(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;
        log_operation_start("Opening window reader on", path);

        let handles = (0..config.degree_of_parallelism)
            .map(|_| ParquetSource::open(path, &config).map(handle))
            .collect::<Result<Vec<_>>>()?;
        let counter = handle(ParquetSource::open(path, &config)?);

        let reader = Self {
            path: Some(path.to_path_buf()),
            config,
            handles,
            counter,
            row_count: Arc::new(OnceCell::new()),
        };
        reader.prefetch_row_count();
        Ok(reader)
    }

    /// Build a reader over already opened sources
    ///
    /// `handles` are used for assembly and `counter` only for counting rows.
    /// Every source is released once the reader and all its tasks are done.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `handles` is empty.
    pub fn from_sources<S>(handles: Vec<S>, counter: S, config: ReaderConfig) -> Result<Self>
    where
        S: ColumnarSource + 'static,
    {
        let config = ReaderConfig {
            degree_of_parallelism: handles.len(),
            ..config
        };
        config.validate()?;

        Ok(Self {
            path: counter.path().map(Path::to_path_buf),
            config,
            handles: handles.into_iter().map(handle).collect(),
            counter: handle(counter),
            row_count: Arc::new(OnceCell::new()),
        })
    }

    fn prefetch_row_count(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let cell = Arc::clone(&self.row_count);
        let counter = self.counter.clone();
        runtime.spawn(async move {
            if let Err(e) = cell.get_or_try_init(|| count_rows_async(counter)).await {
                log_warning(&format!("Background row count failed: {e}"), None);
            }
        });
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        self.counter.source().schema()
    }

    #[must_use]
    pub const fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Total rows in the file; computed once and cached
    pub async fn row_count(&self) -> Result<u64> {
        let counter = self.counter.clone();
        self.row_count
            .get_or_try_init(|| count_rows_async(counter))
            .await
            .copied()
    }

    /// Materialize rows `[offset, offset + count)` of the selected fields
    ///
    /// Field names match case-insensitively; the table uses the schema's
    /// spelling. A window starting past the end yields a table with the
    /// selected columns and no rows.
    ///
    /// # Errors
    /// `UnknownField` before any row group is read, `DecodeInconsistency` if
    /// the decoder contradicts its metadata, or any I/O or decoding error.
    pub async fn materialize_window<S: AsRef<str>>(
        &mut self,
        fields: &[S],
        offset: u64,
        count: u64,
    ) -> Result<Table> {
        let start = Instant::now();
        let table = assemble(&self.handles, fields, Window::new(offset, count), &self.config)
            .await
            .map_err(|e| self.annotate(e))?;
        self.log_complete(&table, start);
        Ok(table)
    }

    /// Blocking variant of [`Self::materialize_window`] running on rayon
    ///
    /// # Errors
    /// Same as [`Self::materialize_window`].
    pub fn materialize_window_blocking<S: AsRef<str>>(
        &mut self,
        fields: &[S],
        offset: u64,
        count: u64,
    ) -> Result<Table> {
        let start = Instant::now();
        let window = Window::new(offset, count);
        let table = assemble_blocking(&self.handles, fields, window, &self.config)
            .map_err(|e| self.annotate(e))?;
        self.log_complete(&table, start);
        Ok(table)
    }

    fn annotate(&self, error: ParWindowError) -> ParWindowError {
        match &self.path {
            Some(path) => error.with_path(path),
            None => error,
        }
    }

    fn log_complete(&self, table: &Table, start: Instant) {
        if let Some(path) = &self.path {
            log_operation_complete("materialized", path, table.row_count(), Some(start.elapsed()));
        }
    }
}

fn handle<S: ColumnarSource + 'static>(source: S) -> SourceHandle {
    SourceHandle::new(Arc::new(ReleaseOnDrop::new(source)))
}

/// Materialize one window of a Parquet file
///
/// Opens `degree_of_parallelism` handles, reads the window and releases them.
///
/// # Errors
/// See [`WindowReader::open`] and [`WindowReader::materialize_window`].
pub async fn materialize_window<S: AsRef<str>>(
    path: impl AsRef<Path>,
    degree_of_parallelism: usize,
    fields: &[S],
    offset: u64,
    count: u64,
) -> Result<Table> {
    let config = ReaderConfig::with_parallelism(degree_of_parallelism);
    let mut reader = WindowReader::open(path, config)?;
    reader.materialize_window(fields, offset, count).await
}

/// Count the rows of a Parquet file
///
/// # Errors
/// See [`WindowReader::open`].
pub async fn count_rows(path: impl AsRef<Path>, degree_of_parallelism: usize) -> Result<u64> {
    let config = ReaderConfig::with_parallelism(degree_of_parallelism);
    let reader = WindowReader::open(path, config)?;
    reader.row_count().await
}
