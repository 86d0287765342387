//! A Rust library for materializing row windows of Parquet files into
//! tables, decoding disjoint field subsets in parallel.

pub mod config;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod schema;
pub mod table;
pub mod utils;
pub mod window;

// Core types
pub use config::{ColumnOrder, DEFAULT_BATCH_SIZE, ReaderConfig};
pub use error::{ParWindowError, Result};
pub use reader::{CancelSignal, WindowReader, count_rows, materialize_window};
pub use schema::{Field, HostType, HostValue, NativeType, NativeValue, Schema};
pub use table::{Column, Table};
pub use window::{RowGroupSlice, Window};

// Decoders
pub use decoder::{ColumnarSource, InMemorySource, ParquetSource, RowGroupCursor};
