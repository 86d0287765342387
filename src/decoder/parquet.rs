//! Parquet decoder built on the arrow reader of the `parquet` crate.
//!
//! File metadata is loaded once per handle. Each column read builds a
//! projected record batch reader restricted to one row group and converts
//! batches into [`NativeValue`]s as they are pulled.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::vec;

use arrow::array::timezone::Tz;
use arrow::array::{Array, ArrayRef, ArrowPrimitiveType, AsArray, PrimitiveArray};
use arrow::datatypes::{
    ArrowTimestampType, DataType, Date32Type, Date64Type, Decimal128Type, Float16Type,
    Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, Time32MillisecondType,
    Time32SecondType, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, Offset, TimeZone};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReader,
    ParquetRecordBatchReaderBuilder,
};

use super::{ColumnValues, ColumnarSource, RowGroupCursor};
use crate::config::ReaderConfig;
use crate::error::util::open_source_file;
use crate::error::{ParWindowError, Result};
use crate::schema::{Decimal, Field, NativeType, NativeValue, Schema};

/// One open handle on a Parquet file
pub struct ParquetSource {
    path: PathBuf,
    file: File,
    metadata: ArrowReaderMetadata,
    schema: Schema,
    batch_size: usize,
}

impl ParquetSource {
    /// Open `path` and load its footer metadata
    ///
    /// # Errors
    /// `NotFound` if the file does not exist; a Parquet error if the footer
    /// cannot be read; `DecodeInconsistency` if two top-level columns differ
    /// only by case.
    pub fn open(path: &Path, config: &ReaderConfig) -> Result<Self> {
        let file = open_source_file(path)?;
        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::default())
            .map_err(|e| ParWindowError::from(e).with_path(path))?;
        let schema = schema_from_arrow(metadata.schema().fields())
            .map_err(|e| e.with_path(path))?;

        log::debug!(
            "Opened {} with {} row groups and {} columns",
            path.display(),
            metadata.metadata().num_row_groups(),
            schema.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            metadata,
            schema,
            batch_size: config.batch_size,
        })
    }

    fn column_reader(&self, row_group: usize, field: &Field) -> Result<ParquetRecordBatchReader> {
        let root = self
            .metadata
            .schema()
            .index_of(field.name())
            .map_err(|_| ParWindowError::UnknownField {
                field: field.name().to_string(),
                path: Some(self.path.clone()),
            })?;
        let mask = ProjectionMask::roots(self.metadata.parquet_schema(), [root]);

        let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(
            self.file.try_clone()?,
            self.metadata.clone(),
        )
        .with_row_groups(vec![row_group])
        .with_projection(mask)
        .with_batch_size(self.batch_size)
        .build()?;

        Ok(reader)
    }
}

impl fmt::Debug for ParquetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParquetSource")
            .field("path", &self.path)
            .field("row_groups", &self.row_group_count())
            .field("fields", &self.schema.field_names())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl ColumnarSource for ParquetSource {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_group_count(&self) -> usize {
        self.metadata.metadata().num_row_groups()
    }

    fn row_group_row_counts(&self) -> Result<Vec<u64>> {
        self.metadata
            .metadata()
            .row_groups()
            .iter()
            .enumerate()
            .map(|(index, rg)| row_count_of(index, rg.num_rows()))
            .collect()
    }

    fn open_row_group(&self, index: usize) -> Result<Box<dyn RowGroupCursor + '_>> {
        let row_group = self.metadata.metadata().row_groups().get(index).ok_or_else(|| {
            ParWindowError::inconsistency(format!(
                "row group {index} requested but {} has {}",
                self.path.display(),
                self.row_group_count()
            ))
        })?;
        let row_count = row_count_of(index, row_group.num_rows())?;

        Ok(Box::new(ParquetCursor {
            source: self,
            index,
            row_count,
        }))
    }
}

fn row_count_of(index: usize, num_rows: i64) -> Result<u64> {
    u64::try_from(num_rows).map_err(|_| {
        ParWindowError::inconsistency(format!(
            "row group {index} reports a negative row count ({num_rows})"
        ))
    })
}

struct ParquetCursor<'a> {
    source: &'a ParquetSource,
    index: usize,
    row_count: u64,
}

impl RowGroupCursor for ParquetCursor<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn read_column(&mut self, field: &Field) -> Result<ColumnValues<'_>> {
        let batches = self.source.column_reader(self.index, field)?;
        Ok(Box::new(ColumnValueIter {
            batches,
            pending: Vec::new().into_iter(),
        }))
    }
}

/// Values of a single projected column, decoded one batch at a time
struct ColumnValueIter {
    batches: ParquetRecordBatchReader,
    pending: vec::IntoIter<NativeValue>,
}

impl Iterator for ColumnValueIter {
    type Item = Result<NativeValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.pending.next() {
                return Some(Ok(value));
            }
            match self.batches.next()? {
                Ok(batch) => match batch_values(&batch) {
                    Ok(values) => self.pending = values.into_iter(),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

fn batch_values(batch: &RecordBatch) -> Result<Vec<NativeValue>> {
    if batch.num_columns() != 1 {
        return Err(ParWindowError::inconsistency(format!(
            "projected batch has {} columns instead of 1",
            batch.num_columns()
        )));
    }
    native_values(batch.column(0))
}

/// Build a [`Schema`] from the top-level fields of an arrow schema
pub fn schema_from_arrow(fields: &arrow::datatypes::Fields) -> Result<Schema> {
    Schema::new(
        fields
            .iter()
            .map(|f| Field::new(f.name().clone(), native_type_of(f.data_type())))
            .collect(),
    )
}

/// Native type tag of an arrow data type
#[must_use]
pub fn native_type_of(data_type: &DataType) -> NativeType {
    match data_type {
        DataType::Boolean => NativeType::Boolean,
        DataType::Int8 => NativeType::Int8,
        DataType::UInt8 => NativeType::UInt8,
        DataType::Int16 => NativeType::Int16,
        DataType::UInt16 => NativeType::UInt16,
        DataType::Int32 => NativeType::Int32,
        DataType::UInt32 => NativeType::UInt32,
        DataType::Int64 => NativeType::Int64,
        DataType::UInt64 => NativeType::UInt64,
        DataType::Float16 => NativeType::Float16,
        DataType::Float32 => NativeType::Float32,
        DataType::Float64 => NativeType::Float64,
        DataType::Decimal128(_, _) => NativeType::Decimal,
        DataType::Date32 | DataType::Date64 => NativeType::Date,
        DataType::Time32(_) | DataType::Time64(_) => NativeType::Time,
        DataType::Timestamp(_, None) => NativeType::Timestamp,
        DataType::Timestamp(_, Some(_)) => NativeType::TimestampWithOffset,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => NativeType::String,
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => NativeType::ByteArray,
        DataType::Dictionary(_, value_type) => native_type_of(value_type),
        _ => NativeType::Other,
    }
}

/// Convert every slot of an arrow array, mapping nulls to `NativeValue::Null`
///
/// The variant produced for non-null slots always matches
/// [`native_type_of`] for the array's data type.
pub fn native_values(array: &ArrayRef) -> Result<Vec<NativeValue>> {
    let array = array.as_ref();
    match array.data_type() {
        DataType::Boolean => {
            let typed = array.as_boolean();
            Ok(typed
                .iter()
                .map(|v| v.map_or(NativeValue::Null, NativeValue::Boolean))
                .collect())
        }
        DataType::Int8 => primitive::<Int8Type>(array, NativeValue::Int8),
        DataType::UInt8 => primitive::<UInt8Type>(array, NativeValue::UInt8),
        DataType::Int16 => primitive::<Int16Type>(array, NativeValue::Int16),
        DataType::UInt16 => primitive::<UInt16Type>(array, NativeValue::UInt16),
        DataType::Int32 => primitive::<Int32Type>(array, NativeValue::Int32),
        DataType::UInt32 => primitive::<UInt32Type>(array, NativeValue::UInt32),
        DataType::Int64 => primitive::<Int64Type>(array, NativeValue::Int64),
        DataType::UInt64 => primitive::<UInt64Type>(array, NativeValue::UInt64),
        DataType::Float16 => {
            primitive::<Float16Type>(array, |v| NativeValue::Float16(v.to_f32()))
        }
        DataType::Float32 => primitive::<Float32Type>(array, NativeValue::Float32),
        DataType::Float64 => primitive::<Float64Type>(array, NativeValue::Float64),
        DataType::Decimal128(_, scale) => {
            let scale = *scale;
            primitive::<Decimal128Type>(array, |v| NativeValue::Decimal(Decimal::new(v, scale)))
        }
        DataType::Date32 => {
            temporal::<Date32Type, _>(array, |a, i| a.value_as_date(i), NativeValue::Date)
        }
        DataType::Date64 => {
            temporal::<Date64Type, _>(array, |a, i| a.value_as_date(i), NativeValue::Date)
        }
        DataType::Time32(TimeUnit::Second) => {
            temporal::<Time32SecondType, _>(array, |a, i| a.value_as_time(i), NativeValue::Time)
        }
        DataType::Time32(_) => temporal::<Time32MillisecondType, _>(
            array,
            |a, i| a.value_as_time(i),
            NativeValue::Time,
        ),
        DataType::Time64(TimeUnit::Microsecond) => temporal::<Time64MicrosecondType, _>(
            array,
            |a, i| a.value_as_time(i),
            NativeValue::Time,
        ),
        DataType::Time64(_) => temporal::<Time64NanosecondType, _>(
            array,
            |a, i| a.value_as_time(i),
            NativeValue::Time,
        ),
        DataType::Timestamp(unit, tz) => {
            let tz = tz.as_deref();
            match unit {
                TimeUnit::Second => timestamps::<TimestampSecondType>(array, tz),
                TimeUnit::Millisecond => timestamps::<TimestampMillisecondType>(array, tz),
                TimeUnit::Microsecond => timestamps::<TimestampMicrosecondType>(array, tz),
                TimeUnit::Nanosecond => timestamps::<TimestampNanosecondType>(array, tz),
            }
        }
        DataType::Utf8 => Ok(strings(array.as_string::<i32>().iter())),
        DataType::LargeUtf8 => Ok(strings(array.as_string::<i64>().iter())),
        DataType::Utf8View => Ok(strings(array.as_string_view().iter())),
        DataType::Binary => Ok(bytes(array.as_binary::<i32>().iter())),
        DataType::LargeBinary => Ok(bytes(array.as_binary::<i64>().iter())),
        DataType::BinaryView => Ok(bytes(array.as_binary_view().iter())),
        DataType::FixedSizeBinary(_) => Ok(bytes(array.as_fixed_size_binary().iter())),
        DataType::Dictionary(_, value_type) => {
            let unpacked = arrow::compute::cast(array, value_type)?;
            native_values(&unpacked)
        }
        _ => formatted(array),
    }
}

fn primitive<T: ArrowPrimitiveType>(
    array: &dyn Array,
    wrap: impl Fn(T::Native) -> NativeValue,
) -> Result<Vec<NativeValue>> {
    let typed = array
        .as_primitive_opt::<T>()
        .ok_or_else(|| unexpected_array(array))?;
    Ok(typed
        .iter()
        .map(|v| v.map_or(NativeValue::Null, &wrap))
        .collect())
}

fn temporal<T: ArrowPrimitiveType, V>(
    array: &dyn Array,
    convert: impl Fn(&PrimitiveArray<T>, usize) -> Option<V>,
    wrap: impl Fn(V) -> NativeValue,
) -> Result<Vec<NativeValue>> {
    let typed = array
        .as_primitive_opt::<T>()
        .ok_or_else(|| unexpected_array(array))?;
    (0..typed.len())
        .map(|i| {
            if typed.is_null(i) {
                return Ok(NativeValue::Null);
            }
            convert(typed, i)
                .map(&wrap)
                .ok_or_else(|| out_of_range(typed.data_type(), i))
        })
        .collect()
}

fn timestamps<T: ArrowTimestampType>(
    array: &dyn Array,
    tz: Option<&str>,
) -> Result<Vec<NativeValue>> {
    let Some(tz) = tz else {
        return temporal::<T, _>(array, |a, i| a.value_as_datetime(i), NativeValue::Timestamp);
    };

    // Stored values are UTC instants; the zone supplies the offset to show
    let tz: Tz = tz.parse()?;
    temporal::<T, _>(
        array,
        |a, i| a.value_as_datetime(i),
        |utc| {
            let offset = tz.offset_from_utc_datetime(&utc).fix();
            NativeValue::TimestampWithOffset(DateTime::from_naive_utc_and_offset(utc, offset))
        },
    )
}

fn strings<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<NativeValue> {
    values
        .map(|v| v.map_or(NativeValue::Null, |s| NativeValue::String(s.to_string())))
        .collect()
}

fn bytes<'a>(values: impl Iterator<Item = Option<&'a [u8]>>) -> Vec<NativeValue> {
    values
        .map(|v| v.map_or(NativeValue::Null, |b| NativeValue::Bytes(b.to_vec())))
        .collect()
}

/// Display text for kinds without a structural host type
fn formatted(array: &dyn Array) -> Result<Vec<NativeValue>> {
    let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())?;
    Ok((0..array.len())
        .map(|i| {
            if array.is_null(i) {
                NativeValue::Null
            } else {
                NativeValue::Other(formatter.value(i).to_string())
            }
        })
        .collect())
}

fn unexpected_array(array: &dyn Array) -> ParWindowError {
    ParWindowError::inconsistency(format!(
        "array does not match its declared type {}",
        array.data_type()
    ))
}

fn out_of_range(data_type: &DataType, position: usize) -> ParWindowError {
    ParWindowError::inconsistency(format!(
        "value at position {position} is out of range for {data_type}"
    ))
}
