use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Decimal128Array, Int16Array, Int64Array, StringArray,
    TimestampMillisecondArray, UInt8Array,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

/// Rows in the sample file
pub const SAMPLE_ROWS: usize = 150;

/// Maximum rows per row group in the sample file, giving groups of 100 and 50
pub const SAMPLE_ROW_GROUP_SIZE: usize = 100;

/// 2023-12-31T22:00:00Z, which is midnight at +02:00
const FIRST_STAMP_MILLIS: i64 = 1_704_060_000_000;

/// A Parquet file in the temp directory, deleted on drop
pub struct Fixture {
    path: PathBuf,
}

impl Fixture {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Write `batch` to a fresh temp file
pub fn write_fixture(name: &str, batch: &RecordBatch, max_row_group_size: usize) -> Fixture {
    let path = std::env::temp_dir().join(format!(
        "par_window_{name}_{}.parquet",
        rand::random::<u64>()
    ));
    let props = WriterProperties::builder()
        .set_max_row_group_size(max_row_group_size)
        .build();

    let file = File::create(&path).expect("create fixture file");
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).expect("create arrow writer");
    writer.write(batch).expect("write fixture batch");
    writer.close().expect("close arrow writer");

    Fixture { path }
}

/// Sample batch with one column per interesting type
///
/// Row `i` holds: `Id = i`, `Name = "name-i"` (null when `i % 7 == 0`),
/// `Small = i % 100` as Int16, `Tiny = i % 256` as UInt8, `Flag = i is even`,
/// `Stamp` = midnight 2024-01-01 at +02:00 plus `i` hours, `Price = i.25`,
/// `Day` = 2024-01-01 plus `i` days.
#[must_use]
pub fn sample_batch() -> RecordBatch {
    let rows = 0..SAMPLE_ROWS as i64;

    let columns: Vec<(&str, ArrayRef)> = vec![
        ("Id", Arc::new(Int64Array::from_iter_values(rows.clone()))),
        (
            "Name",
            Arc::new(StringArray::from_iter(
                rows.clone()
                    .map(|i| (i % 7 != 0).then(|| format!("name-{i}"))),
            )),
        ),
        (
            "Small",
            Arc::new(Int16Array::from_iter_values(
                rows.clone().map(|i| i16::try_from(i % 100).unwrap()),
            )),
        ),
        (
            "Tiny",
            Arc::new(UInt8Array::from_iter_values(
                rows.clone().map(|i| u8::try_from(i % 256).unwrap()),
            )),
        ),
        (
            "Flag",
            Arc::new(BooleanArray::from_iter(rows.clone().map(|i| Some(i % 2 == 0)))),
        ),
        (
            "Stamp",
            Arc::new(
                TimestampMillisecondArray::from_iter_values(
                    rows.clone().map(|i| FIRST_STAMP_MILLIS + i * 3_600_000),
                )
                .with_timezone("+02:00"),
            ),
        ),
        (
            "Price",
            Arc::new(
                Decimal128Array::from_iter_values(rows.clone().map(|i| i128::from(i) * 100 + 25))
                    .with_precision_and_scale(10, 2)
                    .unwrap(),
            ),
        ),
        (
            "Day",
            // 19723 days after the epoch is 2024-01-01
            Arc::new(Date32Array::from_iter_values(
                rows.map(|i| 19_723 + i32::try_from(i).unwrap()),
            )),
        ),
    ];

    RecordBatch::try_from_iter(columns).expect("build sample batch")
}

/// The sample batch written with row groups of 100 and 50 rows
#[must_use]
pub fn sample_file() -> Fixture {
    write_fixture("sample", &sample_batch(), SAMPLE_ROW_GROUP_SIZE)
}

/// A file with the sample schema and no rows
#[must_use]
pub fn empty_file() -> Fixture {
    let batch = sample_batch().slice(0, 0);
    write_fixture("empty", &batch, SAMPLE_ROW_GROUP_SIZE)
}

/// Names of every column of the sample file
#[must_use]
pub fn sample_fields() -> Vec<String> {
    sample_batch()
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}
