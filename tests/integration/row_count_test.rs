use par_window::{ParWindowError, ReaderConfig, WindowReader, count_rows};

use crate::utils::{SAMPLE_ROWS, empty_file, sample_file};

#[tokio::test]
async fn test_count_rows_over_row_groups() -> par_window::Result<()> {
    let fixture = sample_file();
    assert_eq!(count_rows(fixture.path(), 2).await?, SAMPLE_ROWS as u64);
    Ok(())
}

#[tokio::test]
async fn test_count_rows_empty_file() -> par_window::Result<()> {
    let fixture = empty_file();
    assert_eq!(count_rows(fixture.path(), 1).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_count_rows_missing_file() {
    let result = count_rows("/no/such/dir/missing.parquet", 1).await;
    assert!(matches!(result, Err(ParWindowError::NotFound { .. })));
}

#[tokio::test]
async fn test_row_count_is_cached_and_overlaps_assembly() -> par_window::Result<()> {
    let fixture = sample_file();
    let mut reader = WindowReader::open(fixture.path(), ReaderConfig::with_parallelism(2))?;

    let table = reader.materialize_window(&["Id"], 0, 10).await?;
    assert_eq!(table.row_count(), 10);

    let first = reader.row_count().await?;
    let second = reader.row_count().await?;
    assert_eq!(first, SAMPLE_ROWS as u64);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_reader_opens_outside_runtime() -> par_window::Result<()> {
    let fixture = sample_file();
    let mut reader = WindowReader::open(fixture.path(), ReaderConfig::with_parallelism(2))?;
    let table = reader.materialize_window_blocking(&["Id", "Flag"], 140, 20)?;
    assert_eq!(table.row_count(), 10);
    Ok(())
}
