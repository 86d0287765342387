use chrono::NaiveDate;
use par_window::{
    ColumnOrder, HostType, HostValue, ParWindowError, ReaderConfig, WindowReader,
    materialize_window,
};

use crate::utils::{SAMPLE_ROWS, empty_file, sample_fields, sample_file};

fn midnight(day: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A window spanning the boundary between the 100-row and 50-row groups
#[tokio::test]
async fn test_window_across_row_groups() -> par_window::Result<()> {
    let fixture = sample_file();
    let table = materialize_window(fixture.path(), 2, &["Id", "Name"], 90, 30).await?;

    assert_eq!(table.row_count(), 30);
    assert_eq!(table.column_names(), vec!["Id", "Name"]);
    for (row, id) in (90..120).enumerate() {
        assert_eq!(table.value(row, 0), Some(&HostValue::Int64(id)));
    }
    // 91 = 7 * 13
    assert_eq!(table.value(1, 1), Some(&HostValue::Null));
    assert_eq!(table.value(28, 1), Some(&HostValue::String("name-118".into())));
    Ok(())
}

#[tokio::test]
async fn test_parallelism_does_not_change_output() -> par_window::Result<()> {
    let fixture = sample_file();
    let fields = sample_fields();

    let sequential = materialize_window(fixture.path(), 1, &fields, 37, 100).await?;
    for degree in [2, 3, 4, 16] {
        let parallel = materialize_window(fixture.path(), degree, &fields, 37, 100).await?;
        assert_eq!(sequential, parallel, "degree of parallelism {degree}");
    }
    assert_eq!(sequential.column_names(), fields);

    let full = SAMPLE_ROWS as u64;
    let whole = materialize_window(fixture.path(), 1, &fields, 0, full).await?;
    assert_eq!(whole.row_count(), SAMPLE_ROWS);
    assert_eq!(whole, materialize_window(fixture.path(), 4, &fields, 0, full).await?);
    Ok(())
}

#[tokio::test]
async fn test_blocking_matches_async() -> par_window::Result<()> {
    let fixture = sample_file();
    let fields = sample_fields();
    let mut reader = WindowReader::open(fixture.path(), ReaderConfig::with_parallelism(3))?;

    let async_table = reader.materialize_window(&fields, 10, 120).await?;
    let blocking_table = reader.materialize_window_blocking(&fields, 10, 120)?;
    assert_eq!(async_table, blocking_table);
    Ok(())
}

#[tokio::test]
async fn test_reader_reuses_handles_for_repeated_windows() -> par_window::Result<()> {
    let fixture = sample_file();
    let mut reader = WindowReader::open(fixture.path(), ReaderConfig::with_parallelism(2))?;

    for offset in [0, 50, 99, 100, 149] {
        let table = reader.materialize_window(&["id"], offset, 1).await?;
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.value(0, 0), Some(&HostValue::Int64(offset as i64)));
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let result = materialize_window("/no/such/dir/missing.parquet", 2, &["Id"], 0, 10).await;
    assert!(matches!(result, Err(ParWindowError::NotFound { .. })));
}

#[tokio::test]
async fn test_zero_parallelism_is_invalid() {
    let fixture = sample_file();
    let result = materialize_window(fixture.path(), 0, &["Id"], 0, 10).await;
    assert!(matches!(result, Err(ParWindowError::InvalidConfiguration(_))));

    // Rejected before the file is even looked at
    let result = materialize_window("/no/such/file.parquet", 0, &["Id"], 0, 10).await;
    assert!(matches!(result, Err(ParWindowError::InvalidConfiguration(_))));
}

#[tokio::test]
async fn test_unknown_field_names_field_and_file() {
    let fixture = sample_file();
    let err = materialize_window(fixture.path(), 2, &["Id", "nonexistent_col"], 0, 10)
        .await
        .unwrap_err();

    match &err {
        ParWindowError::UnknownField { field, path } => {
            assert_eq!(field, "nonexistent_col");
            assert_eq!(path.as_deref(), Some(fixture.path()));
        }
        other => panic!("expected UnknownField, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_selection_is_invalid() {
    let fixture = sample_file();
    let err = materialize_window(fixture.path(), 2, &["Id", "ID"], 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err.root(), ParWindowError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_case_insensitive_selection_uses_schema_names() -> par_window::Result<()> {
    let fixture = sample_file();
    let table = materialize_window(fixture.path(), 2, &["NAME", "id", "flag"], 1, 2).await?;

    assert_eq!(table.column_names(), vec!["Name", "Id", "Flag"]);
    assert_eq!(
        table.row(0).unwrap(),
        vec![
            &HostValue::String("name-1".into()),
            &HostValue::Int64(1),
            &HostValue::Boolean(false)
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_timestamp_offset_is_dropped() -> par_window::Result<()> {
    let fixture = sample_file();
    let table = materialize_window(fixture.path(), 1, &["Stamp"], 0, 25).await?;

    let column = table.column("stamp").unwrap();
    assert_eq!(column.host_type(), HostType::Timestamp);
    assert_eq!(column.values()[0], HostValue::Timestamp(midnight(1)));
    assert_eq!(column.values()[24], HostValue::Timestamp(midnight(2)));
    Ok(())
}

#[tokio::test]
async fn test_column_types_are_coerced() -> par_window::Result<()> {
    let fixture = sample_file();
    let table =
        materialize_window(fixture.path(), 4, &["Small", "Tiny", "Price", "Day"], 101, 1).await?;

    let types: Vec<HostType> = table.columns().iter().map(|c| c.host_type()).collect();
    assert_eq!(
        types,
        vec![HostType::Int32, HostType::Byte, HostType::Decimal, HostType::Date]
    );

    let row = table.row(0).unwrap();
    assert_eq!(row[0], &HostValue::Int32(1));
    assert_eq!(row[1], &HostValue::Byte(101));
    assert_eq!(row[2].to_string(), "101.25");
    assert_eq!(
        row[3],
        &HostValue::Date(NaiveDate::from_ymd_opt(2024, 4, 11).unwrap())
    );
    Ok(())
}

#[tokio::test]
async fn test_offset_past_end_yields_empty_table() -> par_window::Result<()> {
    let fixture = sample_file();

    for offset in [150, 151, 10_000] {
        let table = materialize_window(fixture.path(), 2, &["Id", "Name"], offset, 10).await?;
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_names(), vec!["Id", "Name"]);
    }

    let table = materialize_window(fixture.path(), 2, &["Id"], 0, 0).await?;
    assert_eq!(table.row_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_count_is_clamped_to_file_end() -> par_window::Result<()> {
    let fixture = sample_file();
    let table = materialize_window(fixture.path(), 3, &["Id"], 140, 1_000).await?;
    assert_eq!(table.row_count(), 10);
    Ok(())
}

#[tokio::test]
async fn test_empty_file() -> par_window::Result<()> {
    let fixture = empty_file();
    let table = materialize_window(fixture.path(), 2, &sample_fields(), 0, 10).await?;
    assert_eq!(table.row_count(), 0);
    assert_eq!(table.column_count(), sample_fields().len());
    Ok(())
}

#[tokio::test]
async fn test_completion_order_keeps_every_column() -> par_window::Result<()> {
    let fixture = sample_file();
    let config = ReaderConfig::with_parallelism(4).column_order(ColumnOrder::Completion);
    let mut reader = WindowReader::open(fixture.path(), config)?;
    let fields = sample_fields();

    let table = reader.materialize_window(&fields, 0, 5).await?;
    let mut names: Vec<&str> = table.column_names();
    names.sort_unstable();
    let mut expected: Vec<&str> = fields.iter().map(String::as_str).collect();
    expected.sort_unstable();
    assert_eq!(names, expected);
    assert_eq!(table.row_count(), 5);
    Ok(())
}
