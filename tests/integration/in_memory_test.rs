use par_window::schema::{Field, NativeType, NativeValue, Schema};
use par_window::table::merge_by_index;
use par_window::{HostValue, InMemorySource, ParWindowError, ReaderConfig, Table, WindowReader};

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("a", NativeType::Int32),
        Field::new("b", NativeType::UInt16),
        Field::new("c", NativeType::String),
    ])
    .unwrap()
}

fn int_column(range: std::ops::Range<i32>) -> Vec<NativeValue> {
    range.map(NativeValue::Int32).collect()
}

fn source(b_values_in_first_group: u16) -> InMemorySource {
    InMemorySource::new(schema())
        .with_row_group(10, [
            ("a", int_column(0..10)),
            (
                "b",
                (0..b_values_in_first_group).map(NativeValue::UInt16).collect(),
            ),
            ("c", (0..10).map(|i| NativeValue::String(format!("c{i}"))).collect()),
        ])
        .with_row_group(5, [
            ("a", int_column(10..15)),
            ("b", (10..15).map(NativeValue::UInt16).collect()),
            ("c", (10..15).map(|i| NativeValue::String(format!("c{i}"))).collect()),
        ])
}

fn reader(source: &InMemorySource, handles: usize) -> WindowReader {
    WindowReader::from_sources(
        vec![source.clone(); handles],
        source.clone(),
        ReaderConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_unknown_field_opens_no_row_group() {
    let source = source(10);
    let mut reader = reader(&source, 3);

    let err = reader
        .materialize_window(&["a", "nonexistent_col"], 0, 5)
        .await
        .unwrap_err();

    assert!(matches!(err, ParWindowError::UnknownField { .. }));
    assert_eq!(source.stats().opened(), 0);
    assert_eq!(source.stats().values_read(), 0);
}

#[tokio::test]
async fn test_short_column_fails_and_releases_cursors() {
    let source = source(4);
    let mut reader = reader(&source, 3);

    let err = reader
        .materialize_window(&["a", "b", "c"], 2, 10)
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ParWindowError::DecodeInconsistency { .. }));
    let stats = source.stats();
    assert!(stats.opened() > 0);
    assert_eq!(stats.opened(), stats.closed());
}

#[tokio::test]
async fn test_cleanup_failures_do_not_mask_result() {
    let source = source(10).fail_on_close().fail_on_release();
    let stats = source.stats();
    let mut reader = reader(&source, 2);

    let table = reader.materialize_window(&["c", "b"], 8, 4).await.unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.value(0, 1), Some(&HostValue::Int32(8)));
    assert_eq!(table.value(3, 0), Some(&HostValue::String("c11".into())));

    drop(reader);
    assert_eq!(stats.released(), 3);
}

#[tokio::test]
async fn test_window_matches_for_every_handle_count() {
    let source = source(10);
    let expected = reader(&source, 1)
        .materialize_window(&["c", "a", "b"], 3, 9)
        .await
        .unwrap();

    for handles in 2..=5 {
        let table = reader(&source, handles)
            .materialize_window(&["c", "a", "b"], 3, 9)
            .await
            .unwrap();
        assert_eq!(table, expected, "{handles} handles");
    }
}

fn single_column(name: &str, rows: usize) -> Table {
    let schema = Schema::new(vec![Field::new(name, NativeType::Int32)]).unwrap();
    let source = InMemorySource::new(schema)
        .with_row_group(rows as u64, [(name, vec![NativeValue::Int32(1); rows])]);
    reader(&source, 1)
        .materialize_window_blocking(&[name], 0, rows as u64)
        .unwrap()
}

#[test]
fn test_merge_pads_and_rejects() {
    let five = single_column("x", 5);
    let none = single_column("y", 0);
    let seven = single_column("z", 7);

    let padded = merge_by_index(five.clone(), none).unwrap();
    assert_eq!(padded.row_count(), 5);
    assert_eq!(padded.column("y").unwrap().len(), 5);

    let err = merge_by_index(five, seven).unwrap_err();
    assert!(matches!(err, ParWindowError::DecodeInconsistency { .. }));
}
