//! Appending the rows of one row-group slice to a partial table.

use crate::decoder::RowGroupCursor;
use crate::error::{ParWindowError, Result};
use crate::reader::CancelSignal;
use crate::schema::{Field, coerce_value};
use crate::table::Table;

/// Append rows `[skip, skip + take)` of the cursor's row group to `table`
///
/// `table` must have one column per entry of `fields`, in the same order.
/// Fields are read one after another: the first allocates `take` new rows and
/// the others fill the same rows. Decoding of a column stops as soon as its
/// `take` values are collected.
///
/// # Errors
/// `DecodeInconsistency` if a column ends before `skip + take` values, or if
/// a value does not match its column type. `Cancelled` if `cancel` is raised
/// between two fields. Every decoding error names the field and row group.
pub fn materialize<C>(
    cursor: &mut C,
    fields: &[Field],
    skip: u64,
    take: u64,
    table: &mut Table,
    cancel: &CancelSignal,
) -> Result<()>
where
    C: RowGroupCursor + ?Sized,
{
    debug_assert_eq!(table.column_count(), fields.len());

    let row_group = cursor.index();
    let skip = to_usize(skip)?;
    let take = to_usize(take)?;
    let first_row = table.row_count();

    for (column, field) in fields.iter().enumerate() {
        cancel.check()?;

        let located = |e: ParWindowError| e.in_column(field.name(), row_group);
        let short_column = |read: usize| {
            ParWindowError::inconsistency(format!(
                "ended after {read} values, expected at least {}",
                skip + take
            ))
            .in_column(field.name(), row_group)
        };

        let mut values = cursor.read_column(field).map_err(located)?;

        for read in 0..skip {
            values.next().ok_or_else(|| short_column(read))?.map_err(located)?;
        }

        let mut taken = 0;
        for raw in values.by_ref().take(take) {
            let value = raw
                .and_then(|raw| coerce_value(field.native_type(), raw))
                .map_err(located)?;
            let row = if column == 0 {
                table.push_row()
            } else {
                first_row + taken
            };
            table.set(row, column, value);
            taken += 1;
        }

        if taken < take {
            return Err(short_column(skip + taken));
        }
    }

    Ok(())
}

fn to_usize(rows: u64) -> Result<usize> {
    usize::try_from(rows).map_err(|_| {
        ParWindowError::invalid_config(format!("{rows} rows do not fit in memory on this platform"))
    })
}
