//! Column-major tables produced by window materialization.
//!
//! The same [`Table`] type holds the partial result of one field subset and
//! the final assembled result.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::{ParWindowError, Result};
use crate::schema::{Field, HostType, HostValue};

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// A named, typed column of host values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    name: String,
    host_type: HostType,
    values: Vec<HostValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, host_type: HostType) -> Self {
        Self {
            name: name.into(),
            host_type,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn host_type(&self) -> HostType {
        self.host_type
    }

    #[must_use]
    pub fn values(&self) -> &[HostValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rectangular table; every column holds exactly `row_count` values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// An empty table with no columns
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table with one column per field
    #[must_use]
    pub fn for_fields(fields: &[Field]) -> Self {
        Self {
            columns: fields
                .iter()
                .map(|f| Column::new(f.name(), f.host_type()))
                .collect(),
            row_count: 0,
        }
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Find a column by name, ignoring case
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| same_name(&c.name, name))
    }

    /// Cell at the given row and column position
    #[must_use]
    pub fn value(&self, row: usize, column: usize) -> Option<&HostValue> {
        self.columns.get(column)?.values.get(row)
    }

    /// Values of one row in column order
    #[must_use]
    pub fn row(&self, row: usize) -> Option<Vec<&HostValue>> {
        (row < self.row_count).then(|| self.columns.iter().map(|c| &c.values[row]).collect())
    }

    /// Iterate over rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&HostValue>> + '_ {
        (0..self.row_count).map(|row| self.columns.iter().map(|c| &c.values[row]).collect())
    }

    /// Append one row of nulls and return its index
    pub fn push_row(&mut self) -> usize {
        for column in &mut self.columns {
            column.values.push(HostValue::Null);
        }
        self.row_count += 1;
        self.row_count - 1
    }

    /// Append empty rows until the table holds `row_count` rows
    pub fn pad_to(&mut self, row_count: usize) {
        if row_count <= self.row_count {
            return;
        }
        for column in &mut self.columns {
            column.values.resize(row_count, HostValue::Null);
        }
        self.row_count = row_count;
    }

    /// Overwrite a cell of an existing row
    ///
    /// # Panics
    /// Panics if the row or column does not exist.
    pub fn set(&mut self, row: usize, column: usize, value: HostValue) {
        assert!(row < self.row_count, "row {row} out of bounds");
        self.columns[column].values[row] = value;
    }

    /// Move the named columns to the front, in the given order
    ///
    /// Columns not named keep their relative order after the named ones.
    ///
    /// # Errors
    /// `UnknownField` if a name matches no column.
    pub fn reorder_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for (target, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let current = self.columns[target..]
                .iter()
                .position(|c| same_name(&c.name, name))
                .map(|offset| target + offset)
                .ok_or_else(|| ParWindowError::UnknownField {
                    field: name.to_string(),
                    path: None,
                })?;
            let column = self.columns.remove(current);
            self.columns.insert(target, column);
        }
        Ok(())
    }
}

/// Concatenate two tables side by side, row by row
///
/// Columns of `right` follow those of `left`; a name already present gets a
/// `_2`, `_3`, ... suffix. A table with no rows is padded with empty rows to
/// match the other one.
///
/// # Errors
/// `DecodeInconsistency` when both tables have rows but not the same number.
pub fn merge_by_index(mut left: Table, mut right: Table) -> Result<Table> {
    match (left.row_count, right.row_count) {
        (0, rows) => left.pad_to(rows),
        (rows, 0) => right.pad_to(rows),
        (l, r) if l != r => {
            return Err(ParWindowError::inconsistency(format!(
                "tables with differing amount of rows cannot be merged: {l} and {r}"
            )));
        }
        _ => {}
    }

    let mut taken: FxHashSet<String> = left
        .columns
        .iter()
        .map(|c| c.name.to_lowercase())
        .collect();

    for mut column in right.columns {
        let base = column.name.clone();
        let mut suffix = 1;
        while taken.contains(&column.name.to_lowercase()) {
            suffix += 1;
            column.name = format!("{base}_{suffix}");
        }
        taken.insert(column.name.to_lowercase());
        left.columns.push(column);
    }

    Ok(left)
}
