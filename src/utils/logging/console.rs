//! Console output utilities
//!
//! Plain-text summaries of schemas and materialized tables.

use std::time::Duration;

use crate::schema::Schema;
use crate::table::Table;

/// Print the shape of a materialized table
pub fn print_table_summary(table: &Table, elapsed: Duration) {
    println!(
        "Materialized {} rows x {} columns in {:?}",
        table.row_count(),
        table.column_count(),
        elapsed
    );
}

/// Print every field of a schema with its native and host type
pub fn print_schema_info(schema: &Schema) {
    println!("Schema:");
    for field in schema.fields() {
        println!(
            "  - {} ({} -> {})",
            field.name(),
            field.native_type(),
            field.host_type()
        );
    }
}
