//! Schema model shared by decoders and the window reader.
//!
//! Field identity is case-insensitive: `Name` and `name` refer to the same
//! column, and a schema may not contain both.

pub mod coercion;
pub mod value;

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::{ParWindowError, Result};

pub use coercion::{HostType, coerce, coerce_value};
pub use value::{Decimal, HostValue, NativeValue};

/// Value-type tag of a column as reported by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Boolean,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
    Decimal,
    Date,
    Time,
    Timestamp,
    TimestampWithOffset,
    String,
    ByteArray,
    /// Nested, map, union, interval and other kinds without a structural host type
    Other,
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single top-level column of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    native_type: NativeType,
}

impl Field {
    pub fn new(name: impl Into<String>, native_type: NativeType) -> Self {
        Self {
            name: name.into(),
            native_type,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn native_type(&self) -> NativeType {
        self.native_type
    }

    /// Host type this field's values are coerced into
    #[must_use]
    pub const fn host_type(&self) -> HostType {
        coerce(self.native_type)
    }
}

/// Lookup key for case-insensitive field identity
fn field_key(name: &str) -> String {
    name.to_lowercase()
}

/// Ordered field list of a file with case-insensitive lookup
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
    by_key: FxHashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting names that collide case-insensitively
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut by_key = FxHashMap::default();
        for (idx, field) in fields.iter().enumerate() {
            if let Some(existing) = by_key.insert(field_key(field.name()), idx) {
                return Err(ParWindowError::inconsistency(format!(
                    "schema fields '{}' and '{}' are not distinguishable ignoring case",
                    fields[existing].name(),
                    field.name()
                )));
            }
        }
        Ok(Self { fields, by_key })
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find a field by name, ignoring case
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_key.get(&field_key(name)).map(|&idx| &self.fields[idx])
    }

    /// Position of a field in the file, ignoring case
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_key.get(&field_key(name)).copied()
    }

    /// Resolve a field selection against this schema
    ///
    /// The returned fields carry the schema's spelling of each name and keep
    /// the selection order.
    ///
    /// # Errors
    /// `UnknownField` for the first name without a match, and
    /// `InvalidConfiguration` when the same field is requested twice.
    pub fn resolve<S: AsRef<str>>(&self, selection: &[S]) -> Result<Vec<Field>> {
        let mut seen = FxHashMap::default();
        selection
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let field = self.field(name).ok_or_else(|| ParWindowError::UnknownField {
                    field: name.to_string(),
                    path: None,
                })?;
                if let Some(previous) = seen.insert(field_key(name), name) {
                    return Err(ParWindowError::invalid_config(format!(
                        "field '{name}' is selected more than once (also as '{previous}')"
                    )));
                }
                Ok(field.clone())
            })
            .collect()
    }

    /// Names of all fields in file order
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_string()).collect()
    }
}
