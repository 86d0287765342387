//! Mapping from decoder value types to presentation types.
//!
//! Both functions are exhaustive over [`NativeType`]: a new native kind does
//! not compile until it is given a host type here.

use std::fmt;

use serde::Serialize;

use super::value::{HostValue, NativeValue};
use super::NativeType;
use crate::error::{ParWindowError, Result};

/// Presentation type of a materialized column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HostType {
    Boolean,
    SByte,
    Byte,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Date,
    Time,
    Timestamp,
    String,
    Bytes,
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Host type for a native column type
#[must_use]
pub const fn coerce(native_type: NativeType) -> HostType {
    match native_type {
        NativeType::Boolean => HostType::Boolean,
        NativeType::Int8 => HostType::SByte,
        NativeType::UInt8 => HostType::Byte,
        NativeType::Int16 | NativeType::UInt16 | NativeType::Int32 => HostType::Int32,
        NativeType::UInt32 | NativeType::Int64 => HostType::Int64,
        NativeType::Float16 | NativeType::Float32 => HostType::Float32,
        NativeType::Float64 => HostType::Float64,
        NativeType::Decimal => HostType::Decimal,
        NativeType::Date => HostType::Date,
        NativeType::Time => HostType::Time,
        // Offset is dropped, see `coerce_value`
        NativeType::Timestamp | NativeType::TimestampWithOffset => HostType::Timestamp,
        NativeType::ByteArray => HostType::Bytes,
        NativeType::String | NativeType::UInt64 | NativeType::Other => HostType::String,
    }
}

/// Coerce one decoded value of a column with the given native type
///
/// Nulls map to `HostValue::Null` for every type. A timestamp with an offset
/// keeps its wall-clock time at that offset and loses the offset itself:
/// `2024-01-01T00:00:00+02:00` becomes `2024-01-01T00:00:00`.
///
/// # Errors
/// `DecodeInconsistency` when a non-null value's own type differs from the
/// column's native type.
pub fn coerce_value(native_type: NativeType, raw: NativeValue) -> Result<HostValue> {
    let value = match (native_type, raw) {
        (_, NativeValue::Null) => HostValue::Null,
        (NativeType::Boolean, NativeValue::Boolean(v)) => HostValue::Boolean(v),
        (NativeType::Int8, NativeValue::Int8(v)) => HostValue::SByte(v),
        (NativeType::UInt8, NativeValue::UInt8(v)) => HostValue::Byte(v),
        (NativeType::Int16, NativeValue::Int16(v)) => HostValue::Int32(i32::from(v)),
        (NativeType::UInt16, NativeValue::UInt16(v)) => HostValue::Int32(i32::from(v)),
        (NativeType::Int32, NativeValue::Int32(v)) => HostValue::Int32(v),
        (NativeType::UInt32, NativeValue::UInt32(v)) => HostValue::Int64(i64::from(v)),
        (NativeType::Int64, NativeValue::Int64(v)) => HostValue::Int64(v),
        (NativeType::UInt64, NativeValue::UInt64(v)) => HostValue::String(v.to_string()),
        (NativeType::Float16, NativeValue::Float16(v))
        | (NativeType::Float32, NativeValue::Float32(v)) => HostValue::Float32(v),
        (NativeType::Float64, NativeValue::Float64(v)) => HostValue::Float64(v),
        (NativeType::Decimal, NativeValue::Decimal(v)) => HostValue::Decimal(v),
        (NativeType::Date, NativeValue::Date(v)) => HostValue::Date(v),
        (NativeType::Time, NativeValue::Time(v)) => HostValue::Time(v),
        (NativeType::Timestamp, NativeValue::Timestamp(v)) => HostValue::Timestamp(v),
        (NativeType::TimestampWithOffset, NativeValue::TimestampWithOffset(v)) => {
            HostValue::Timestamp(v.naive_local())
        }
        (NativeType::String, NativeValue::String(v))
        | (NativeType::Other, NativeValue::Other(v)) => HostValue::String(v),
        (NativeType::ByteArray, NativeValue::Bytes(v)) => HostValue::Bytes(v),
        (expected, raw) => {
            return Err(ParWindowError::inconsistency(format!(
                "column declared as {expected} produced a {} value",
                raw.native_type()
                    .map_or_else(|| "null".to_string(), |t| t.to_string())
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::value::Decimal;
    use chrono::{DateTime, NaiveDate};

    const ALL_TYPES: [NativeType; 20] = [
        NativeType::Boolean,
        NativeType::Int8,
        NativeType::UInt8,
        NativeType::Int16,
        NativeType::UInt16,
        NativeType::Int32,
        NativeType::UInt32,
        NativeType::Int64,
        NativeType::UInt64,
        NativeType::Float16,
        NativeType::Float32,
        NativeType::Float64,
        NativeType::Decimal,
        NativeType::Date,
        NativeType::Time,
        NativeType::Timestamp,
        NativeType::TimestampWithOffset,
        NativeType::String,
        NativeType::ByteArray,
        NativeType::Other,
    ];

    #[test]
    fn test_null_coerces_to_null_for_every_type() {
        for native_type in ALL_TYPES {
            assert_eq!(
                coerce_value(native_type, NativeValue::Null).unwrap(),
                HostValue::Null,
                "{native_type}"
            );
        }
    }

    #[test]
    fn test_timestamp_with_offset_drops_offset() {
        let raw = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+02:00").unwrap();
        let value = coerce_value(
            NativeType::TimestampWithOffset,
            NativeValue::TimestampWithOffset(raw),
        )
        .unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(value, HostValue::Timestamp(expected));
    }

    #[test]
    fn test_narrow_integers_widen() {
        assert_eq!(coerce(NativeType::Int16), HostType::Int32);
        assert_eq!(coerce(NativeType::UInt16), HostType::Int32);
        assert_eq!(
            coerce_value(NativeType::UInt16, NativeValue::UInt16(u16::MAX)).unwrap(),
            HostValue::Int32(65535)
        );
        assert_eq!(
            coerce_value(NativeType::Int16, NativeValue::Int16(-3)).unwrap(),
            HostValue::Int32(-3)
        );
    }

    #[test]
    fn test_structural_mappings() {
        assert_eq!(coerce(NativeType::Int64), HostType::Int64);
        assert_eq!(coerce(NativeType::UInt8), HostType::Byte);
        assert_eq!(coerce(NativeType::Int8), HostType::SByte);
        assert_eq!(coerce(NativeType::Boolean), HostType::Boolean);
        assert_eq!(coerce(NativeType::Decimal), HostType::Decimal);
        assert_eq!(coerce(NativeType::Float32), HostType::Float32);
        assert_eq!(coerce(NativeType::Float64), HostType::Float64);
        assert_eq!(coerce(NativeType::ByteArray), HostType::Bytes);
        assert_eq!(coerce(NativeType::Other), HostType::String);
        assert_eq!(
            coerce_value(NativeType::Decimal, NativeValue::Decimal(Decimal::new(5, 1))).unwrap(),
            HostValue::Decimal(Decimal::new(5, 1))
        );
    }

    #[test]
    fn test_host_type_matches_coerced_value() {
        let samples = [
            (NativeType::UInt32, NativeValue::UInt32(7)),
            (NativeType::UInt64, NativeValue::UInt64(u64::MAX)),
            (NativeType::Float16, NativeValue::Float16(0.5)),
            (NativeType::Other, NativeValue::Other("{a: 1}".into())),
        ];
        for (native_type, raw) in samples {
            let host = coerce_value(native_type, raw).unwrap();
            let host_type = match host {
                HostValue::Int64(_) => HostType::Int64,
                HostValue::String(_) => HostType::String,
                HostValue::Float32(_) => HostType::Float32,
                ref other => panic!("unexpected {other:?}"),
            };
            assert_eq!(coerce(native_type), host_type);
        }
    }

    #[test]
    fn test_mismatched_value_is_inconsistency() {
        let result = coerce_value(NativeType::Int32, NativeValue::String("1".into()));
        assert!(matches!(
            result,
            Err(ParWindowError::DecodeInconsistency { .. })
        ));
    }
}
