//! Cell values on both sides of type coercion.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

use super::NativeType;

/// Fixed-point decimal as stored in the file (unscaled value and scale)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub value: i128,
    pub scale: i8,
}

impl Decimal {
    #[must_use]
    pub const fn new(value: i128, scale: i8) -> Self {
        Self { value, scale }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale <= 0 {
            let mut digits = self.value.to_string();
            if self.value != 0 {
                digits.extend(std::iter::repeat_n('0', self.scale.unsigned_abs() as usize));
            }
            return f.write_str(&digits);
        }

        let scale = self.scale as usize;
        let digits = self.value.unsigned_abs().to_string();
        let sign = if self.value < 0 { "-" } else { "" };
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int_part}.{frac_part}")
        } else {
            write!(f, "{sign}0.{digits:0>scale$}")
        }
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A value exactly as the decoder produced it
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Boolean(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    /// Half-precision value, already widened by the decoder
    Float16(f32),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampWithOffset(DateTime<FixedOffset>),
    String(String),
    Bytes(Vec<u8>),
    /// Display text of a value without a structural host type
    Other(String),
}

impl NativeValue {
    /// Type tag of a non-null value
    #[must_use]
    pub const fn native_type(&self) -> Option<NativeType> {
        Some(match self {
            Self::Null => return None,
            Self::Boolean(_) => NativeType::Boolean,
            Self::Int8(_) => NativeType::Int8,
            Self::UInt8(_) => NativeType::UInt8,
            Self::Int16(_) => NativeType::Int16,
            Self::UInt16(_) => NativeType::UInt16,
            Self::Int32(_) => NativeType::Int32,
            Self::UInt32(_) => NativeType::UInt32,
            Self::Int64(_) => NativeType::Int64,
            Self::UInt64(_) => NativeType::UInt64,
            Self::Float16(_) => NativeType::Float16,
            Self::Float32(_) => NativeType::Float32,
            Self::Float64(_) => NativeType::Float64,
            Self::Decimal(_) => NativeType::Decimal,
            Self::Date(_) => NativeType::Date,
            Self::Time(_) => NativeType::Time,
            Self::Timestamp(_) => NativeType::Timestamp,
            Self::TimestampWithOffset(_) => NativeType::TimestampWithOffset,
            Self::String(_) => NativeType::String,
            Self::Bytes(_) => NativeType::ByteArray,
            Self::Other(_) => NativeType::Other,
        })
    }
}

/// A value in its presentation type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostValue {
    Null,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    String(String),
    Bytes(Vec<u8>),
}

impl HostValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Bytes(v) => {
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}
