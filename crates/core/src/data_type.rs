//! Numeric data type tags shared by the hash map, tensor store and wire codec.
//!
//! Values are assigned explicitly and must never be renumbered: the map file
//! header and the tensor checkpoint metadata both persist these codes on disk.

use std::fmt;

/// A missing/unset data type, encoded as `u64::MAX` on the wire.
pub const NULL_DATA_TYPE_CODE: u64 = u64::MAX;

/// Numeric element type of a key or value array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum DataType {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    UInt8 = 4,
    UInt16 = 5,
    UInt32 = 6,
    UInt64 = 7,
    Float32 = 8,
    Float64 = 9,
}

impl DataType {
    /// Size in bytes of a single value of this type.
    pub fn size_of(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }

    /// Decode a data type from its wire code.
    pub fn from_code(code: u64) -> Option<DataType> {
        Some(match code {
            0 => DataType::Int8,
            1 => DataType::Int16,
            2 => DataType::Int32,
            3 => DataType::Int64,
            4 => DataType::UInt8,
            5 => DataType::UInt16,
            6 => DataType::UInt32,
            7 => DataType::UInt64,
            8 => DataType::Float32,
            9 => DataType::Float64,
            _ => return None,
        })
    }

    /// Encode as the wire code persisted in map files and message meta.
    pub fn code(self) -> u64 {
        self as u64
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        };
        f.write_str(s)
    }
}

/// Trait mapping a Rust numeric type to its `DataType` code, mirroring the
/// `DataTypeToCode` template used by the hash map and tensor value arrays.
pub trait ToDataType {
    const DATA_TYPE: DataType;
}

macro_rules! impl_to_data_type {
    ($t:ty, $variant:ident) => {
        impl ToDataType for $t {
            const DATA_TYPE: DataType = DataType::$variant;
        }
    };
}

impl_to_data_type!(i8, Int8);
impl_to_data_type!(i16, Int16);
impl_to_data_type!(i32, Int32);
impl_to_data_type!(i64, Int64);
impl_to_data_type!(u8, UInt8);
impl_to_data_type!(u16, UInt16);
impl_to_data_type!(u32, UInt32);
impl_to_data_type!(u64, UInt64);
impl_to_data_type!(f32, Float32);
impl_to_data_type!(f64, Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_code() {
        for dt in [
            DataType::Int8,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(DataType::from_code(dt.code()), Some(dt));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(DataType::from_code(255), None);
    }

    #[test]
    fn sizes_match_rust_types() {
        assert_eq!(DataType::Int8.size_of(), std::mem::size_of::<i8>());
        assert_eq!(DataType::UInt64.size_of(), std::mem::size_of::<u64>());
        assert_eq!(DataType::Float64.size_of(), std::mem::size_of::<f64>());
    }
}
