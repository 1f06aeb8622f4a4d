//! The `Element` trait lets [`crate::map::ArrayHashMap`] stay generic over
//! both its key and value types while still being able to serialize either
//! one to a stable little-endian byte layout for the map file format.

use mlps_core::ToDataType;

/// A fixed-width numeric type usable as an `ArrayHashMap` key or value.
pub trait Element: Copy + PartialEq + ToDataType + 'static {
    /// Width in bytes of this element on the wire and on disk.
    const SIZE: usize;

    /// Append the little-endian byte representation to `buf`.
    fn write_le(self, buf: &mut Vec<u8>);

    /// Decode a value from exactly `Self::SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Widen/narrow to `u64` for bucket hashing; only meaningful for keys.
    fn to_u64(self) -> u64;

    /// The additive identity, used to zero-initialize newly allocated slots.
    fn zero() -> Self;
}

macro_rules! impl_element {
    ($t:ty, $to_u64:expr) => {
        impl Element for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            fn write_le(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut arr = [0u8; std::mem::size_of::<$t>()];
                arr.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(arr)
            }

            fn to_u64(self) -> u64 {
                let f: fn($t) -> u64 = $to_u64;
                f(self)
            }

            fn zero() -> Self {
                0 as $t
            }
        }
    };
}

impl_element!(i8, |v: i8| v as u64);
impl_element!(i16, |v: i16| v as u64);
impl_element!(i32, |v: i32| v as u64);
impl_element!(i64, |v: i64| v as u64);
impl_element!(u8, |v: u8| v as u64);
impl_element!(u16, |v: u16| v as u64);
impl_element!(u32, |v: u32| v as u64);
impl_element!(u64, |v: u64| v);
impl_element!(f32, |_v: f32| 0u64);
impl_element!(f64, |_v: f64| 0u64);
