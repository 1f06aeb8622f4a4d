//! The sparse tensor storage primitive: an array-backed, separate-chaining
//! hash map ([`ArrayHashMap`]) plus its binary map file codec
//! ([`codec::serialize`] / [`codec::deserialize`]).

pub mod bucket;
pub mod codec;
pub mod element;
pub mod error;
pub mod map;

pub use codec::{MapFileHeader, FORMAT_VERSION, SIGNATURE};
pub use element::Element;
pub use error::{HashMapError, HashMapResult};
pub use map::ArrayHashMap;

#[cfg(test)]
mod codec_tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_is_byte_for_byte_when_not_narrowed() {
        let mut map: ArrayHashMap<u64, f32> = ArrayHashMap::with_value_width(2);
        for k in [7u64, 131, 42] {
            let (slot, _) = map.get_or_init(k).unwrap();
            let vals = map.values_mut(slot);
            vals[0] = k as f32;
            vals[1] = (k * 2) as f32;
        }

        let mut bytes = Vec::new();
        codec::serialize(&map, &mut bytes, None).unwrap();

        let loaded: ArrayHashMap<u64, f32> = codec::deserialize(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(loaded.key_count(), map.key_count());
        assert_eq!(loaded.bucket_count(), map.bucket_count());

        let mut rebytes = Vec::new();
        codec::serialize(&loaded, &mut rebytes, None).unwrap();
        assert_eq!(bytes, rebytes);

        let order: Vec<u64> = loaded.keys_iter().collect();
        assert_eq!(order, vec![7, 131, 42]);
        assert_eq!(loaded.get(131).unwrap(), &[131.0, 262.0]);
    }

    #[test]
    fn rejects_bad_signature() {
        let bytes = vec![0u8; 128];
        let err = codec::deserialize::<u64, f32, _>(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, HashMapError::BadSignature));
    }

    #[test]
    fn widens_value_type_when_byte_length_divides_evenly() {
        // Two u32 values per key on disk (8 bytes) reinterpreted as four u8s.
        let mut map: ArrayHashMap<u64, u32> = ArrayHashMap::with_value_width(2);
        let (slot, _) = map.get_or_init(9).unwrap();
        map.values_mut(slot).copy_from_slice(&[1, 2]);
        let mut bytes = Vec::new();
        codec::serialize(&map, &mut bytes, None).unwrap();

        let widened: ArrayHashMap<u64, u8> = codec::deserialize(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(widened.value_count_per_key(), Some(8));
        assert_eq!(widened.get(9).unwrap().len(), 8);
    }
}
