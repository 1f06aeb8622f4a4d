//! Binary map file format: a fixed header followed by the four backing
//! arrays, all little-endian. See `MapFileHeader` for the exact byte layout.

use std::io::{Read, Write};

use crate::bucket::NIL;
use crate::element::Element;
use crate::error::{HashMapError, HashMapResult};
use crate::map::ArrayHashMap;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use mlps_core::ToDataType;

pub const SIGNATURE_SIZE: usize = 32;
pub const SIGNATURE: &[u8; SIGNATURE_SIZE] = b"\x89MemoryMappedArrayHashMap\0\0\0\0\0\0";
pub const FORMAT_VERSION: u64 = 4;

/// Fixed-size header preceding the four arrays in a map file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFileHeader {
    pub version: u64,
    pub reserved: u64,
    pub key_type: u64,
    pub value_type: u64,
    pub key_count: u64,
    pub bucket_count: u64,
    pub value_count: u64,
    pub value_count_per_key: u64,
}

impl MapFileHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> HashMapResult<()> {
        w.write_all(SIGNATURE)?;
        w.write_u64::<LE>(self.version)?;
        w.write_u64::<LE>(self.reserved)?;
        w.write_u64::<LE>(self.key_type)?;
        w.write_u64::<LE>(self.value_type)?;
        w.write_u64::<LE>(self.key_count)?;
        w.write_u64::<LE>(self.bucket_count)?;
        w.write_u64::<LE>(self.value_count)?;
        w.write_u64::<LE>(self.value_count_per_key)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> HashMapResult<MapFileHeader> {
        let mut signature = [0u8; SIGNATURE_SIZE];
        r.read_exact(&mut signature)?;
        if &signature != SIGNATURE {
            return Err(HashMapError::BadSignature);
        }
        let version = r.read_u64::<LE>()?;
        if version != FORMAT_VERSION {
            return Err(HashMapError::VersionMismatch {
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        let header = MapFileHeader {
            version,
            reserved: r.read_u64::<LE>()?,
            key_type: r.read_u64::<LE>()?,
            value_type: r.read_u64::<LE>()?,
            key_count: r.read_u64::<LE>()?,
            bucket_count: r.read_u64::<LE>()?,
            value_count: r.read_u64::<LE>()?,
            value_count_per_key: r.read_u64::<LE>()?,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> HashMapResult<()> {
        if self.reserved != 0 {
            return Err(HashMapError::InvalidHeader("reserved must be 0".into()));
        }
        if self.key_count > self.bucket_count {
            return Err(HashMapError::InvalidHeader(
                "key_count exceeds bucket_count".into(),
            ));
        }
        if self.bucket_count != 0 && !self.bucket_count.is_power_of_two() {
            return Err(HashMapError::InvalidHeader(
                "bucket_count is not a power of two".into(),
            ));
        }
        if self.value_count != self.key_count * self.value_count_per_key {
            return Err(HashMapError::InvalidHeader(
                "value_count != key_count * value_count_per_key".into(),
            ));
        }
        Ok(())
    }
}

/// Serialize `map` to `w`, optionally narrowing to `value_count_per_key`
/// values per key (used by `TensorStore::save` to drop optimizer state).
pub fn serialize<K: Element, V: Element, W: Write>(
    map: &ArrayHashMap<K, V>,
    w: &mut W,
    narrow_to: Option<u64>,
) -> HashMapResult<()> {
    let full_width = map
        .value_count_per_key()
        .ok_or(HashMapError::ValueCountPerKeyUnset)?;
    let width = narrow_to.unwrap_or(full_width);
    if width > full_width {
        return Err(HashMapError::ValueCountPerKeyExceeded {
            requested: width,
            actual: full_width,
        });
    }
    let header = MapFileHeader {
        version: FORMAT_VERSION,
        reserved: 0,
        key_type: K::DATA_TYPE.code(),
        value_type: V::DATA_TYPE.code(),
        key_count: map.key_count(),
        bucket_count: map.bucket_count(),
        value_count: width * map.key_count(),
        value_count_per_key: width,
    };
    header.write_to(w)?;

    let mut buf = Vec::with_capacity(map.key_count() as usize * K::SIZE);
    for k in map.keys_iter() {
        k.write_le(&mut buf);
    }
    w.write_all(&buf)?;

    let mut buf = Vec::with_capacity((width * map.key_count()) as usize * V::SIZE);
    for slot in 0..map.key_count() as u32 {
        let values = map.values(slot);
        for v in &values[..width as usize] {
            v.write_le(&mut buf);
        }
    }
    w.write_all(&buf)?;

    let mut next_buf = Vec::with_capacity(map.key_count() as usize * 4);
    for &n in map.next_array() {
        next_buf.write_u32::<LE>(n)?;
    }
    w.write_all(&next_buf)?;

    let mut first_buf = Vec::with_capacity(map.bucket_count() as usize * 4);
    for &f in map.first_array() {
        first_buf.write_u32::<LE>(f)?;
    }
    w.write_all(&first_buf)?;

    Ok(())
}

/// Deserialize a map file from `r` into a fresh [`ArrayHashMap`].
///
/// Value element width mismatches are tolerated by reinterpreting the raw
/// byte payload as long as the total byte length still divides evenly by
/// the in-memory element size; any other mismatch is rejected. Key type
/// mismatches are only tolerated when the element sizes agree.
pub fn deserialize<K: Element, V: Element, R: Read>(r: &mut R) -> HashMapResult<ArrayHashMap<K, V>> {
    let header = MapFileHeader::read_from(r)?;

    if header.key_type != K::DATA_TYPE.code() {
        let on_disk_size = data_type_size(header.key_type)?;
        if on_disk_size != K::SIZE {
            return Err(HashMapError::KeyTypeMismatch {
                expected: K::DATA_TYPE.code(),
                found: header.key_type,
            });
        }
    }

    let mut value_count = header.value_count;
    let mut value_count_per_key = header.value_count_per_key;
    if header.value_type != V::DATA_TYPE.code() {
        let on_disk_size = data_type_size(header.value_type)?;
        let total_bytes = value_count_per_key * on_disk_size as u64;
        if total_bytes % V::SIZE as u64 == 0 {
            value_count_per_key = total_bytes / V::SIZE as u64;
            value_count = value_count_per_key * header.key_count;
        } else {
            return Err(HashMapError::ValueTypeMismatch {
                expected: V::DATA_TYPE.code(),
                found: header.value_type,
                value_count_per_key: header.value_count_per_key,
            });
        }
    }

    let mut keys_bytes = vec![0u8; header.key_count as usize * K::SIZE];
    r.read_exact(&mut keys_bytes)?;
    let mut keys: Vec<K> = keys_bytes.chunks_exact(K::SIZE).map(K::read_le).collect();
    keys.resize(header.bucket_count as usize, K::zero());

    let mut values_bytes = vec![0u8; value_count as usize * V::SIZE];
    r.read_exact(&mut values_bytes)?;
    let mut values: Vec<V> = values_bytes
        .chunks_exact(V::SIZE)
        .map(V::read_le)
        .collect();
    values.resize(header.bucket_count as usize * value_count_per_key as usize, V::zero());

    let mut next = vec![0u32; header.key_count as usize];
    for slot in next.iter_mut() {
        *slot = r.read_u32::<LE>()?;
    }
    next.resize(header.bucket_count as usize, NIL);
    let mut first = vec![0u32; header.bucket_count as usize];
    for bucket in first.iter_mut() {
        *bucket = r.read_u32::<LE>()?;
    }

    Ok(ArrayHashMap::from_raw_parts(
        keys,
        values,
        next,
        first,
        header.key_count,
        header.bucket_count,
        value_count_per_key,
    ))
}

fn data_type_size(code: u64) -> HashMapResult<usize> {
    mlps_core::DataType::from_code(code)
        .map(|dt| dt.size_of())
        .ok_or_else(|| HashMapError::InvalidHeader(format!("unknown data type code {code}")))
}
