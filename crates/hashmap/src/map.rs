//! `ArrayHashMap`: an array-backed, separate-chaining hash map used as the
//! storage primitive for sparse tensors.
//!
//! Four parallel arrays back the map: `keys`, `values` (a flat
//! `value_count_per_key`-wide slice per key), `next` (chain successor slot or
//! [`NIL`]) and `first` (chain head per bucket or [`NIL`]). Slot indices are
//! stable under insertion until the next reallocation, which only happens on
//! growth or [`ArrayHashMap::prune`].

use crate::bucket::{bucket_of, power_of_two_ceil, NIL};
use crate::element::Element;
use crate::error::{HashMapError, HashMapResult};

/// See the module documentation for the on-disk/in-memory layout.
pub struct ArrayHashMap<K: Element, V: Element> {
    keys: Vec<K>,
    values: Vec<V>,
    next: Vec<u32>,
    first: Vec<u32>,
    key_count: u64,
    bucket_count: u64,
    value_count_per_key: Option<u64>,
}

/// Hard cap on bucket count: slot indices must fit in a `u32`.
const MAX_BUCKETS: u64 = u32::MAX as u64;

impl<K: Element, V: Element> ArrayHashMap<K, V> {
    /// A map with `value_count_per_key` unset. Any operation that touches
    /// values will fail until [`Self::with_value_width`] is used instead, or
    /// the map is loaded from a map file.
    pub fn new() -> Self {
        ArrayHashMap {
            keys: Vec::new(),
            values: Vec::new(),
            next: Vec::new(),
            first: Vec::new(),
            key_count: 0,
            bucket_count: 0,
            value_count_per_key: None,
        }
    }

    /// A map whose value region per key has a fixed, construction-time width.
    ///
    /// Rejecting a default-constructed map from value-touching operations
    /// (rather than treating `-1` as a runtime sentinel) is the Rust-side
    /// resolution of the open question over `value_count_per_key`.
    pub fn with_value_width(value_count_per_key: u64) -> Self {
        let mut map = Self::new();
        map.value_count_per_key = Some(value_count_per_key);
        map
    }

    pub fn value_count_per_key(&self) -> Option<u64> {
        self.value_count_per_key
    }

    pub fn key_count(&self) -> u64 {
        self.key_count
    }

    pub fn bucket_count(&self) -> u64 {
        self.bucket_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    fn width(&self) -> HashMapResult<u64> {
        self.value_count_per_key
            .ok_or(HashMapError::ValueCountPerKeyUnset)
    }

    /// Find the slot holding `key`, if present.
    pub fn find(&self, key: K) -> Option<u32> {
        if self.bucket_count == 0 {
            return None;
        }
        let bucket = bucket_of(key.to_u64(), self.bucket_count);
        let mut i = self.first[bucket as usize];
        while i != NIL {
            if self.keys[i as usize] == key {
                return Some(i);
            }
            i = self.next[i as usize];
        }
        None
    }

    /// The value slice for an already-known slot.
    pub fn values(&self, slot: u32) -> &[V] {
        let w = self.value_count_per_key.unwrap_or(0) as usize;
        let start = slot as usize * w;
        &self.values[start..start + w]
    }

    /// Mutable value slice for an already-known slot.
    pub fn values_mut(&mut self, slot: u32) -> &mut [V] {
        let w = self.value_count_per_key.unwrap_or(0) as usize;
        let start = slot as usize * w;
        &mut self.values[start..start + w]
    }

    /// Look up `key`'s value slice directly.
    pub fn get(&self, key: K) -> Option<&[V]> {
        self.find(key).map(|slot| self.values(slot))
    }

    /// Find `key`'s slot, inserting a zero-initialized entry if absent.
    ///
    /// Returns `(slot, is_new)`. The caller applies an initializer to the
    /// value region when `is_new` is true; this function never runs one
    /// itself, matching the tensor store's `Push`/`Pull` contract where the
    /// initializer is supplied by the host optimizer.
    pub fn get_or_init(&mut self, key: K) -> HashMapResult<(u32, bool)> {
        let width = self.width()?;
        if self.bucket_count > 0 {
            let bucket = bucket_of(key.to_u64(), self.bucket_count);
            let mut i = self.first[bucket as usize];
            while i != NIL {
                if self.keys[i as usize] == key {
                    return Ok((i, false));
                }
                i = self.next[i as usize];
            }
        }
        if self.key_count == self.bucket_count {
            self.ensure_capacity()?;
        }
        let bucket = bucket_of(key.to_u64(), self.bucket_count);
        let slot = self.key_count as u32;
        self.keys[slot as usize] = key;
        self.next[slot as usize] = self.first[bucket as usize];
        self.first[bucket as usize] = slot;
        self.key_count += 1;
        let start = slot as usize * width as usize;
        for v in &mut self.values[start..start + width as usize] {
            *v = V::zero();
        }
        Ok((slot, true))
    }

    fn ensure_capacity(&mut self) -> HashMapResult<()> {
        let min_capacity = if self.key_count == 0 {
            1000
        } else {
            self.key_count * 2
        };
        let size = power_of_two_ceil(min_capacity).max(min_capacity);
        self.reserve(size)
    }

    /// Grow the map to hold at least `size` keys, if it does not already.
    pub fn reserve(&mut self, size: u64) -> HashMapResult<()> {
        self.width()?;
        if self.bucket_count >= size {
            return Ok(());
        }
        self.reallocate(size)
    }

    /// Reallocate to exactly `power_of_two_ceil(size)` buckets and rebuild
    /// the chain index. A no-op if `size < key_count`.
    pub fn reallocate(&mut self, size: u64) -> HashMapResult<()> {
        self.width()?;
        if self.key_count > size {
            return Ok(());
        }
        if size == 0 {
            self.deallocate();
            return Ok(());
        }
        let bucket_count = power_of_two_ceil(size);
        if bucket_count > MAX_BUCKETS {
            return Err(HashMapError::CapacityExceeded {
                requested: size,
                buckets: bucket_count,
                limit: MAX_BUCKETS,
            });
        }
        let width = self.value_count_per_key.unwrap() as usize;
        self.keys.resize(bucket_count as usize, K::zero());
        self.values
            .resize(bucket_count as usize * width, V::zero());
        self.next.resize(bucket_count as usize, NIL);
        self.first.resize(bucket_count as usize, NIL);
        self.bucket_count = bucket_count;
        self.build_hash_index();
        Ok(())
    }

    fn deallocate(&mut self) {
        self.keys.clear();
        self.values.clear();
        self.next.clear();
        self.first.clear();
        self.key_count = 0;
        self.bucket_count = 0;
    }

    fn build_hash_index(&mut self) {
        for b in self.first.iter_mut() {
            *b = NIL;
        }
        for i in 0..self.key_count {
            let key = self.keys[i as usize];
            let bucket = bucket_of(key.to_u64(), self.bucket_count);
            self.next[i as usize] = self.first[bucket as usize];
            self.first[bucket as usize] = i as u32;
        }
    }

    /// Zero the key/value counters and rebuild the (now-empty) chain index.
    /// Backing arrays keep their allocated capacity.
    pub fn clear(&mut self) {
        self.key_count = 0;
        self.build_hash_index();
    }

    /// Compacting scan: drop every slot for which `drop_predicate` returns
    /// `true`. Reallocates to the smallest power of two covering the
    /// remaining keys once the scan finishes, if the map actually shrunk.
    pub fn prune<F>(&mut self, mut drop_predicate: F) -> HashMapResult<u64>
    where
        F: FnMut(u32, K, &[V]) -> bool,
    {
        let width = self.width()? as usize;
        let mut write = 0usize;
        for read in 0..self.key_count as usize {
            let key = self.keys[read];
            let drop = {
                let values = &self.values[read * width..(read + 1) * width];
                drop_predicate(read as u32, key, values)
            };
            if !drop {
                if write != read {
                    self.keys[write] = key;
                    let (dst, src) = {
                        let (before, after) = self.values.split_at_mut(read * width);
                        (&mut before[write * width..(write + 1) * width], &after[..width])
                    };
                    dst.copy_from_slice(src);
                }
                write += 1;
            }
        }
        let removed = self.key_count - write as u64;
        if removed > 0 {
            self.key_count = write as u64;
            self.reallocate(self.key_count)?;
        }
        Ok(removed)
    }

    /// Visit every occupied slot in insertion order.
    pub fn each<F: FnMut(u32, K, &[V])>(&self, mut action: F) {
        let width = self.value_count_per_key.unwrap_or(0) as usize;
        for i in 0..self.key_count as usize {
            let key = self.keys[i];
            let values = &self.values[i * width..(i + 1) * width];
            action(i as u32, key, values);
        }
    }

    /// Iterate keys in insertion order.
    pub fn keys_iter(&self) -> impl Iterator<Item = K> + '_ {
        self.keys[..self.key_count as usize].iter().copied()
    }

    /// The live `next` chain array, one entry per occupied slot.
    pub fn next_array(&self) -> &[u32] {
        &self.next[..self.key_count as usize]
    }

    /// The live `first` chain-head array, one entry per bucket.
    pub fn first_array(&self) -> &[u32] {
        &self.first[..self.bucket_count as usize]
    }

    /// Rebuild a map directly from its four serialized arrays, without
    /// re-deriving the chain index. Used by the map file loader once it has
    /// validated the header and widened values as needed.
    pub(crate) fn from_raw_parts(
        keys: Vec<K>,
        values: Vec<V>,
        next: Vec<u32>,
        first: Vec<u32>,
        key_count: u64,
        bucket_count: u64,
        value_count_per_key: u64,
    ) -> Self {
        ArrayHashMap {
            keys,
            values,
            next,
            first,
            key_count,
            bucket_count,
            value_count_per_key: Some(value_count_per_key),
        }
    }
}

impl<K: Element, V: Element> Default for ArrayHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
