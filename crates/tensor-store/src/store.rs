//! `TensorStore`: the server-side owner of one `ArrayHashMap<u64, u8>` per
//! local tensor partition, guarded by a per-tensor lock (§5's shared-resource
//! policy — `ArrayHashMap` itself is never synchronized).

use dashmap::DashMap;
use mlps_hashmap::ArrayHashMap;
use parking_lot::Mutex;

use crate::error::{TensorStoreError, TensorStoreResult};
use crate::meta::TensorMeta;
use crate::optimizer::{Initializer, PrunePredicate, Updater};

struct TensorEntry {
    meta: TensorMeta,
    map: ArrayHashMap<u64, u8>,
}

/// All tensor partitions a single server process holds, keyed by tensor
/// name. Each tensor is independently locked so a pull against one tensor
/// never blocks a push against another.
pub struct TensorStore {
    tensors: DashMap<String, Mutex<TensorEntry>>,
}

impl TensorStore {
    pub fn new() -> Self {
        TensorStore {
            tensors: DashMap::new(),
        }
    }

    /// Coordinator-issued allocation: register `meta` and create an empty
    /// map sized for `meta.value_width_bytes()` bytes per key.
    pub fn init(&self, meta: TensorMeta) -> TensorStoreResult<()> {
        if self.tensors.contains_key(&meta.name) {
            return Err(TensorStoreError::AlreadyExists(meta.name));
        }
        let width = meta.value_width_bytes();
        let map = ArrayHashMap::with_value_width(width);
        self.tensors.insert(meta.name.clone(), Mutex::new(TensorEntry { meta, map }));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn meta(&self, name: &str) -> TensorStoreResult<TensorMeta> {
        let entry = self.entry(name)?;
        Ok(entry.lock().meta.clone())
    }

    fn entry(&self, name: &str) -> TensorStoreResult<dashmap::mapref::one::Ref<'_, String, Mutex<TensorEntry>>> {
        self.tensors
            .get(name)
            .ok_or_else(|| TensorStoreError::UnknownTensor(name.to_string()))
    }

    /// `Push(keys, values, is_value)`. `values` is one chunk per key, each
    /// `data_bytes()` wide. When `is_value`, the chunk replaces the data
    /// region verbatim (used on load); otherwise it is a gradient applied
    /// through `updater`, and a freshly-created key is initialized first.
    pub fn push(
        &self,
        name: &str,
        keys: &[u64],
        values: &[&[u8]],
        is_value: bool,
        initializer: &dyn Initializer,
        updater: &dyn Updater,
    ) -> TensorStoreResult<()> {
        if keys.len() != values.len() {
            return Err(TensorStoreError::BatchLengthMismatch(keys.len(), values.len()));
        }
        let entry = self.entry(name)?;
        let mut entry = entry.lock();
        let data_len = entry.meta.data_bytes() as usize;
        for (&key, &chunk) in keys.iter().zip(values.iter()) {
            if chunk.len() != data_len {
                return Err(TensorStoreError::ValueWidthMismatch {
                    key,
                    found: chunk.len(),
                    expected: data_len,
                });
            }
            let (slot, is_new) = entry.map.get_or_init(key)?;
            let slice = entry.map.values_mut(slot);
            let (data, state) = slice.split_at_mut(data_len);
            if is_new && !is_value {
                initializer.initialize(key, data, state);
            }
            if is_value {
                data.copy_from_slice(chunk);
            } else {
                updater.update(key, data, state, chunk);
            }
        }
        Ok(())
    }

    /// `Pull(keys, read_only)`. Returns one `data_bytes()`-wide chunk per
    /// key, in the same order. Missing keys are zero-filled when
    /// `read_only`; otherwise they are created and initialized first (but
    /// never updated).
    pub fn pull(
        &self,
        name: &str,
        keys: &[u64],
        read_only: bool,
        initializer: &dyn Initializer,
    ) -> TensorStoreResult<Vec<Vec<u8>>> {
        let entry = self.entry(name)?;
        let mut entry = entry.lock();
        let data_len = entry.meta.data_bytes() as usize;
        let mut out = Vec::with_capacity(keys.len());
        for &key in keys {
            match entry.map.find(key) {
                Some(slot) => out.push(entry.map.values(slot)[..data_len].to_vec()),
                None if read_only => out.push(vec![0u8; data_len]),
                None => {
                    let (slot, _) = entry.map.get_or_init(key)?;
                    let slice = entry.map.values_mut(slot);
                    let (data, state) = slice.split_at_mut(data_len);
                    initializer.initialize(key, data, state);
                    out.push(data.to_vec());
                }
            }
        }
        Ok(out)
    }

    /// Drop slots whose data region is small under `predicate`.
    pub fn prune_small(&self, name: &str, epsilon: f64, predicate: &dyn PrunePredicate) -> TensorStoreResult<u64> {
        let entry = self.entry(name)?;
        let mut entry = entry.lock();
        let data_len = entry.meta.data_bytes() as usize;
        let removed = entry.map.prune(|_, _, v| predicate.is_small(&v[..data_len], epsilon))?;
        Ok(removed)
    }

    /// Drop slots whose state-region age exceeds `max_age`.
    pub fn prune_old(&self, name: &str, max_age: u64, predicate: &dyn PrunePredicate) -> TensorStoreResult<u64> {
        let entry = self.entry(name)?;
        let mut entry = entry.lock();
        let data_len = entry.meta.data_bytes() as usize;
        let removed = entry.map.prune(|_, _, v| predicate.age(&v[data_len..]) > max_age)?;
        Ok(removed)
    }

    pub fn key_count(&self, name: &str) -> TensorStoreResult<u64> {
        Ok(self.entry(name)?.lock().map.key_count())
    }

    pub(crate) fn with_entry<R>(&self, name: &str, f: impl FnOnce(&TensorMeta, &ArrayHashMap<u64, u8>) -> R) -> TensorStoreResult<R> {
        let entry = self.entry(name)?;
        let entry = entry.lock();
        Ok(f(&entry.meta, &entry.map))
    }

    pub(crate) fn replace(&self, name: String, meta: TensorMeta, map: ArrayHashMap<u64, u8>) {
        self.tensors.insert(name, Mutex::new(TensorEntry { meta, map }));
    }

    pub(crate) fn merge_into(
        &self,
        name: &str,
        loaded: &ArrayHashMap<u64, u8>,
        data_only: bool,
        skip_existing: bool,
    ) -> TensorStoreResult<()> {
        let entry = self.entry(name)?;
        let mut entry = entry.lock();
        let data_len = entry.meta.data_bytes() as usize;
        let mut updates = Vec::new();
        loaded.each(|_, key, values| {
            updates.push((key, values.to_vec()));
        });
        for (key, values) in updates {
            if skip_existing && entry.map.find(key).is_some() {
                continue;
            }
            let (slot, _) = entry.map.get_or_init(key)?;
            let slice = entry.map.values_mut(slot);
            if data_only {
                slice[..data_len].copy_from_slice(&values[..data_len]);
            } else {
                let width = slice.len().min(values.len());
                slice[..width].copy_from_slice(&values[..width]);
            }
        }
        Ok(())
    }
}

impl Default for TensorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::TensorKind;
    use mlps_core::DataType;

    struct OneInitializer;
    impl Initializer for OneInitializer {
        fn initialize(&self, _key: u64, data: &mut [u8], state: &mut [u8]) {
            data.fill(1);
            state.fill(0);
        }
    }

    struct AddUpdater;
    impl Updater for AddUpdater {
        fn update(&self, _key: u64, data: &mut [u8], _state: &mut [u8], values: &[u8]) {
            for (d, v) in data.iter_mut().zip(values) {
                *d = d.wrapping_add(*v);
            }
        }
    }

    fn meta(name: &str) -> TensorMeta {
        TensorMeta {
            name: name.to_string(),
            kind: TensorKind::Sparse,
            data_type: DataType::UInt8,
            data_shape: vec![4],
            state_shape: vec![2],
            initializer: Vec::new(),
            updater: Vec::new(),
            partition_count: 4,
        }
    }

    #[test]
    fn push_initializes_new_keys_then_applies_updater() {
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        let values: [&[u8]; 1] = [&[5, 5, 5, 5]];
        store.push("w", &[7], &values, false, &OneInitializer, &AddUpdater).unwrap();
        let pulled = store.pull("w", &[7], true, &OneInitializer).unwrap();
        assert_eq!(pulled[0], vec![6, 6, 6, 6]);
    }

    #[test]
    fn pull_read_only_zero_fills_missing_keys() {
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        let pulled = store.pull("w", &[1, 2], true, &OneInitializer).unwrap();
        assert_eq!(pulled, vec![vec![0, 0, 0, 0], vec![0, 0, 0, 0]]);
        assert_eq!(store.key_count("w").unwrap(), 0);
    }

    #[test]
    fn pull_non_read_only_materializes_missing_keys() {
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        let pulled = store.pull("w", &[3], false, &OneInitializer).unwrap();
        assert_eq!(pulled[0], vec![1, 1, 1, 1]);
        assert_eq!(store.key_count("w").unwrap(), 1);
    }

    #[test]
    fn push_is_value_replaces_data_region_verbatim() {
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        let values: [&[u8]; 1] = [&[9, 9, 9, 9]];
        store.push("w", &[1], &values, true, &OneInitializer, &AddUpdater).unwrap();
        let pulled = store.pull("w", &[1], true, &OneInitializer).unwrap();
        assert_eq!(pulled[0], vec![9, 9, 9, 9]);
    }

    #[test]
    fn operations_on_unknown_tensor_fail() {
        let store = TensorStore::new();
        assert!(matches!(
            store.pull("missing", &[1], true, &OneInitializer),
            Err(TensorStoreError::UnknownTensor(_))
        ));
    }

    #[test]
    fn double_init_is_rejected() {
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        assert!(matches!(store.init(meta("w")), Err(TensorStoreError::AlreadyExists(_))));
    }
}
