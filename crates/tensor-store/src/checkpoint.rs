//! Save/Load/Export/Import: `<dir>/<name>/part-<rank>` map files plus a
//! sibling `<dir>/<name>/meta.json`.

use std::fs;
use std::path::{Path, PathBuf};

use mlps_hashmap::codec;

use crate::error::TensorStoreResult;
use crate::meta::TensorMeta;
use crate::store::TensorStore;

fn tensor_dir(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

fn part_path(dir: &Path, name: &str, rank: u32) -> PathBuf {
    tensor_dir(dir, name).join(format!("part-{rank}"))
}

fn meta_path(dir: &Path, name: &str) -> PathBuf {
    tensor_dir(dir, name).join("meta.json")
}

fn write_meta(dir: &Path, name: &str, meta: &TensorMeta) -> TensorStoreResult<()> {
    let json = serde_json::to_vec_pretty(meta)?;
    fs::write(meta_path(dir, name), json)?;
    Ok(())
}

fn read_meta(dir: &Path, name: &str) -> TensorStoreResult<TensorMeta> {
    let bytes = fs::read(meta_path(dir, name))?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl TensorStore {
    /// Full checkpoint: map file (data + state) and `meta.json`, overwriting
    /// any existing checkpoint for `name`.
    pub fn save(&self, name: &str, dir: &Path, rank: u32) -> TensorStoreResult<()> {
        fs::create_dir_all(tensor_dir(dir, name))?;
        self.with_entry(name, |meta, map| -> TensorStoreResult<()> {
            let mut file = fs::File::create(part_path(dir, name, rank))?;
            codec::serialize(map, &mut file, None)?;
            write_meta(dir, name, meta)?;
            Ok(())
        })?
    }

    /// Load a full checkpoint, replacing this tensor's map. `keep_meta`
    /// preserves the tensor's current registered `TensorMeta` rather than
    /// restoring the one saved alongside the map file.
    pub fn load(&self, name: &str, dir: &Path, rank: u32, keep_meta: bool) -> TensorStoreResult<()> {
        let mut file = fs::File::open(part_path(dir, name, rank))?;
        let map = codec::deserialize(&mut file)?;
        let meta = if keep_meta {
            self.meta(name)?
        } else {
            read_meta(dir, name)?
        };
        self.replace(name.to_string(), meta, map);
        Ok(())
    }

    /// Data-only checkpoint: narrows the map file to `data_bytes()` per key,
    /// dropping optimizer state.
    pub fn export(&self, name: &str, dir: &Path, rank: u32) -> TensorStoreResult<()> {
        fs::create_dir_all(tensor_dir(dir, name))?;
        self.with_entry(name, |meta, map| -> TensorStoreResult<()> {
            let mut file = fs::File::create(part_path(dir, name, rank))?;
            codec::serialize(map, &mut file, Some(meta.data_bytes()))?;
            write_meta(dir, name, meta)?;
            Ok(())
        })?
    }

    /// Merge an on-disk map file into the live tensor. `data_only` copies
    /// only the data region (the file may be narrower than the live map);
    /// `skip_existing` leaves already-present keys untouched instead of
    /// overwriting them.
    pub fn import(
        &self,
        name: &str,
        dir: &Path,
        rank: u32,
        data_only: bool,
        skip_existing: bool,
    ) -> TensorStoreResult<()> {
        let mut file = fs::File::open(part_path(dir, name, rank))?;
        let loaded = codec::deserialize(&mut file)?;
        self.merge_into(name, &loaded, data_only, skip_existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::TensorKind;
    use crate::optimizer::{Initializer, Updater};
    use mlps_core::DataType;
    use tempfile::tempdir;

    struct OneInitializer;
    impl Initializer for OneInitializer {
        fn initialize(&self, _key: u64, data: &mut [u8], state: &mut [u8]) {
            data.fill(1);
            state.fill(9);
        }
    }
    struct NoopUpdater;
    impl Updater for NoopUpdater {
        fn update(&self, _key: u64, _data: &mut [u8], _state: &mut [u8], _values: &[u8]) {}
    }

    fn meta(name: &str) -> TensorMeta {
        TensorMeta {
            name: name.to_string(),
            kind: TensorKind::Sparse,
            data_type: DataType::UInt8,
            data_shape: vec![2],
            state_shape: vec![1],
            initializer: vec![1],
            updater: vec![2],
            partition_count: 1,
        }
    }

    #[test]
    fn save_then_load_round_trips_data_and_state() {
        let dir = tempdir().unwrap();
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        store.pull("w", &[1, 2], false, &OneInitializer).unwrap();
        store.save("w", dir.path(), 0).unwrap();

        let reloaded = TensorStore::new();
        reloaded.init(meta("w")).unwrap();
        reloaded.load("w", dir.path(), 0, true).unwrap();
        assert_eq!(reloaded.key_count("w").unwrap(), 2);
        let pulled = reloaded.pull("w", &[1], true, &OneInitializer).unwrap();
        assert_eq!(pulled[0], vec![1, 1]);
    }

    #[test]
    fn export_drops_state_and_import_merges_data_only() {
        let dir = tempdir().unwrap();
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        store.pull("w", &[5], false, &OneInitializer).unwrap();
        store.export("w", dir.path(), 0).unwrap();

        let target = TensorStore::new();
        target.init(meta("w")).unwrap();
        target.push("w", &[5], &[&[0, 0]], true, &OneInitializer, &NoopUpdater).unwrap();
        target.import("w", dir.path(), 0, true, false).unwrap();
        let pulled = target.pull("w", &[5], true, &OneInitializer).unwrap();
        assert_eq!(pulled[0], vec![1, 1]);
    }

    #[test]
    fn import_with_skip_existing_leaves_present_keys_untouched() {
        let dir = tempdir().unwrap();
        let store = TensorStore::new();
        store.init(meta("w")).unwrap();
        store.push("w", &[1], &[&[7, 7]], true, &OneInitializer, &NoopUpdater).unwrap();
        store.save("w", dir.path(), 0).unwrap();

        let target = TensorStore::new();
        target.init(meta("w")).unwrap();
        target.push("w", &[1], &[&[3, 3]], true, &OneInitializer, &NoopUpdater).unwrap();
        target.import("w", dir.path(), 0, false, true).unwrap();
        let pulled = target.pull("w", &[1], true, &OneInitializer).unwrap();
        assert_eq!(pulled[0], vec![3, 3]);
    }
}
