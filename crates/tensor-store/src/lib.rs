//! Sparse/dense tensor metadata and per-server local storage on top of
//! [`mlps_hashmap::ArrayHashMap`].
//!
//! - [`meta`]: [`meta::TensorMeta`], the declared shape/optimizer wiring and
//!   its JSON checkpoint schema.
//! - [`optimizer`]: the initializer/updater/prune-predicate trait seam —
//!   numerical kernels are out of scope, these are how the host plugs them
//!   in.
//! - [`store`]: [`store::TensorStore`], push/pull/prune over one
//!   `ArrayHashMap` per tensor, each behind its own lock.
//! - [`checkpoint`]: save/load/export/import against
//!   `<dir>/<name>/part-<rank>` + `<dir>/<name>/meta.json`.

pub mod checkpoint;
pub mod error;
pub mod meta;
pub mod optimizer;
pub mod store;

pub use error::{TensorStoreError, TensorStoreResult};
pub use meta::{TensorKind, TensorMeta};
pub use optimizer::{Initializer, PrunePredicate, Updater, ZeroInitializer};
pub use store::TensorStore;

#[cfg(test)]
mod tests {
    use super::*;

    struct FillInitializer(u8);
    impl Initializer for FillInitializer {
        fn initialize(&self, _key: u64, data: &mut [u8], _state: &mut [u8]) {
            data.fill(self.0);
        }
    }
    struct SumUpdater;
    impl Updater for SumUpdater {
        fn update(&self, _key: u64, data: &mut [u8], _state: &mut [u8], values: &[u8]) {
            for (d, v) in data.iter_mut().zip(values) {
                *d = d.wrapping_add(*v);
            }
        }
    }
    struct AbsPredicate;
    impl PrunePredicate for AbsPredicate {
        fn is_small(&self, data: &[u8], epsilon: f64) -> bool {
            data.iter().all(|&b| (b as f64) < epsilon)
        }
        fn age(&self, state: &[u8]) -> u64 {
            state.first().copied().unwrap_or(0) as u64
        }
    }

    fn meta(name: &str) -> TensorMeta {
        TensorMeta {
            name: name.to_string(),
            kind: TensorKind::Sparse,
            data_type: mlps_core::DataType::UInt8,
            data_shape: vec![2],
            state_shape: vec![1],
            initializer: Vec::new(),
            updater: Vec::new(),
            partition_count: 4,
        }
    }

    #[test]
    fn pull_after_push_round_trips_a_single_key() {
        // Mirrors the cross-partition example: push key 5 then pull it back.
        let store = TensorStore::new();
        store.init(meta("embedding")).unwrap();
        store
            .push("embedding", &[5], &[&[3, 4]], false, &FillInitializer(0), &SumUpdater)
            .unwrap();
        let pulled = store.pull("embedding", &[5], true, &FillInitializer(0)).unwrap();
        assert_eq!(pulled[0], vec![3, 4]);
    }

    #[test]
    fn prune_small_drops_near_zero_slots() {
        let store = TensorStore::new();
        store.init(meta("t")).unwrap();
        store
            .push("t", &[1, 2], &[&[0, 0], &[9, 9]], true, &FillInitializer(0), &SumUpdater)
            .unwrap();
        let removed = store.prune_small("t", 1.0, &AbsPredicate).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.key_count("t").unwrap(), 1);
    }

    #[test]
    fn prune_old_drops_slots_past_max_age() {
        struct AgedInitializer(u8);
        impl Initializer for AgedInitializer {
            fn initialize(&self, _key: u64, data: &mut [u8], state: &mut [u8]) {
                data.fill(0);
                state.fill(self.0);
            }
        }

        let store = TensorStore::new();
        store.init(meta("t")).unwrap();
        // key 1 is young, key 2 is old; both created via a non-read-only pull
        // so the initializer stamps their age into the state region.
        store.pull("t", &[1], false, &AgedInitializer(1)).unwrap();
        store.pull("t", &[2], false, &AgedInitializer(99)).unwrap();

        let removed = store.prune_old("t", 10, &AbsPredicate).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.key_count("t").unwrap(), 1);
    }
}
