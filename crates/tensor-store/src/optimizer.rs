//! The optimizer seam: initializers, updaters and prune predicates are
//! numerical kernels owned by the host, not this crate. `TensorMeta` carries
//! only an opaque descriptor blob for each (`initializer`/`updater`); the
//! trait objects below are what the store actually invokes, supplied by the
//! caller on every operation rather than stored alongside the map.

/// Populates a newly-created key's data and state regions. Invoked exactly
/// once per key, the first time it is touched by a non-value `Push` or by a
/// non-`read_only` `Pull`.
pub trait Initializer: Send + Sync {
    fn initialize(&self, key: u64, data: &mut [u8], state: &mut [u8]);
}

/// Applies a gradient (or other update payload) to a key's data region,
/// given its optimizer state.
pub trait Updater: Send + Sync {
    fn update(&self, key: u64, data: &mut [u8], state: &mut [u8], values: &[u8]);
}

/// Supplies the comparisons behind `Prune`. Both are numeric and therefore
/// opaque to the store; it only runs the scan.
pub trait PrunePredicate: Send + Sync {
    /// `prune_small(epsilon)`: true if the data region's L-infinity norm is
    /// below `epsilon`.
    fn is_small(&self, data: &[u8], epsilon: f64) -> bool;

    /// `prune_old(max_age)`: the age recorded in the state region, in
    /// whatever unit the host's `max_age` is expressed in.
    fn age(&self, state: &[u8]) -> u64;
}

/// An initializer that writes nothing, for tensors loaded with `is_value =
/// true` or never expected to see an uninitialized key.
pub struct ZeroInitializer;

impl Initializer for ZeroInitializer {
    fn initialize(&self, _key: u64, _data: &mut [u8], _state: &mut [u8]) {}
}
