//! `HashUniquifier`: dedups a key batch, preserving first-seen order, before
//! it is split across servers. The agent issues one RPC per server per
//! unique key rather than per occurrence, then fans the result back out.

use rustc_hash::FxHashMap;

pub struct HashUniquifier {
    index_of: FxHashMap<u64, u32>,
    unique_keys: Vec<u64>,
}

impl HashUniquifier {
    pub fn new() -> Self {
        HashUniquifier {
            index_of: FxHashMap::default(),
            unique_keys: Vec::new(),
        }
    }

    /// Map each of `keys` to its index in `unique_keys()`, inserting any key
    /// seen for the first time in this or an earlier call.
    pub fn uniquify(&mut self, keys: &[u64]) -> Vec<u32> {
        keys.iter()
            .map(|&key| {
                if let Some(&index) = self.index_of.get(&key) {
                    index
                } else {
                    let index = self.unique_keys.len() as u32;
                    self.unique_keys.push(key);
                    self.index_of.insert(key, index);
                    index
                }
            })
            .collect()
    }

    pub fn unique_keys(&self) -> &[u64] {
        &self.unique_keys
    }

    pub fn clear(&mut self) {
        self.index_of.clear();
        self.unique_keys.clear();
    }
}

impl Default for HashUniquifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_preserving_first_seen_order() {
        let mut uniquifier = HashUniquifier::new();
        let positions = uniquifier.uniquify(&[7, 3, 7, 9, 3]);
        assert_eq!(positions, vec![0, 1, 0, 2, 1]);
        assert_eq!(uniquifier.unique_keys(), &[7, 3, 9]);
    }

    #[test]
    fn accumulates_across_calls() {
        let mut uniquifier = HashUniquifier::new();
        uniquifier.uniquify(&[1, 2]);
        let positions = uniquifier.uniquify(&[2, 3]);
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(uniquifier.unique_keys(), &[1, 2, 3]);
    }
}
