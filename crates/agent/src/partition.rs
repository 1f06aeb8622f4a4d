//! Partition routing: a sparse tensor's keys are owned by server `k mod N`.

use std::collections::HashMap;

/// Bucket `keys` by `key mod partition_count`, keeping each key's original
/// index so the caller can scatter a request per partition and later
/// reassemble the replies back into input order.
pub fn bucket_by_partition(keys: &[u64], partition_count: u32) -> HashMap<u32, Vec<(usize, u64)>> {
    let mut buckets: HashMap<u32, Vec<(usize, u64)>> = HashMap::new();
    for (index, &key) in keys.iter().enumerate() {
        let partition = (key % partition_count as u64) as u32;
        buckets.entry(partition).or_default().push((index, key));
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_cover_every_key_with_no_duplicates() {
        let keys = vec![5u64, 9, 2, 13, 4];
        let buckets = bucket_by_partition(&keys, 4);
        let total: usize = buckets.values().map(|v| v.len()).sum();
        assert_eq!(total, keys.len());
        let partition_one: Vec<u64> = buckets.get(&1).unwrap().iter().map(|&(_, k)| k).collect();
        assert_eq!(partition_one, vec![5, 9, 13]);
    }

    #[test]
    fn single_partition_keeps_everything_in_bucket_zero() {
        let keys = vec![1u64, 2, 3];
        let buckets = bucket_by_partition(&keys, 1);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[&0].len(), 3);
    }
}
