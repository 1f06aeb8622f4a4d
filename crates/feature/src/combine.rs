//! Cartesian-product feature combination: turn one combine group's column
//! cells for a row into the sequence of fingerprints for that row/group.

use crate::hash::{concat, field};
use crate::index_batch::OwnedToken;

/// Combine `k` columns' token lists into the cartesian product of
/// fingerprints, appending them to `out`. `names[i]`/`name_hashes[i]`
/// describe column `i`'s alias; `cells[i]` is that column's surviving
/// tokens for the current row.
///
/// Uses a two-sweep algorithm that precomputes forward/backward strides so
/// each output slot is written exactly once and the inner loops stay
/// branch-predictable, mirroring the reference combine implementation.
pub fn combine_one_feature(cells: &[&[OwnedToken]], name_hashes: &[u64], out: &mut Vec<u64>) {
    debug_assert_eq!(cells.len(), name_hashes.len());
    let total_results: usize = cells.iter().map(|c| c.len()).product();
    if total_results == 0 || cells.is_empty() {
        return;
    }

    if total_results == 1 {
        let mut h = field(name_hashes[0], cells[0][0].hash);
        for i in 1..cells.len() {
            h = concat(h, name_hashes[i], cells[i][0].hash);
        }
        out.push(h);
        return;
    }

    if cells.len() == 1 {
        for item in cells[0] {
            out.push(field(name_hashes[0], item.hash));
        }
        return;
    }

    let n = cells.len();
    let mut fwd = vec![1usize; n];
    for i in 1..n {
        fwd[i] = fwd[i - 1] * cells[i - 1].len();
    }
    let mut bwd = vec![1usize; n];
    for i in (0..n - 1).rev() {
        bwd[i] = bwd[i + 1] * cells[i + 1].len();
    }

    let begin = out.len();
    out.resize(begin + total_results, 0);
    let result = &mut out[begin..];

    let loops = fwd[0];
    let each_repeat = bwd[0];
    let split = cells[0];
    for l in 0..loops {
        let mut base = l * split.len() * each_repeat;
        for item in split {
            let h = field(name_hashes[0], item.hash);
            for r in result.iter_mut().skip(base).take(each_repeat) {
                *r = h;
            }
            base += each_repeat;
        }
    }

    for i in 1..n {
        let loops = fwd[i];
        let each_repeat = bwd[i];
        let split = cells[i];
        for l in 0..loops {
            let mut base = l * split.len() * each_repeat;
            for item in split {
                for r in result.iter_mut().skip(base).take(each_repeat) {
                    *r = concat(*r, name_hashes[i], item.hash);
                }
                base += each_repeat;
            }
        }
    }
}
