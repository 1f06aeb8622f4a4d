//! `CombineSchema`: the compiled form of a combine-schema text file — an
//! ordered list of combine groups, each a sequence of `(column_name, alias)`
//! pairs with a precomputed `name_hash` per alias.

use std::collections::HashMap;

use crate::combine::combine_one_feature;
use crate::hash::bkdr_hash_with_equal_postfix;
use crate::index_batch::IndexBatch;

struct CombineGroup {
    columns: Vec<String>,
    alias_hashes: Vec<u64>,
}

/// Compiled combine schema: column name map plus ordered combine groups.
#[derive(Default)]
pub struct CombineSchema {
    column_name_map: HashMap<String, i32>,
    groups: Vec<CombineGroup>,
}

impl CombineSchema {
    pub fn new() -> Self {
        CombineSchema::default()
    }

    /// Number of combine groups (the feature count of one row).
    pub fn feature_count(&self) -> usize {
        self.groups.len()
    }

    pub fn column_name_map(&self) -> &HashMap<String, i32> {
        &self.column_name_map
    }

    /// Load a column-name-map file: one `[index] name[@column_name]` entry
    /// per line; `#`-prefixed lines are comments. A bare `name` without an
    /// explicit index is assigned the line's position.
    pub fn load_column_names_from_str(&mut self, source: &str) {
        self.column_name_map.clear();
        let mut auto_index = 0i32;
        for line in source.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.splitn(2, ' ').collect();
            let (index, name) = if parts.len() == 2 {
                (parts[0].parse::<i32>().unwrap_or(auto_index), parts[1])
            } else {
                (auto_index, parts[0])
            };
            let col_name = match name.split_once('@') {
                Some((_, col)) => col,
                None => name,
            };
            self.column_name_map.insert(col_name.to_string(), index);
            auto_index += 1;
        }
    }

    /// Load a combine-schema file: one `col1[@alias1]#col2[@alias2]#...`
    /// group per line; `#`-prefixed lines are comments.
    pub fn load_combine_schema_from_str(&mut self, source: &str) {
        self.groups.clear();
        for line in source.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut columns = Vec::new();
            let mut alias_hashes = Vec::new();
            for part in line.split('#') {
                let (col, alias) = match part.split_once('@') {
                    Some((col, alias)) => (col, alias),
                    None => (part, part),
                };
                columns.push(col.to_string());
                alias_hashes.push(bkdr_hash_with_equal_postfix(alias));
            }
            self.groups.push(CombineGroup {
                columns,
                alias_hashes,
            });
        }
    }

    /// Compute feature fingerprints for every row of `batch`.
    ///
    /// When `feature_offset` is `false`, `offsets` has one entry per row
    /// (group boundaries within a row are not distinguished). When `true`,
    /// `offsets` has one entry per `(row, group)` pair.
    pub fn combine_to_indices_and_offsets(
        &self,
        batch: &IndexBatch,
        feature_offset: bool,
    ) -> (Vec<u64>, Vec<u64>) {
        let rows = batch.rows();
        let feature_count = self.feature_count();
        let offsets_per_row = if feature_offset { feature_count } else { 1 };
        let mut indices = Vec::with_capacity(rows * feature_count * 4);
        let mut offsets = Vec::with_capacity(rows * offsets_per_row);

        for i in 0..rows {
            if !feature_offset {
                offsets.push(indices.len() as u64);
            }
            for group in &self.groups {
                if feature_offset {
                    offsets.push(indices.len() as u64);
                }
                let mut cells = Vec::with_capacity(group.columns.len());
                let mut has_missing = false;
                for col in &group.columns {
                    match batch.cell(i, col) {
                        Some(tokens) => cells.push(tokens),
                        None => {
                            tracing::trace!(row = i, column = col, "missing column cell, group skipped");
                            has_missing = true;
                            break;
                        }
                    }
                }
                if !has_missing {
                    combine_one_feature(&cells, &group.alias_hashes, &mut indices);
                }
            }
        }

        (indices, offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_group_single_token_fingerprint() {
        let mut schema = CombineSchema::new();
        schema.load_combine_schema_from_str("user#item\n");
        let batch = IndexBatch::from_columns(
            vec!["user".into(), "item".into()],
            vec![vec!["u1".into()], vec!["i7".into()]],
            " ",
        )
        .unwrap();
        let (indices, offsets) = schema.combine_to_indices_and_offsets(&batch, false);
        let expected =
            crate::hash::compute_feature_hash(&[("user", "u1"), ("item", "i7")]).unwrap();
        assert_eq!(indices, vec![expected]);
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn cartesian_group_length() {
        let mut schema = CombineSchema::new();
        schema.load_combine_schema_from_str("user#item\n");
        let batch = IndexBatch::from_columns(
            vec!["user".into(), "item".into()],
            vec![vec!["u1 u2".into()], vec!["i7".into()]],
            " ",
        )
        .unwrap();
        let (indices, _offsets) = schema.combine_to_indices_and_offsets(&batch, false);
        assert_eq!(indices.len(), 2);
    }

    #[test]
    fn feature_offset_per_group() {
        let mut schema = CombineSchema::new();
        schema.load_combine_schema_from_str("user\nitem\n");
        let batch = IndexBatch::from_columns(
            vec!["user".into(), "item".into()],
            vec![vec!["u1".into()], vec!["i7".into()]],
            " ",
        )
        .unwrap();
        let (_indices, offsets) = schema.combine_to_indices_and_offsets(&batch, true);
        assert_eq!(offsets.len(), 1 /* row */ * 2 /* groups */);
    }

    #[test]
    fn column_name_map_round_trips_explicit_and_auto_indices() {
        let mut schema = CombineSchema::new();
        schema.load_column_names_from_str("0 user\n# comment\nitem@raw_item\nclicked\n");
        let map = schema.column_name_map();
        assert_eq!(map.get("user"), Some(&0));
        // `item@raw_item`: stored under the column name after `@`, auto-indexed.
        assert_eq!(map.get("raw_item"), Some(&1));
        assert_eq!(map.get("clicked"), Some(&2));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn missing_column_yields_no_outputs_for_that_group() {
        let mut schema = CombineSchema::new();
        schema.load_combine_schema_from_str("user#item\n");
        let batch = IndexBatch::from_columns(
            vec!["user".into(), "item".into()],
            vec![vec!["u1".into()], vec!["none".into()]],
            " ",
        )
        .unwrap();
        let (indices, _offsets) = schema.combine_to_indices_and_offsets(&batch, false);
        assert!(indices.is_empty());
    }
}
