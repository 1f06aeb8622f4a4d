//! `IndexBatch`: a `rows x columns` table of parsed, hashed tokens, built by
//! splitting each raw input cell on a configured delimiter set.

use std::collections::HashMap;

use crate::split::split_filter;

/// One parsed token plus its BKDR hash, owned independently of the raw
/// input string (unlike [`crate::split::TokenHash`], which borrows it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedToken {
    pub token: String,
    pub hash: u64,
}

/// A `rows x columns` table of parsed cells.
pub struct IndexBatch {
    column_name_map: HashMap<String, usize>,
    column_names: Vec<String>,
    /// `cells[column][row]`
    cells: Vec<Vec<Vec<OwnedToken>>>,
    rows: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexBatchError {
    #[error("column '{0}' has {1} rows, expected {2}")]
    RowCountMismatch(String, usize, usize),
}

impl IndexBatch {
    /// Build a batch from parallel column name / cell-string vectors.
    /// `columns[c][r]` is the raw string for column `c`, row `r`.
    pub fn from_columns(
        column_names: Vec<String>,
        columns: Vec<Vec<String>>,
        delimiters: &str,
    ) -> Result<IndexBatch, IndexBatchError> {
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (name, col) in column_names.iter().zip(columns.iter()) {
            if col.len() != rows {
                return Err(IndexBatchError::RowCountMismatch(
                    name.clone(),
                    col.len(),
                    rows,
                ));
            }
        }

        let cells: Vec<Vec<Vec<OwnedToken>>> = columns
            .iter()
            .map(|col| {
                col.iter()
                    .map(|raw| {
                        split_filter(raw, delimiters)
                            .into_iter()
                            .map(|t| OwnedToken {
                                token: t.token.to_string(),
                                hash: t.hash,
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();

        let column_name_map = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(IndexBatch {
            column_name_map,
            column_names,
            cells,
            rows,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Tokens for row `i` of `column_name`, or `None` if the column is
    /// unknown or the cell has no surviving tokens (the equivalent of a
    /// missing value for combine purposes).
    pub fn cell(&self, row: usize, column_name: &str) -> Option<&[OwnedToken]> {
        let col = *self.column_name_map.get(column_name)?;
        let tokens = self.cells.get(col)?.get(row)?;
        if tokens.is_empty() {
            None
        } else {
            Some(tokens)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_filters_none() {
        let batch = IndexBatch::from_columns(
            vec!["user".into(), "item".into()],
            vec![
                vec!["u1".into(), "u2 u3".into()],
                vec!["i7".into(), "none".into()],
            ],
            " ",
        )
        .unwrap();
        assert_eq!(batch.rows(), 2);
        let cell = batch.cell(1, "user").unwrap();
        assert_eq!(cell.len(), 2);
        assert_eq!(cell[0].token, "u2");
        assert!(batch.cell(1, "item").is_none());
    }

    #[test]
    fn unknown_column_is_none() {
        let batch =
            IndexBatch::from_columns(vec!["user".into()], vec![vec!["u1".into()]], " ").unwrap();
        assert!(batch.cell(0, "missing").is_none());
    }
}
