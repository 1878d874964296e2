use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// Rows buffered from one statement execution.
///
/// Native cursors are drained into a `ResultSet` before the handle is released,
/// so a statement never keeps a native borrow alive between calls.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Rows returned, or rows changed when the statement turned out to be DML
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
            column_index: None,
        }
    }

    /// Result of a statement that produced no columns, only a change count.
    #[must_use]
    pub fn affected(rows_affected: usize) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set. Rows added before column names are set are
    /// given an empty name list.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let (names, index) = match (&self.column_names, &self.column_index) {
            (Some(names), Some(index)) => (Arc::clone(names), Arc::clone(index)),
            _ => {
                self.set_column_names(Arc::new(Vec::new()));
                return self.add_row_values(row_values);
            }
        };

        self.results.push(CustomDbRow {
            column_names: names,
            rows: row_values,
            column_index_cache: index,
        });
        self.rows_affected += 1;
    }

    /// Whether the statement produced a column list at all.
    #[must_use]
    pub fn has_columns(&self) -> bool {
        self.column_names.as_ref().is_some_and(|names| !names.is_empty())
    }
}

impl IntoIterator for ResultSet {
    type Item = CustomDbRow;
    type IntoIter = std::vec::IntoIter<CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["id".into(), "name".into()]));
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("a".into())]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("b".into())]);

        assert_eq!(rs.rows_affected, 2);
        assert!(Arc::ptr_eq(
            &rs.results[0].column_names,
            &rs.results[1].column_names
        ));
        assert_eq!(rs.results[1].get("name"), Some(&RowValues::Text("b".into())));
        assert_eq!(rs.results[1].get("NAME"), Some(&RowValues::Text("b".into())));
        assert_eq!(rs.results[0].get("missing"), None);
    }

    #[test]
    fn affected_only_has_no_columns() {
        let rs = ResultSet::affected(3);
        assert!(!rs.has_columns());
        assert_eq!(rs.rows_affected, 3);
        assert!(rs.results.is_empty());
    }
}
