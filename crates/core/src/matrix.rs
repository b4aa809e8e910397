//! Sparse two-dimensional storage.
//!
//! Rows are created on first insert and dropped when their last cell is
//! removed through [`SparseMatrix::remove`]. Whole rows can also be inserted
//! or detached directly, including empty ones: an empty row still counts as
//! present for [`SparseMatrix::contains_row`].

use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One row of a [`SparseMatrix`]: column -> value.
pub type MatrixRow<C, V> = FxHashMap<C, V>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "R: Serialize + Eq + Hash, C: Serialize + Eq + Hash, V: Serialize",
    deserialize = "R: Deserialize<'de> + Eq + Hash, C: Deserialize<'de> + Eq + Hash, V: Deserialize<'de>"
))]
pub struct SparseMatrix<R, C, V> {
    rows: FxHashMap<R, MatrixRow<C, V>>,
}

impl<R, C, V> Default for SparseMatrix<R, C, V> {
    fn default() -> Self {
        Self {
            rows: FxHashMap::default(),
        }
    }
}

impl<R, C, V> SparseMatrix<R, C, V>
where
    R: Eq + Hash + Clone,
    C: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row: R, col: C, value: V) -> Option<V> {
        self.rows.entry(row).or_default().insert(col, value)
    }

    pub fn get(&self, row: &R, col: &C) -> Option<&V> {
        self.rows.get(row)?.get(col)
    }

    pub fn get_mut(&mut self, row: &R, col: &C) -> Option<&mut V> {
        self.rows.get_mut(row)?.get_mut(col)
    }

    /// Remove a single cell; the row goes away with its last cell.
    pub fn remove(&mut self, row: &R, col: &C) -> Option<V> {
        let cells = self.rows.get_mut(row)?;
        let removed = cells.remove(col);
        if cells.is_empty() {
            self.rows.remove(row);
        }
        removed
    }

    /// Replace a whole row, returning the previous one.
    pub fn insert_row(&mut self, row: R, cells: MatrixRow<C, V>) -> Option<MatrixRow<C, V>> {
        self.rows.insert(row, cells)
    }

    pub fn row(&self, row: &R) -> Option<&MatrixRow<C, V>> {
        self.rows.get(row)
    }

    pub fn row_mut(&mut self, row: &R) -> Option<&mut MatrixRow<C, V>> {
        self.rows.get_mut(row)
    }

    /// Row for `row`, created empty if missing.
    pub fn row_or_insert(&mut self, row: R) -> &mut MatrixRow<C, V> {
        self.rows.entry(row).or_default()
    }

    pub fn remove_row(&mut self, row: &R) -> Option<MatrixRow<C, V>> {
        self.rows.remove(row)
    }

    pub fn contains_row(&self, row: &R) -> bool {
        self.rows.contains_key(row)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Row keys, in no particular order.
    pub fn row_keys(&self) -> impl Iterator<Item = &R> {
        self.rows.keys()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&R, &MatrixRow<C, V>)> {
        self.rows.iter()
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = (&R, &mut MatrixRow<C, V>)> {
        self.rows.iter_mut()
    }

    /// Every cell as `(row, col, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&R, &C, &V)> {
        self.rows
            .iter()
            .flat_map(|(r, cells)| cells.iter().map(move |(c, v)| (r, c, v)))
    }

    pub fn iter_row<'a>(&'a self, row: &R) -> impl Iterator<Item = (&'a C, &'a V)> + 'a {
        self.rows.get(row).into_iter().flat_map(|cells| cells.iter())
    }

    /// Keep only the rows for which `keep` returns true. `keep` may also
    /// prune the row in place; rows it leaves empty are dropped too.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&R, &mut MatrixRow<C, V>) -> bool,
    {
        self.rows.retain(|r, cells| keep(r, cells) && !cells.is_empty());
    }
}
