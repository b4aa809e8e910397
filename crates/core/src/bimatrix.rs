//! Sparse matrix with a column-uniqueness index.
//!
//! Each column may appear in at most one row. The first row to claim a
//! column keeps it; later inserts for that column are ignored. The reverse
//! index answers "which row owns this column" in O(1).

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::matrix::{MatrixRow, SparseMatrix};

#[derive(Debug, Clone)]
pub struct BiMatrix<R, C, V> {
    matrix: SparseMatrix<R, C, V>,
    owner: FxHashMap<C, R>,
}

impl<R, C, V> Default for BiMatrix<R, C, V> {
    fn default() -> Self {
        Self {
            matrix: SparseMatrix::default(),
            owner: FxHashMap::default(),
        }
    }
}

impl<R, C, V> BiMatrix<R, C, V>
where
    R: Eq + Hash + Clone,
    C: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless `col` is already owned by some row. Returns whether the
    /// value was stored.
    pub fn insert(&mut self, row: R, col: C, value: V) -> bool {
        if self.owner.contains_key(&col) {
            return false;
        }
        self.owner.insert(col.clone(), row.clone());
        self.matrix.insert(row, col, value);
        true
    }

    pub fn get(&self, row: &R, col: &C) -> Option<&V> {
        self.matrix.get(row, col)
    }

    pub fn owner_of(&self, col: &C) -> Option<&R> {
        self.owner.get(col)
    }

    pub fn row(&self, row: &R) -> Option<&MatrixRow<C, V>> {
        self.matrix.row(row)
    }

    pub fn remove(&mut self, row: &R, col: &C) -> Option<V> {
        let removed = self.matrix.remove(row, col);
        if removed.is_some() {
            self.owner.remove(col);
        }
        removed
    }

    /// Remove `col` from whichever row owns it.
    pub fn remove_reverse(&mut self, col: &C) -> Option<V> {
        let row = self.owner.get(col)?.clone();
        self.remove(&row, col)
    }

    /// Detach a whole row, releasing every column it owned.
    pub fn remove_row(&mut self, row: &R) -> Option<MatrixRow<C, V>> {
        let cells = self.matrix.remove_row(row)?;
        for col in cells.keys() {
            self.owner.remove(col);
        }
        Some(cells)
    }

    pub fn clear(&mut self) {
        self.matrix.clear();
        self.owner.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }
}
