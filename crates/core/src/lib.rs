//! Leaf collections shared by the grid engine.
//!
//! - [`BiMap`]: one-to-one map with swap-on-collision writes
//! - [`SparseMatrix`]: `(row, col) -> value` storage with row-level access
//! - [`BiMatrix`]: sparse matrix whose columns are unique across all rows

pub mod bimap;
pub mod bimatrix;
pub mod matrix;

pub use bimap::BiMap;
pub use bimatrix::BiMatrix;
pub use matrix::{MatrixRow, SparseMatrix};
