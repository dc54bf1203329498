/// Dense LU decomposition of independent diagonal blocks
pub mod block_lu;
/// Sparsely Packed Matrix
pub mod sparse_matrix;

use sparse_matrix::SparseMatrix;
use thiserror::Error;

/// Solves `A x = b` for the Newton updates
pub trait LinearSolverBackend: Sync {
    fn solve(&self, a: &SparseMatrix, b: &[f64]) -> Result<Vec<f64>, LinearSolveError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinearSolveError {
    #[error("Matrix block {block} (starting at row {first_row}) is singular; Cannot Solve!")]
    Singular { block: usize, first_row: usize },
    #[error("Matrix block of size {size} exceeded the maximum dense size ({max}x{max}); Cannot Solve!")]
    ProblemTooLarge { size: usize, max: usize },
    #[error("Matrix dimension ({matrix}) does not match the right hand side length ({rhs}); Cannot Solve!")]
    DimensionMismatch { matrix: usize, rhs: usize },
}

/// Euclidean norm
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
