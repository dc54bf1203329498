use super::{sparse_matrix::SparseMatrix, LinearSolveError, LinearSolverBackend};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Default limit on the size of a single dense block
pub const MAX_DENSE_BLOCK_SIZE: usize = 2000;

/// Direct solver for matrices whose sparsity pattern decouples into independent diagonal blocks
///
/// The rows are grouped into the connected components of the matrix graph. Each component is solved by a dense
/// LU decomposition (with partial pivoting); the components are solved in parallel.
#[derive(Clone, Copy, Debug)]
pub struct BlockLuSolver {
    pub max_block_size: usize,
}

impl Default for BlockLuSolver {
    fn default() -> Self {
        Self {
            max_block_size: MAX_DENSE_BLOCK_SIZE,
        }
    }
}

impl BlockLuSolver {
    pub fn new(max_block_size: usize) -> Self {
        Self { max_block_size }
    }
}

impl LinearSolverBackend for BlockLuSolver {
    fn solve(&self, a: &SparseMatrix, b: &[f64]) -> Result<Vec<f64>, LinearSolveError> {
        if a.dimension != b.len() {
            return Err(LinearSolveError::DimensionMismatch {
                matrix: a.dimension,
                rhs: b.len(),
            });
        }

        let blocks = connected_blocks(a);
        if let Some(block) = blocks.iter().find(|block| block.len() > self.max_block_size) {
            return Err(LinearSolveError::ProblemTooLarge {
                size: block.len(),
                max: self.max_block_size,
            });
        }

        // sub-matrix entries sorted by block
        let mut block_entries: Vec<Vec<([usize; 2], f64)>> = vec![Vec::new(); blocks.len()];
        let mut location = vec![(0, 0); a.dimension];
        for (block_idx, rows) in blocks.iter().enumerate() {
            for (local, row) in rows.iter().enumerate() {
                location[*row] = (block_idx, local);
            }
        }
        for ([r, c], v) in a.iter() {
            let (block_idx, local_r) = location[r];
            block_entries[block_idx].push(([local_r, location[c].1], v));
        }

        let block_solutions = blocks
            .par_iter()
            .zip(block_entries.par_iter())
            .enumerate()
            .map(|(block_idx, (rows, entries))| {
                let n = rows.len();
                let mut mat = DMatrix::<f64>::zeros(n, n);
                for ([r, c], v) in entries {
                    mat[(*r, *c)] += v;
                }
                let rhs = DVector::from_iterator(n, rows.iter().map(|row| b[*row]));

                mat.lu()
                    .solve(&rhs)
                    .filter(|x| x.iter().all(|v| v.is_finite()))
                    .ok_or(LinearSolveError::Singular {
                        block: block_idx,
                        first_row: rows[0],
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut x = vec![0.0; a.dimension];
        for (rows, block_x) in blocks.iter().zip(block_solutions) {
            for (row, value) in rows.iter().zip(block_x.iter()) {
                x[*row] = *value;
            }
        }

        Ok(x)
    }
}

/// Groups of rows coupled through the matrix (each sorted; groups ordered by their first row)
fn connected_blocks(a: &SparseMatrix) -> Vec<Vec<usize>> {
    let mut parents: Vec<usize> = (0..a.dimension).collect();

    fn root(parents: &mut [usize], mut i: usize) -> usize {
        while parents[i] != i {
            parents[i] = parents[parents[i]];
            i = parents[i];
        }
        i
    }

    for ([r, c], _) in a.iter() {
        let (root_r, root_c) = (root(&mut parents, r), root(&mut parents, c));
        if root_r != root_c {
            parents[root_r.max(root_c)] = root_r.min(root_c);
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for row in 0..a.dimension {
        let group = root(&mut parents, row);
        groups.entry(group).or_default().push(row);
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_block_matrix() -> SparseMatrix {
        // rows {0, 2} and {1, 3, 4} are coupled
        let mut a = SparseMatrix::new(5);
        a.insert_group(vec![
            ([0, 0], 4.0),
            ([0, 2], 1.0),
            ([2, 0], 2.0),
            ([2, 2], 3.0),
            ([1, 1], 2.0),
            ([1, 4], -1.0),
            ([3, 3], 5.0),
            ([4, 3], 1.0),
            ([4, 4], 2.0),
            ([3, 1], 1.0),
        ]);
        a
    }

    #[test]
    fn finds_independent_blocks() {
        assert_eq!(
            connected_blocks(&two_block_matrix()),
            vec![vec![0, 2], vec![1, 3, 4]]
        );
    }

    #[test]
    fn solves_block_system() {
        let a = two_block_matrix();
        let x_exact = [1.0, -2.0, 0.5, 3.0, 0.25];
        let b = a.mul_vec(&x_exact);

        let x = BlockLuSolver::default().solve(&a, &b).unwrap();
        for (xi, ei) in x.iter().zip(x_exact.iter()) {
            assert!((xi - ei).abs() < 1e-12);
        }
    }

    #[test]
    fn solver_errors() {
        let a = two_block_matrix();
        assert_eq!(
            BlockLuSolver::default().solve(&a, &[1.0; 3]),
            Err(LinearSolveError::DimensionMismatch { matrix: 5, rhs: 3 })
        );
        assert_eq!(
            BlockLuSolver::new(2).solve(&a, &[1.0; 5]),
            Err(LinearSolveError::ProblemTooLarge { size: 3, max: 2 })
        );

        let mut singular = SparseMatrix::new(3);
        singular.insert([0, 0], 1.0);
        singular.insert([2, 2], 1.0);
        assert_eq!(
            BlockLuSolver::default().solve(&singular, &[1.0; 3]),
            Err(LinearSolveError::Singular {
                block: 1,
                first_row: 1
            })
        );
    }
}
