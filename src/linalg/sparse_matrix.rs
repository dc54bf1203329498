use rayon::prelude::*;
use std::collections::BTreeMap;

/// Wrapper around a BTreeMap to store square matrices in a sparse data structure
///
/// Entries are ordered by row, then column. Inserting at an existing location accumulates.
#[derive(Clone, Debug, Default)]
pub struct SparseMatrix {
    /// Size of the square matrix
    pub dimension: usize,
    /// Matrix Entries
    entries: BTreeMap<[u32; 2], f64>,
}

impl SparseMatrix {
    pub fn new(dimension: usize) -> Self {
        assert!(
            dimension <= (u32::MAX as usize),
            "Matrix Dimension cannot exceed the size of a u32!"
        );

        Self {
            dimension,
            entries: BTreeMap::new(),
        }
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    fn coordinates(&self, [row_idx, col_idx]: [usize; 2]) -> [u32; 2] {
        assert!(
            row_idx < self.dimension,
            "row_idx exceeded matrix dimension; cannot insert value!"
        );
        assert!(
            col_idx < self.dimension,
            "col_idx exceeded matrix dimension; cannot insert value!"
        );

        // dimension fits in a u32
        [row_idx as u32, col_idx as u32]
    }

    /// Add a value to the entry at `[row, col]`
    pub fn insert(&mut self, location: [usize; 2], value: f64) {
        let coordinates = self.coordinates(location);
        *self.entries.entry(coordinates).or_insert(0.0) += value;
    }

    /// Insert a group of entries
    pub fn insert_group(&mut self, entry_group: Vec<([usize; 2], f64)>) {
        for (location, value) in entry_group {
            self.insert(location, value);
        }
    }

    /// The value at `[row, col]` (zero if no entry is stored)
    pub fn get(&self, location: [usize; 2]) -> f64 {
        let coordinates = self.coordinates(location);
        self.entries.get(&coordinates).copied().unwrap_or(0.0)
    }

    // Remove the entries from the matrix, replacing them with an empty BTreeMap.
    fn take_entries(&mut self) -> BTreeMap<[u32; 2], f64> {
        std::mem::take(&mut self.entries)
    }

    /// Consume the entries from another sparse matrix leaving it empty.
    pub fn consume_matrix(&mut self, other: &mut Self) {
        assert!(
            self.dimension == other.dimension,
            "Sparse Matrices have different dimensions; cannot consume matrix!"
        );

        for (coordinates, value) in other.take_entries() {
            *self.entries.entry(coordinates).or_insert(0.0) += value;
        }
    }

    /// Iterate over the stored entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = ([usize; 2], f64)> + '_ {
        self.entries
            .iter()
            .map(|(coords, value)| ([coords[0] as usize, coords[1] as usize], *value))
    }

    /// Matrix-vector product
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.dimension, "Vector length must match the Matrix dimension!");

        let mut y = vec![0.0; self.dimension];
        for ([r, c], v) in self.iter() {
            y[r] += v * x[c];
        }
        y
    }
}

impl ParallelExtend<SparseMatrix> for SparseMatrix {
    /// Accumulate sub-matrices computed in parallel (in the order they are produced by the iterator)
    fn par_extend<I>(&mut self, sub_matrices: I)
    where
        I: IntoParallelIterator<Item = SparseMatrix>,
    {
        let mut sub_matrices: Vec<SparseMatrix> = sub_matrices.into_par_iter().collect();
        for sub_matrix in sub_matrices.iter_mut() {
            self.consume_matrix(sub_matrix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_insertion() {
        let mut sm = SparseMatrix::new(10);

        sm.insert([0, 0], 1.0);
        sm.insert([0, 0], 1.0);
        sm.insert([9, 9], 10.0);
        sm.insert([4, 3], 0.25);
        sm.insert([0, 8], 0.125);
        sm.insert_group(vec![([8, 0], 0.5), ([0, 8], 0.125)]);

        assert!((sm.get([0, 0]) - 2.0).abs() < 1e-15);
        assert!((sm.get([9, 9]) - 10.0).abs() < 1e-15);
        assert!((sm.get([4, 3]) - 0.25).abs() < 1e-15);
        assert!((sm.get([0, 8]) - 0.25).abs() < 1e-15);
        assert!((sm.get([8, 0]) - 0.5).abs() < 1e-15);
        assert_eq!(sm.get([3, 4]), 0.0);
        assert_eq!(sm.num_entries(), 5);
    }

    #[test]
    fn consume_another_matrix() {
        let mut sm_a = SparseMatrix::new(5);
        let mut sm_b = SparseMatrix::new(5);

        for i in 0..5 {
            sm_a.insert([i, i], (i + 1) as f64);
            sm_b.insert([i, i], (5 - i) as f64);
        }
        sm_a.insert([0, 4], 0.5);
        sm_b.insert([0, 4], -0.5);
        sm_b.insert([2, 3], -0.5);

        sm_a.consume_matrix(&mut sm_b);

        assert_eq!(sm_b.num_entries(), 0);
        for i in 0..5 {
            assert!((sm_a.get([i, i]) - 6.0).abs() < 1e-15);
        }
        assert!(sm_a.get([0, 4]).abs() < 1e-15);
        assert!((sm_a.get([2, 3]) + 0.5).abs() < 1e-15);
    }

    #[test]
    fn parallel_extension_and_product() {
        let mut sm = SparseMatrix::new(4);
        sm.par_extend((0..4).into_par_iter().map(|i| {
            let mut sub = SparseMatrix::new(4);
            sub.insert([i, i], 2.0);
            sub.insert([i, (i + 1) % 4], -1.0);
            sub
        }));

        assert_eq!(sm.num_entries(), 8);
        assert_eq!(sm.mul_vec(&[1.0, 2.0, 3.0, 4.0]), vec![0.0, 1.0, 2.0, 7.0]);
    }

    #[test]
    #[should_panic]
    fn consume_matrix_of_different_dim() {
        let mut sm_a = SparseMatrix::new(5);
        let mut sm_b = SparseMatrix::new(6);

        sm_a.consume_matrix(&mut sm_b);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_insertion() {
        let mut sm = SparseMatrix::new(10);
        sm.insert([10, 2], 1.0);
    }
}
