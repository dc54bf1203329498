use nalgebra::{DMatrix, SymmetricEigen};

/// Gauss-Legendre points and weights over [-1, 1] (sorted by point)
///
/// Computed with the Golub-Welsch algorithm: the points are the eigenvalues of the symmetric tridiagonal Jacobi matrix
/// of the Legendre recurrence, and the weights follow from the first component of each eigenvector.
pub fn gauss_quadrature_points(n: usize) -> (Vec<f64>, Vec<f64>) {
    let off_diagonal = |k: usize| 0.5 / (1.0 - (2.0 * k as f64).powi(-2)).sqrt();

    let jacobi = DMatrix::from_fn(n, n, |r, c| match r.max(c) - r.min(c) {
        1 => off_diagonal(r.max(c)),
        _ => 0.0,
    });

    let eigen = SymmetricEigen::new(jacobi);

    let mut pairs: Vec<(f64, f64)> = eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.row(0).iter())
        .map(|(x, v0)| (*x, 2.0 * v0 * v0))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    pairs.into_iter().unzip()
}

/// Map points from [-1, 1] onto [min, max], returning the Jacobian of the map alongside the mapped points
pub fn scale_gauss_quad_points(points: &[f64], min: f64, max: f64) -> (f64, Vec<f64>) {
    let half_width = (max - min) / 2.0;
    let center = (max + min) / 2.0;

    (
        half_width,
        points.iter().map(|x| center + x * half_width).collect(),
    )
}
