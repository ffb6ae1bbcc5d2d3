use nalgebra::{DMatrix, DVector, Vector3};

use crate::error::Result;
use crate::point_set::PointSet;

/// Unit-sphere residual: `g_i = |x_i|² - 1`.
#[must_use]
pub fn g(points: &PointSet) -> DVector<f64> {
    residual(points.points())
}

pub fn g_flat(flat: &[f64]) -> Result<Vec<f64>> {
    Ok(g(&PointSet::from_flat(flat)?).as_slice().to_vec())
}

/// Jacobian of [`g`], `N x 3N`. Row `i` is `2 x_i` in columns `3i..3i+3`.
#[must_use]
pub fn grad_g(points: &PointSet) -> DMatrix<f64> {
    jacobian(points.points())
}

pub(crate) fn residual(points: &[Vector3<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        points.len(),
        points.iter().map(|point| point.norm_squared() - 1.0),
    )
}

pub(crate) fn jacobian(points: &[Vector3<f64>]) -> DMatrix<f64> {
    let n = points.len();
    let mut jac = DMatrix::zeros(n, 3 * n);
    for (i, point) in points.iter().enumerate() {
        for k in 0..3 {
            jac[(i, 3 * i + k)] = 2.0 * point[k];
        }
    }
    jac
}
