use std::ops::Index;

use nalgebra::{DVector, Rotation3, Vector3};

use crate::error::{Error, Result};

/// An ordered set of points in 3-space.
///
/// Optimizers see the set as one flat vector `[x0, y0, z0, x1, y1, z1, ...]`;
/// everything else works on the `Vector3` view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointSet {
    points: Vec<Vector3<f64>>,
}

impl PointSet {
    #[must_use]
    pub const fn new(points: Vec<Vector3<f64>>) -> Self {
        Self { points }
    }

    pub fn from_flat(flat: &[f64]) -> Result<Self> {
        if flat.len() % 3 != 0 {
            return Err(Error::RaggedPointSet { len: flat.len() });
        }
        Ok(Self {
            points: flat
                .chunks_exact(3)
                .map(Vector3::from_column_slice)
                .collect(),
        })
    }

    pub fn from_dvector(vector: &DVector<f64>) -> Result<Self> {
        Self::from_flat(vector.as_slice())
    }

    #[must_use]
    pub fn to_flat(&self) -> Vec<f64> {
        self.points
            .iter()
            .flat_map(|point| [point.x, point.y, point.z])
            .collect()
    }

    #[must_use]
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_vec(self.to_flat())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.points.iter()
    }

    #[must_use]
    pub fn into_points(self) -> Vec<Vector3<f64>> {
        self.points
    }

    /// The antipodal mirror of every point.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self::new(self.points.iter().map(|point| -point).collect())
    }

    #[must_use]
    pub fn rotated(&self, rotation: &Rotation3<f64>) -> Self {
        Self::new(self.points.iter().map(|point| rotation * point).collect())
    }

    /// Largest `| |p| - 1 |` over the set; zero for an empty set.
    #[must_use]
    pub fn max_norm_deviation(&self) -> f64 {
        self.points
            .iter()
            .map(|point| (point.norm() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

impl From<Vec<Vector3<f64>>> for PointSet {
    fn from(points: Vec<Vector3<f64>>) -> Self {
        Self::new(points)
    }
}

impl Index<usize> for PointSet {
    type Output = Vector3<f64>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Vector3<f64>;
    type IntoIter = std::slice::Iter<'a, Vector3<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
