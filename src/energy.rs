use nalgebra::{DMatrix, Vector3};

use crate::error::{Error, Result};
use crate::point_set::PointSet;

pub const DEFAULT_ALPHA: f64 = 2.0;

/// Pairwise interaction strengths.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Weights {
    /// The all-ones matrix, never materialized.
    #[default]
    Ones,
    Matrix(DMatrix<f64>),
}

impl Weights {
    /// All pairs weighted by `1 / n²`.
    #[must_use]
    pub fn normalized(n: usize) -> Self {
        let scale = if n == 0 { 0.0 } else { 1.0 / (n * n) as f64 };
        Self::Matrix(DMatrix::from_element(n, n, scale))
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            Self::Ones => 1.0,
            Self::Matrix(matrix) => matrix[(row, col)],
        }
    }

    pub fn validate(&self, n: usize) -> Result<()> {
        let Self::Matrix(matrix) = self else {
            return Ok(());
        };
        if matrix.nrows() != n || matrix.ncols() != n {
            return Err(Error::WeightShape {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                expected: n,
            });
        }
        for col in 0..n {
            for row in 0..n {
                let value = matrix[(row, col)];
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::InvalidWeight { row, col, value });
                }
            }
        }
        Ok(())
    }
}

/// Power-law repulsion between points and their antipodal mirrors:
///
/// `E = Σ_i Σ_j w_ij ( [i ≠ j] |x_i - x_j|^-α + |x_i + x_j|^-α )`
///
/// Coincident charges give `+∞`. The model does not require the points to be
/// on the unit sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyModel {
    alpha: f64,
    weights: Weights,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            weights: Weights::Ones,
        }
    }
}

impl EnergyModel {
    pub fn new(alpha: f64, weights: Weights) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(Error::InvalidAlpha(alpha));
        }
        Ok(Self { alpha, weights })
    }

    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub const fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Checks that the weights fit a set of `n` points.
    pub fn validate(&self, n: usize) -> Result<()> {
        self.weights.validate(n)
    }

    pub fn energy(&self, points: &PointSet) -> Result<f64> {
        self.validate(points.len())?;
        Ok(self.energy_unchecked(points.points()))
    }

    pub fn gradient(&self, points: &PointSet) -> Result<Vec<f64>> {
        self.validate(points.len())?;
        Ok(self.gradient_unchecked(points.points()))
    }

    /// Combined weight of the unordered pair, counting both orderings.
    #[inline]
    fn pair_weight(&self, i: usize, j: usize) -> f64 {
        self.weights.get(i, j) + self.weights.get(j, i)
    }

    pub(crate) fn energy_unchecked(&self, points: &[Vector3<f64>]) -> f64 {
        let alpha = self.alpha;
        let mut total = 0.0;
        for (i, xi) in points.iter().enumerate() {
            let w_self = self.weights.get(i, i);
            if w_self != 0.0 {
                total += w_self * (2.0 * xi).norm().powf(-alpha);
            }
            for (j, xj) in points.iter().enumerate().skip(i + 1) {
                let w = self.pair_weight(i, j);
                if w == 0.0 {
                    continue;
                }
                let direct = (xi - xj).norm().powf(-alpha);
                let mirrored = (xi + xj).norm().powf(-alpha);
                total += w * (direct + mirrored);
            }
        }
        total
    }

    pub(crate) fn gradient_unchecked(&self, points: &[Vector3<f64>]) -> Vec<f64> {
        let alpha = self.alpha;
        let exponent = -(alpha + 2.0);
        let mut forces = vec![Vector3::zeros(); points.len()];

        for (i, xi) in points.iter().enumerate() {
            // The mirrored self term reduces to the same formula with x_j = x_i.
            let w_self = self.pair_weight(i, i);
            if w_self != 0.0 {
                let s = 2.0 * xi;
                forces[i] -= alpha * w_self * s * s.norm().powf(exponent);
            }
            for (j, xj) in points.iter().enumerate().skip(i + 1) {
                let w = self.pair_weight(i, j);
                if w == 0.0 {
                    continue;
                }
                let d = xi - xj;
                let s = xi + xj;
                let direct = d * d.norm().powf(exponent);
                let mirrored = s * s.norm().powf(exponent);
                forces[i] -= alpha * w * (direct + mirrored);
                forces[j] -= alpha * w * (mirrored - direct);
            }
        }

        forces
            .iter()
            .flat_map(|force| [force.x, force.y, force.z])
            .collect()
    }
}

/// Energy of a flattened point set.
pub fn f(flat: &[f64], alpha: f64, weights: &Weights) -> Result<f64> {
    let points = PointSet::from_flat(flat)?;
    EnergyModel::new(alpha, weights.clone())?.energy(&points)
}

/// Gradient of [`f`], in the same flat layout as the input.
pub fn grad_f(flat: &[f64], alpha: f64, weights: &Weights) -> Result<Vec<f64>> {
    let points = PointSet::from_flat(flat)?;
    EnergyModel::new(alpha, weights.clone())?.gradient(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{random_unit_points, regular_tetrahedron};
    use nalgebra::Rotation3;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * a.abs().max(1.0)
    }

    fn numerical_gradient(model: &EnergyModel, points: &PointSet) -> Vec<f64> {
        let flat = points.to_flat();
        (0..flat.len())
            .map(|k| {
                let h = 1e-6;
                let mut plus = flat.clone();
                let mut minus = flat.clone();
                plus[k] += h;
                minus[k] -= h;
                let e_plus = model.energy(&PointSet::from_flat(&plus).unwrap()).unwrap();
                let e_minus = model.energy(&PointSet::from_flat(&minus).unwrap()).unwrap();
                (e_plus - e_minus) / (2.0 * h)
            })
            .collect()
    }

    fn assert_gradient_matches_finite_differences(model: &EnergyModel, points: &PointSet) {
        let analytic = model.gradient(points).unwrap();
        let numerical = numerical_gradient(model, points);
        let scale = numerical.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        for (k, (a, n)) in analytic.iter().zip(&numerical).enumerate() {
            assert!(
                (a - n).abs() <= 1e-4 * scale,
                "component {k}: analytic {a}, numerical {n}"
            );
        }
    }

    #[test]
    fn orthogonal_pair_has_closed_form_energy() {
        // Two mirrored self terms of 1/4 plus 2 * (1/2 + 1/2) for the pair.
        let points = PointSet::new(vec![Vector3::x(), Vector3::y()]);
        let energy = EnergyModel::default().energy(&points).unwrap();
        assert!(f64_approx_equal(energy, 2.5));
    }

    #[test]
    fn regular_tetrahedron_has_closed_form_energy() {
        // |xi - xj|² = 8/3 and |xi + xj|² = 4/3 for every pair.
        let energy = EnergyModel::default()
            .energy(&regular_tetrahedron())
            .unwrap();
        assert!(f64_approx_equal(energy, 1.0 + 12.0 * (3.0 / 8.0 + 3.0 / 4.0)));
    }

    #[test]
    fn antipodal_pair_coincides_with_mirror_charge_and_diverges() {
        let points = PointSet::new(vec![Vector3::x(), -Vector3::x()]);
        let energy = EnergyModel::default().energy(&points).unwrap();
        assert_eq!(energy, f64::INFINITY);
    }

    #[test]
    fn coincident_points_diverge_without_error() {
        let p = Vector3::new(0.0, 0.6, 0.8);
        let energy = EnergyModel::default()
            .energy(&PointSet::new(vec![p, p, Vector3::x()]))
            .unwrap();
        assert_eq!(energy, f64::INFINITY);
    }

    #[test]
    fn zero_weight_suppresses_coincident_pair() {
        let p = Vector3::new(0.0, 0.6, 0.8);
        let mut matrix = DMatrix::from_element(2, 2, 1.0);
        matrix[(0, 1)] = 0.0;
        matrix[(1, 0)] = 0.0;
        let model = EnergyModel::new(2.0, Weights::Matrix(matrix)).unwrap();
        let energy = model.energy(&PointSet::new(vec![p, p])).unwrap();
        assert!(f64_approx_equal(energy, 0.5));
    }

    #[test]
    fn energy_is_invariant_under_rotation() {
        let points = random_unit_points(9, 11);
        let rotation = Rotation3::from_euler_angles(0.3, -1.1, 2.4);
        let model = EnergyModel::default();
        let before = model.energy(&points).unwrap();
        let after = model.energy(&points.rotated(&rotation)).unwrap();
        assert!(f64_approx_equal(before, after));
    }

    #[test]
    fn energy_is_invariant_under_antipodal_reflection() {
        let points = random_unit_points(9, 12);
        let model = EnergyModel::new(1.5, Weights::Ones).unwrap();
        let before = model.energy(&points).unwrap();
        let after = model.energy(&points.negated()).unwrap();
        assert!(f64_approx_equal(before, after));
    }

    #[test]
    fn normalized_weights_scale_energy_by_inverse_square_count() {
        let points = random_unit_points(5, 13);
        let ones = EnergyModel::default().energy(&points).unwrap();
        let normalized = EnergyModel::new(2.0, Weights::normalized(5))
            .unwrap()
            .energy(&points)
            .unwrap();
        assert!(f64_approx_equal(normalized, ones / 25.0));
    }

    #[test]
    fn gradient_matches_finite_differences_for_default_model() {
        assert_gradient_matches_finite_differences(
            &EnergyModel::default(),
            &random_unit_points(7, 21),
        );
    }

    #[test]
    fn gradient_matches_finite_differences_off_the_sphere() {
        let points = random_unit_points(6, 22);
        let scaled = PointSet::new(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| p * (0.7 + 0.1 * i as f64))
                .collect(),
        );
        let model = EnergyModel::new(1.3, Weights::Ones).unwrap();
        assert_gradient_matches_finite_differences(&model, &scaled);
    }

    #[test]
    fn gradient_matches_finite_differences_for_asymmetric_weights() {
        let n = 5;
        let matrix = DMatrix::from_fn(n, n, |i, j| 0.5 + (i * n + j) as f64 * 0.1);
        let model = EnergyModel::new(3.0, Weights::Matrix(matrix)).unwrap();
        assert_gradient_matches_finite_differences(&model, &random_unit_points(n, 23));
    }

    #[test]
    fn gradient_vanishes_tangentially_at_regular_tetrahedron() {
        let points = regular_tetrahedron();
        let gradient = EnergyModel::default().gradient(&points).unwrap();
        for (i, p) in points.iter().enumerate() {
            let g = Vector3::from_column_slice(&gradient[3 * i..3 * i + 3]);
            let tangential = g - p * g.dot(p);
            assert!(tangential.norm() < 1e-9);
        }
    }

    #[test]
    fn flat_functions_agree_with_model() {
        let points = random_unit_points(4, 24);
        let flat = points.to_flat();
        let model = EnergyModel::default();
        assert_eq!(
            f(&flat, DEFAULT_ALPHA, &Weights::Ones).unwrap(),
            model.energy(&points).unwrap()
        );
        assert_eq!(
            grad_f(&flat, DEFAULT_ALPHA, &Weights::Ones).unwrap(),
            model.gradient(&points).unwrap()
        );
    }

    #[test]
    fn mismatched_weight_shape_is_rejected() {
        let model = EnergyModel::new(2.0, Weights::normalized(3)).unwrap();
        let result = model.energy(&random_unit_points(4, 25));
        assert_eq!(
            result,
            Err(Error::WeightShape {
                rows: 3,
                cols: 3,
                expected: 4
            })
        );
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut matrix = DMatrix::from_element(2, 2, 1.0);
        matrix[(1, 0)] = -0.5;
        let result = Weights::Matrix(matrix).validate(2);
        assert_eq!(
            result,
            Err(Error::InvalidWeight {
                row: 1,
                col: 0,
                value: -0.5
            })
        );
    }

    #[test]
    fn nonpositive_alpha_is_rejected() {
        assert_eq!(
            EnergyModel::new(0.0, Weights::Ones),
            Err(Error::InvalidAlpha(0.0))
        );
        assert!(f(&[1.0, 0.0, 0.0], f64::NAN, &Weights::Ones).is_err());
    }

    #[test]
    fn ragged_flat_input_is_rejected() {
        assert_eq!(
            f(&[1.0, 0.0], DEFAULT_ALPHA, &Weights::Ones),
            Err(Error::RaggedPointSet { len: 2 })
        );
    }
}
