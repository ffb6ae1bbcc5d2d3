use nalgebra::{DMatrix, DVector, Vector3};
use tracing::{info, instrument};

use crate::constraint;
use crate::energy::{DEFAULT_ALPHA, EnergyModel, Weights};
use crate::error::Result;
use crate::gradient_projection::GradientProjection;
use crate::minimizer::{Budget, ConstrainedProblem, DEFAULT_TOLERANCE, Minimizer, Termination};
use crate::point_set::PointSet;

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct DispersionConfig {
    pub alpha: f64,
    pub weights: Weights,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for DispersionConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            weights: Weights::Ones,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl DispersionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn budget(&self) -> Result<Budget> {
        Budget::new(self.max_iterations, self.tolerance)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispersion {
    pub points: PointSet,
    pub energy: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// Repulsion energy on the flat layout, constrained to the unit sphere.
struct SphereProblem<'a> {
    model: &'a EnergyModel,
    n: usize,
}

fn as_points(x: &DVector<f64>) -> Vec<Vector3<f64>> {
    x.as_slice()
        .chunks_exact(3)
        .map(Vector3::from_column_slice)
        .collect()
}

impl ConstrainedProblem for SphereProblem<'_> {
    fn dimension(&self) -> usize {
        3 * self.n
    }

    fn num_constraints(&self) -> usize {
        self.n
    }

    fn objective(&self, x: &DVector<f64>) -> f64 {
        self.model.energy_unchecked(&as_points(x))
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(self.model.gradient_unchecked(&as_points(x)))
    }

    fn constraints(&self, x: &DVector<f64>) -> DVector<f64> {
        constraint::residual(&as_points(x))
    }

    fn constraint_jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        constraint::jacobian(&as_points(x))
    }
}

/// Spreads point charges over the unit sphere by minimizing an
/// [`EnergyModel`] under the unit-norm constraint.
#[derive(Debug, Clone, Default)]
pub struct Disperser<M = GradientProjection> {
    model: EnergyModel,
    minimizer: M,
}

impl<M: Minimizer> Disperser<M> {
    pub const fn new(model: EnergyModel, minimizer: M) -> Self {
        Self { model, minimizer }
    }

    pub fn from_config(config: &DispersionConfig, minimizer: M) -> Result<Self> {
        let model = EnergyModel::new(config.alpha, config.weights.clone())?;
        Ok(Self::new(model, minimizer))
    }

    pub const fn model(&self) -> &EnergyModel {
        &self.model
    }

    /// Runs the minimizer from `initial`.
    ///
    /// Inputs are validated before the minimizer is called. The returned
    /// points are whatever the minimizer produced last; the unit-norm
    /// constraint is not re-checked here.
    #[instrument(
        skip_all,
        name = "disperse",
        fields(points = initial.len(), max_iterations = budget.max_iterations)
    )]
    pub fn disperse(&self, initial: &PointSet, budget: Budget) -> Result<Dispersion> {
        let budget = Budget::new(budget.max_iterations, budget.tolerance)?;
        self.model.validate(initial.len())?;

        let problem = SphereProblem {
            model: &self.model,
            n: initial.len(),
        };
        let minimum = self
            .minimizer
            .minimize(&problem, initial.to_dvector(), &budget)?;
        let points = PointSet::from_dvector(&minimum.x)?;

        info!(
            energy = minimum.objective,
            iterations = minimum.iterations,
            termination = ?minimum.termination,
            max_norm_deviation = points.max_norm_deviation(),
            "Dispersion finished."
        );

        Ok(Dispersion {
            points,
            energy: minimum.objective,
            iterations: minimum.iterations,
            termination: minimum.termination,
        })
    }
}

/// Disperses `initial` with the default energy model (`alpha = 2`, all-ones
/// weights) and the default minimizer.
pub fn disperse_charges(
    initial: &PointSet,
    max_iterations: usize,
    tolerance: f64,
) -> Result<PointSet> {
    let budget = Budget::new(max_iterations, tolerance)?;
    Disperser::<GradientProjection>::default()
        .disperse(initial, budget)
        .map(|dispersion| dispersion.points)
}
