use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// A smooth objective subject to equality constraints `c(x) = 0`.
///
/// Callbacks must be pure: minimizers call them any number of times in any
/// order.
pub trait ConstrainedProblem {
    fn dimension(&self) -> usize;

    fn num_constraints(&self) -> usize;

    fn objective(&self, x: &DVector<f64>) -> f64;

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64>;

    fn constraints(&self, x: &DVector<f64>) -> DVector<f64>;

    /// `num_constraints x dimension`. Estimated with central differences
    /// unless the problem knows it analytically.
    fn constraint_jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        central_difference_jacobian(|y| self.constraints(y), x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Budget {
    pub fn new(max_iterations: usize, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(Error::InvalidTolerance(tolerance));
        }
        Ok(Self {
            max_iterations,
            tolerance,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    IterationLimit,
    /// No acceptable step could be found, or the direction was not finite.
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: DVector<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// A constrained nonlinear minimizer.
///
/// Implementations return their last iterate even when they do not converge;
/// only malformed requests are errors.
pub trait Minimizer {
    fn minimize(
        &self,
        problem: &dyn ConstrainedProblem,
        initial: DVector<f64>,
        budget: &Budget,
    ) -> Result<Minimum>;
}

impl<M: Minimizer + ?Sized> Minimizer for &M {
    fn minimize(
        &self,
        problem: &dyn ConstrainedProblem,
        initial: DVector<f64>,
        budget: &Budget,
    ) -> Result<Minimum> {
        (**self).minimize(problem, initial, budget)
    }
}

pub fn central_difference_jacobian<F>(f: F, x: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let base = f(x);
    let mut jac = DMatrix::zeros(base.len(), x.len());
    let mut probe = x.clone();
    for k in 0..x.len() {
        let h = 1e-6 * x[k].abs().max(1.0);
        probe[k] = x[k] + h;
        let forward = f(&probe);
        probe[k] = x[k] - h;
        let backward = f(&probe);
        probe[k] = x[k];
        jac.set_column(k, &((forward - backward) / (2.0 * h)));
    }
    jac
}
