use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::minimizer::{Budget, ConstrainedProblem, Minimizer, Minimum, Termination};

/// Gradient projection for smooth equality constraints.
///
/// Every iteration moves along the component of `-∇f` tangent to the
/// constraint surface, pulls the trial point back onto the surface with
/// Gauss-Newton corrections and backtracks until the objective decreases
/// enough (Armijo). Step lengths are measured as the largest coordinate
/// displacement, so the scale of the objective does not matter.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientProjection {
    /// Largest coordinate displacement tried by the first iteration.
    pub initial_step: f64,
    pub max_step: f64,
    /// The run stops as `Stalled` once backtracking shrinks the step below this.
    pub min_step: f64,
    /// Sufficient-decrease factor of the Armijo test.
    pub armijo: f64,
    /// Largest `|c_i(x)|` at which restoration counts a point as feasible.
    pub feasibility_tolerance: f64,
    pub max_restoration_steps: usize,
}

impl Default for GradientProjection {
    fn default() -> Self {
        Self {
            initial_step: 0.05,
            max_step: 0.5,
            min_step: 1e-12,
            armijo: 1e-4,
            feasibility_tolerance: 1e-12,
            max_restoration_steps: 30,
        }
    }
}

fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter()
        .try_fold(0.0_f64, |acc, x| x.is_finite().then(|| acc.max(x.abs())))
        .unwrap_or(f64::INFINITY)
}

/// Solves `(J Jᵀ) y = rhs`.
fn solve_normal(jac: &DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    let gram = jac * jac.transpose();
    if let Some(cholesky) = gram.clone().cholesky() {
        return Some(cholesky.solve(rhs));
    }
    gram.lu().solve(rhs)
}

impl GradientProjection {
    /// Pulls `x` onto `c(x) = 0` with `x ← x - Jᵀ (J Jᵀ)⁻¹ c(x)`.
    fn restore(&self, problem: &dyn ConstrainedProblem, mut x: DVector<f64>) -> DVector<f64> {
        if problem.num_constraints() == 0 {
            return x;
        }
        for _ in 0..self.max_restoration_steps {
            let residual = problem.constraints(&x);
            let violation = max_abs(&residual);
            if violation <= self.feasibility_tolerance || !violation.is_finite() {
                return x;
            }
            let jac = problem.constraint_jacobian(&x);
            let Some(multipliers) = solve_normal(&jac, &residual) else {
                warn!(violation, "Constraint Jacobian is singular; restoration stopped.");
                return x;
            };
            x -= jac.tr_mul(&multipliers);
        }
        let violation = max_abs(&problem.constraints(&x));
        if violation > self.feasibility_tolerance {
            warn!(violation, "Restoration stopped before reaching feasibility.");
        }
        x
    }

    /// `-(∇f - Jᵀ λ)` with `(J Jᵀ) λ = J ∇f`.
    fn descent_direction(
        &self,
        problem: &dyn ConstrainedProblem,
        x: &DVector<f64>,
    ) -> Option<DVector<f64>> {
        let gradient = problem.gradient(x);
        if problem.num_constraints() == 0 {
            return Some(-gradient);
        }
        let jac = problem.constraint_jacobian(x);
        let multipliers = solve_normal(&jac, &(&jac * &gradient))?;
        Some(jac.tr_mul(&multipliers) - gradient)
    }
}

impl Minimizer for GradientProjection {
    fn minimize(
        &self,
        problem: &dyn ConstrainedProblem,
        initial: DVector<f64>,
        budget: &Budget,
    ) -> Result<Minimum> {
        if initial.len() != problem.dimension() {
            return Err(Error::DimensionMismatch {
                expected: problem.dimension(),
                actual: initial.len(),
            });
        }

        if budget.max_iterations == 0 || initial.is_empty() {
            return Ok(Minimum {
                objective: problem.objective(&initial),
                x: initial,
                iterations: 0,
                termination: if budget.max_iterations == 0 {
                    Termination::IterationLimit
                } else {
                    Termination::Converged
                },
            });
        }

        let mut x = self.restore(problem, initial);
        let mut fx = problem.objective(&x);
        let mut step = self.initial_step;
        let mut iterations = 0;
        let mut termination = Termination::IterationLimit;

        'outer: while iterations < budget.max_iterations {
            let Some(direction) = self.descent_direction(problem, &x) else {
                termination = Termination::Stalled;
                break;
            };
            let direction_size = max_abs(&direction);
            if !direction_size.is_finite() || !fx.is_finite() {
                termination = Termination::Stalled;
                break;
            }
            if direction_size <= budget.tolerance {
                termination = Termination::Converged;
                break;
            }

            let slope = direction.norm_squared();
            let (trial, f_trial, scale) = loop {
                let scale = step / direction_size;
                let trial = self.restore(problem, &x + &direction * scale);
                let f_trial = problem.objective(&trial);
                if f_trial <= fx - self.armijo * scale * slope {
                    break (trial, f_trial, scale);
                }
                trace!(step, f_trial, "Rejected trial step.");
                step *= 0.5;
                if step < self.min_step {
                    termination = Termination::Stalled;
                    break 'outer;
                }
            };

            let decrease = fx - f_trial;
            x = trial;
            fx = f_trial;
            iterations += 1;
            debug!(
                iteration = iterations,
                objective = fx,
                decrease,
                step,
                scale,
                "Accepted step."
            );
            step = (step * 2.0).min(self.max_step);

            let violation = max_abs(&problem.constraints(&x));
            if decrease <= budget.tolerance && violation <= budget.tolerance {
                termination = Termination::Converged;
                break;
            }
        }

        debug!(iterations, objective = fx, ?termination, "Minimization finished.");
        Ok(Minimum {
            x,
            objective: fx,
            iterations,
            termination,
        })
    }
}
