pub mod constraint;
pub mod dispersion;
pub mod energy;
pub mod error;
pub mod gradient_projection;
pub mod minimizer;
pub mod point_set;

#[cfg(test)]
mod test_support;

pub use dispersion::{Dispersion, DispersionConfig, Disperser, disperse_charges};
pub use energy::{EnergyModel, Weights};
pub use error::{Error, Result};
pub use gradient_projection::GradientProjection;
pub use minimizer::{Budget, ConstrainedProblem, Minimizer, Minimum, Termination};
pub use point_set::PointSet;
