use std::str::FromStr;

use charge_dispersion::{Budget, Disperser, DispersionConfig, GradientProjection, PointSet};
use nalgebra::Vector3;
use rand::{self, Rng};
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

const LOG_ENV: &str = "DISPERSION_LOG";

#[must_use]
pub fn generate_points_on_sphere() -> Vector3<f64> {
    let mut rng = rand::rng();
    let z: f64 = rng.random_range(-1.0..1.0);
    let theta: f64 = rng.random_range(0.0..std::f64::consts::TAU);
    let r = z.mul_add(-z, 1.0).sqrt();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vector3::new(r * cos_theta, r * sin_theta, z)
}

fn setup_logging() {
    let requested = std::env::var(LOG_ENV).ok();
    let level_filter = requested
        .as_deref()
        .and_then(|value| LevelFilter::from_str(value).ok())
        .unwrap_or(LevelFilter::INFO);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer)
        .init();

    if let Some(value) = requested.filter(|value| LevelFilter::from_str(value).is_err()) {
        warn!("Ignoring unrecognized {LOG_ENV}={value}; logging at INFO.");
    }
}

fn main() -> charge_dispersion::Result<()> {
    const POINTS_NUM: usize = 60;
    const ITERATION_BUDGETS: [usize; 6] = [0, 5, 10, 20, 40, 80];

    setup_logging();

    let initial = PointSet::new(
        (0..POINTS_NUM)
            .map(|_| generate_points_on_sphere())
            .collect(),
    );

    let config = DispersionConfig::default();
    let disperser = Disperser::from_config(&config, GradientProjection::default())?;
    let initial_energy = disperser.model().energy(&initial)?;
    info!(points = POINTS_NUM, initial_energy, "Dispersing random points.");

    let mut trajectory = Vec::with_capacity(ITERATION_BUDGETS.len());
    let mut dispersed = initial.clone();
    for max_iterations in ITERATION_BUDGETS {
        let budget = Budget::new(max_iterations, config.tolerance)?;
        let dispersion = disperser.disperse(&initial, budget)?;
        trajectory.push((max_iterations, dispersion.energy, dispersion.termination));
        dispersed = dispersion.points;
    }

    for (max_iterations, energy, termination) in &trajectory {
        info!(max_iterations, energy, ?termination, "Budget result.");
    }
    let final_energy = disperser.model().energy(&dispersed)?;
    info!(
        energy = final_energy,
        max_norm_deviation = dispersed.max_norm_deviation(),
        "Final configuration."
    );

    for point in &dispersed {
        println!("{{{},{},{}}},", point.x, point.y, point.z);
    }
    Ok(())
}
