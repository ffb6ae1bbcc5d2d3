use nalgebra::Vector3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::point_set::PointSet;

pub fn random_unit_points(n: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let z: f64 = rng.random_range(-1.0..1.0);
            let theta: f64 = rng.random_range(0.0..std::f64::consts::TAU);
            let r = z.mul_add(-z, 1.0).sqrt();
            let (sin_theta, cos_theta) = theta.sin_cos();
            Vector3::new(r * cos_theta, r * sin_theta, z)
        })
        .collect::<Vec<_>>()
        .into()
}

pub fn regular_tetrahedron() -> PointSet {
    PointSet::new(
        [
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(-1.0, 1.0, -1.0),
            Vector3::new(-1.0, -1.0, 1.0),
        ]
        .iter()
        .map(|v| v.normalize())
        .collect(),
    )
}
