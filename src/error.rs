use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Flattened point set has length {len}, which is not a multiple of 3")]
    RaggedPointSet { len: usize },

    #[error("Weight matrix is {rows}x{cols}, expected {expected}x{expected} for {expected} points")]
    WeightShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("Weight ({row}, {col}) must be finite and nonnegative, got {value}")]
    InvalidWeight { row: usize, col: usize, value: f64 },

    #[error("Repulsion exponent must be positive and finite, got {0}")]
    InvalidAlpha(f64),

    #[error("Tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),

    #[error("Initial vector has length {actual}, but the problem has dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
