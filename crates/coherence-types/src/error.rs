// ─────────────────────────────────────────────────────────────────────
// Coherence Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Coherence Kernel failures.
#[derive(Error, Debug)]
pub enum CoherenceError {
    /// Configuration error (out-of-range parameter, bad JSON).
    #[error("config error: {0}")]
    Config(String),

    /// Shape mismatch between coupled state vectors.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Numerical error (NaN/Inf in state or derived series).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Event detector received inconsistent input series.
    #[error("detector error: {0}")]
    Detector(String),
}

pub type CoherenceResult<T> = Result<T, CoherenceError>;
