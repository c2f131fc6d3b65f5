//! Error types for CaloSim

use thiserror::Error;

/// CaloSim error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid geometry, distribution or run configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Material name not present in the material library
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// Particle species the shower model does not handle
    #[error("Unsupported particle: {0}")]
    UnsupportedParticle(String),

    /// Incident energy is not finite and > 0
    #[error("Invalid energy: {0} GeV (must be finite and > 0)")]
    InvalidEnergy(f64),

    /// Direction is not a forward-going finite vector
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Records disagree on feature names or layer count
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
