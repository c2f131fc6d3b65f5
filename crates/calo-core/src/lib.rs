//! # calo-core
//!
//! Core types and error handling shared by the CaloSim crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod rng;
pub mod types;

pub use error::{Error, Result};
pub use types::{DepositionProfile, Direction, Particle, ParticleType, Section};

/// CaloSim version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
