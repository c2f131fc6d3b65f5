//! Parametric shower simulation for CaloSim.
//!
//! This crate turns an incident particle and a [`calo_geometry::GeometryModel`]
//! into a per-layer energy deposition:
//! - longitudinal gamma profiles in X0 (EM) or λ_I (hadronic) units
//! - containment from the total stack depth
//! - per-layer counting-statistics fluctuations

pub mod profile;
pub mod sampler;

pub use profile::GammaProfile;
pub use sampler::{SamplerConfig, ShowerModel, ShowerSampler, effective_critical_energy};
