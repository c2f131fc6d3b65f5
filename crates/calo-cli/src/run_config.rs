//! Run configuration file (YAML or JSON).

use std::path::Path;

use anyhow::{Context, Result};
use calo_geometry::GeometrySource;
use calo_shower::SamplerConfig;
use calo_sim::SimulationConfig;
use serde::Deserialize;

fn default_n_events() -> usize {
    1000
}

/// Full pipeline configuration.
///
/// ```yaml
/// geometry: { design: pbwo4_fe_scint_v1 }
/// simulation:
///   particles: { photon: 0.5, charged_pion: 0.5 }
///   energy: { kind: uniform, min: 1.0, max: 50.0 }
///   seed: 7
/// n_events: 1000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Named design or inline layer lists.
    pub geometry: GeometrySource,
    /// Event distributions, seed, threads and feature set.
    pub simulation: SimulationConfig,
    /// Events to generate.
    #[serde(default = "default_n_events")]
    pub n_events: usize,
    /// Shower resolution overrides.
    #[serde(default)]
    pub sampler: SamplerConfig,
}

/// Only the geometry part of a run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryConfig {
    /// Named design or inline layer lists.
    pub geometry: GeometrySource,
}

/// Deserialize a YAML or JSON file (YAML is a superset of JSON).
pub fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml_ng::from_slice(&bytes).with_context(|| format!("invalid config {}", path.display()))
}
