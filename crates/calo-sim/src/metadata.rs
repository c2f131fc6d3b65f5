//! Run metadata attached to every generated dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{DirectionDistribution, EnergyDistribution};
use crate::features::FeatureSet;

/// Everything needed to reproduce or audit a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Package version that produced the run.
    pub tool_version: String,
    /// Geometry name, if the geometry came from a named design.
    pub geometry_name: Option<String>,
    /// Content hash of the resolved geometry.
    pub geometry_hash: String,
    /// ECAL layer count.
    pub n_ecal_layers: usize,
    /// HCAL layer count.
    pub n_hcal_layers: usize,
    /// Shower model identifier.
    pub shower_model: String,
    /// Run seed.
    pub seed: u64,
    /// Events requested.
    pub n_events_requested: usize,
    /// Events produced (a prefix of the requested run when stopped early).
    pub n_events: usize,
    /// Whether the run was cancelled before completion.
    pub stopped_early: bool,
    /// Canonical particle name → probability.
    pub particles: BTreeMap<String, f64>,
    /// Energy distribution.
    pub energy: EnergyDistribution,
    /// Direction distribution.
    pub direction: DirectionDistribution,
    /// Derived feature set.
    pub feature_set: FeatureSet,
    /// Worker threads requested (0 = rayon default).
    pub threads: usize,
    /// Wall-clock time (seconds).
    pub wall_s: f64,
}
