//! Simulated event records.

use std::collections::BTreeMap;

use calo_core::{DepositionProfile, Direction, ParticleType};
use serde::Serialize;

use crate::features::FeatureSet;

/// One simulated event: the incident particle (labels) and what the detector saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    event_id: u64,
    particle_type: ParticleType,
    initial_energy: f64,
    direction: Direction,
    profile: DepositionProfile,
    derived_features: BTreeMap<String, f64>,
}

impl EventRecord {
    /// Record with features derived from `profile` by `feature_set`.
    pub fn new(
        event_id: u64,
        particle_type: ParticleType,
        initial_energy: f64,
        direction: Direction,
        profile: DepositionProfile,
        feature_set: FeatureSet,
    ) -> Self {
        let derived_features = feature_set.derive(&profile);
        Self::from_parts(event_id, particle_type, initial_energy, direction, profile, derived_features)
    }

    /// Record with explicitly supplied features.
    pub fn from_parts(
        event_id: u64,
        particle_type: ParticleType,
        initial_energy: f64,
        direction: Direction,
        profile: DepositionProfile,
        derived_features: BTreeMap<String, f64>,
    ) -> Self {
        Self { event_id, particle_type, initial_energy, direction, profile, derived_features }
    }

    /// Position in the run; also the RNG sub-stream index.
    pub fn event_id(&self) -> u64 {
        self.event_id
    }

    /// True particle type.
    pub fn particle_type(&self) -> ParticleType {
        self.particle_type
    }

    /// True incident energy (GeV).
    pub fn initial_energy(&self) -> f64 {
        self.initial_energy
    }

    /// Incident direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Per-layer deposits.
    pub fn profile(&self) -> &DepositionProfile {
        &self.profile
    }

    /// Derived features by name.
    pub fn derived_features(&self) -> &BTreeMap<String, f64> {
        &self.derived_features
    }

    /// Feature value by name.
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.derived_features.get(name).copied()
    }
}
