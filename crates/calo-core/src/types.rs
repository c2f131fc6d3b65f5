//! Common data types for CaloSim

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Calorimeter section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Electromagnetic calorimeter (front).
    Ecal,
    /// Hadronic calorimeter (behind the ECAL).
    Hcal,
}

impl Section {
    /// Both sections in beam order.
    pub const ALL: [Section; 2] = [Section::Ecal, Section::Hcal];

    /// Lowercase name, used as a column prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Ecal => "ecal",
            Section::Hcal => "hcal",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident particle species handled by the shower model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleType {
    /// Photon (EM shower).
    Photon,
    /// Electron or positron (EM shower).
    Electron,
    /// Charged pion (hadronic shower).
    ChargedPion,
    /// Proton (hadronic shower).
    Proton,
    /// Neutron (hadronic shower).
    Neutron,
}

impl ParticleType {
    /// All supported species, in label-code order.
    pub const ALL: [ParticleType; 5] = [
        ParticleType::Photon,
        ParticleType::Electron,
        ParticleType::ChargedPion,
        ParticleType::Proton,
        ParticleType::Neutron,
    ];

    /// Canonical name as written to datasets.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleType::Photon => "photon",
            ParticleType::Electron => "electron",
            ParticleType::ChargedPion => "charged_pion",
            ParticleType::Proton => "proton",
            ParticleType::Neutron => "neutron",
        }
    }

    /// Stable integer label code.
    pub fn code(&self) -> i32 {
        match self {
            ParticleType::Photon => 0,
            ParticleType::Electron => 1,
            ParticleType::ChargedPion => 2,
            ParticleType::Proton => 3,
            ParticleType::Neutron => 4,
        }
    }

    /// `true` for species that develop a purely electromagnetic shower.
    pub fn is_electromagnetic(&self) -> bool {
        matches!(self, ParticleType::Photon | ParticleType::Electron)
    }
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticleType {
    type Err = Error;

    /// Accepts canonical names and the Geant4-style aliases (`gamma`, `e-`, `pi+`, ...).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photon" | "gamma" => Ok(ParticleType::Photon),
            "electron" | "positron" | "e-" | "e+" => Ok(ParticleType::Electron),
            "charged_pion" | "pion" | "pi+" | "pi-" | "pi" => Ok(ParticleType::ChargedPion),
            "proton" | "p" => Ok(ParticleType::Proton),
            "neutron" | "n" => Ok(ParticleType::Neutron),
            other => Err(Error::UnsupportedParticle(other.to_string())),
        }
    }
}

/// Unit direction of flight. The calorimeter axis is `+z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Direction {
    x: f64,
    y: f64,
    z: f64,
}

impl Direction {
    /// Normal incidence along the calorimeter axis.
    pub const AXIAL: Direction = Direction { x: 0.0, y: 0.0, z: 1.0 };

    /// Normalize `(x, y, z)`; the particle must travel into the stack (`z > 0`).
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
        let norm = (x * x + y * y + z * z).sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return Err(Error::InvalidDirection(format!(
                "({x}, {y}, {z}) has no finite non-zero length"
            )));
        }
        if z <= 0.0 {
            return Err(Error::InvalidDirection(format!(
                "({x}, {y}, {z}) does not point into the calorimeter (+z)"
            )));
        }
        Ok(Self { x: x / norm, y: y / norm, z: z / norm })
    }

    /// Direction from polar angle `theta` (w.r.t. +z) and azimuth `phi`, radians.
    pub fn from_angles(theta: f64, phi: f64) -> Result<Self> {
        let (st, ct) = theta.sin_cos();
        let (sp, cp) = phi.sin_cos();
        Self::new(st * cp, st * sp, ct)
    }

    /// Cosine of the angle to the calorimeter axis. Path lengths scale as `1 / cos_theta`.
    pub fn cos_theta(&self) -> f64 {
        self.z
    }

    /// Components `(x, y, z)`.
    pub fn components(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::AXIAL
    }
}

/// Incident particle for one simulated event. Energies are in GeV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Species.
    pub kind: ParticleType,
    /// Incident energy (GeV).
    pub initial_energy: f64,
    /// Direction of flight.
    pub direction: Direction,
}

impl Particle {
    /// Create a particle, rejecting non-finite or non-positive energies.
    pub fn new(kind: ParticleType, initial_energy: f64, direction: Direction) -> Result<Self> {
        if !initial_energy.is_finite() || initial_energy <= 0.0 {
            return Err(Error::InvalidEnergy(initial_energy));
        }
        Ok(Self { kind, initial_energy, direction })
    }

    /// Axially incident particle.
    pub fn axial(kind: ParticleType, initial_energy: f64) -> Result<Self> {
        Self::new(kind, initial_energy, Direction::AXIAL)
    }
}

/// Per-layer deposited energy, ECAL layers first then HCAL layers.
///
/// Entries are non-negative and sum to at most the incident energy;
/// [`DepositionProfile::new`] enforces both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositionProfile {
    per_layer_energy: Vec<f64>,
    n_ecal: usize,
}

impl DepositionProfile {
    /// Build a profile from raw per-layer energies.
    ///
    /// Negative entries are clipped to zero. If the clipped sum exceeds
    /// `initial_energy` the profile is scaled down to it. Non-finite entries
    /// are rejected.
    pub fn new(mut per_layer_energy: Vec<f64>, n_ecal: usize, initial_energy: f64) -> Result<Self> {
        if !initial_energy.is_finite() || initial_energy <= 0.0 {
            return Err(Error::InvalidEnergy(initial_energy));
        }
        if n_ecal > per_layer_energy.len() {
            return Err(Error::Validation(format!(
                "n_ecal ({n_ecal}) exceeds layer count ({})",
                per_layer_energy.len()
            )));
        }
        if let Some(i) = per_layer_energy.iter().position(|e| !e.is_finite()) {
            return Err(Error::Validation(format!("non-finite deposit in layer {i}")));
        }
        for e in per_layer_energy.iter_mut() {
            if *e < 0.0 {
                *e = 0.0;
            }
        }
        let mut sum: f64 = per_layer_energy.iter().sum();
        if sum > initial_energy {
            let scale = initial_energy / sum;
            for e in per_layer_energy.iter_mut() {
                *e *= scale;
            }
            sum = per_layer_energy.iter().sum();
        }
        // Scaling can land a few ulps above the cap; take the rest off the largest layer.
        while sum > initial_energy {
            let excess = sum - initial_energy;
            if let Some(max) = per_layer_energy.iter_mut().max_by(|a, b| a.total_cmp(b)) {
                *max = (*max - excess.max(*max * f64::EPSILON)).max(0.0);
            }
            sum = per_layer_energy.iter().sum();
        }
        Ok(Self { per_layer_energy, n_ecal })
    }

    /// All layers, ECAL first.
    pub fn per_layer_energy(&self) -> &[f64] {
        &self.per_layer_energy
    }

    /// Total number of layers.
    pub fn len(&self) -> usize {
        self.per_layer_energy.len()
    }

    /// `true` if the profile has no layers.
    pub fn is_empty(&self) -> bool {
        self.per_layer_energy.is_empty()
    }

    /// Number of ECAL layers (prefix of [`Self::per_layer_energy`]).
    pub fn n_ecal(&self) -> usize {
        self.n_ecal
    }

    /// Number of HCAL layers.
    pub fn n_hcal(&self) -> usize {
        self.per_layer_energy.len() - self.n_ecal
    }

    /// Per-layer energies of one section.
    pub fn section(&self, section: Section) -> &[f64] {
        match section {
            Section::Ecal => &self.per_layer_energy[..self.n_ecal],
            Section::Hcal => &self.per_layer_energy[self.n_ecal..],
        }
    }

    /// Summed deposit of one section.
    pub fn section_total(&self, section: Section) -> f64 {
        self.section(section).iter().sum()
    }

    /// Summed deposit over all layers.
    pub fn total(&self) -> f64 {
        self.per_layer_energy.iter().sum()
    }
}
