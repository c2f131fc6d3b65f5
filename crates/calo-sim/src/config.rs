//! Simulation configuration: particle mix, energy and direction distributions.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use calo_core::{Direction, Error, ParticleType, Result};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::features::FeatureSet;

/// Tolerance on the sum of particle-type probabilities.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Validated particle-type mixture.
#[derive(Debug, Clone)]
pub struct ParticleMix {
    kinds: Vec<ParticleType>,
    probabilities: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl ParticleMix {
    /// Build from `(type, probability)` pairs.
    ///
    /// # Errors
    /// [`Error::Configuration`] if the mix is empty, a probability is negative
    /// or non-finite, a type repeats, or the probabilities do not sum to 1
    /// within [`PROBABILITY_TOLERANCE`].
    pub fn new(entries: impl IntoIterator<Item = (ParticleType, f64)>) -> Result<Self> {
        let mut kinds = Vec::new();
        let mut probabilities = Vec::new();
        for (kind, p) in entries {
            if !p.is_finite() || p < 0.0 {
                return Err(Error::Configuration(format!(
                    "probability for {kind} must be finite and >= 0, got {p}"
                )));
            }
            if kinds.contains(&kind) {
                return Err(Error::Configuration(format!("particle type {kind} listed twice")));
            }
            kinds.push(kind);
            probabilities.push(p);
        }
        if kinds.is_empty() {
            return Err(Error::Configuration("particle distribution is empty".into()));
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(Error::Configuration(format!(
                "particle probabilities must sum to 1 (±{PROBABILITY_TOLERANCE}), got {sum}"
            )));
        }
        let index = WeightedIndex::new(&probabilities)
            .map_err(|e| Error::Configuration(format!("invalid particle weights: {e}")))?;
        Ok(Self { kinds, probabilities, index })
    }

    /// Parse a `name → probability` map. Names accept the aliases of [`ParticleType`].
    ///
    /// # Errors
    /// [`Error::UnsupportedParticle`] for unknown names, otherwise as [`Self::new`].
    pub fn from_names(map: &BTreeMap<String, f64>) -> Result<Self> {
        let entries = map
            .iter()
            .map(|(name, &p)| Ok((name.parse::<ParticleType>()?, p)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    /// Draw a particle type.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParticleType {
        self.kinds[self.index.sample(rng)]
    }

    /// `(type, probability)` pairs in input order.
    pub fn entries(&self) -> impl Iterator<Item = (ParticleType, f64)> + '_ {
        self.kinds.iter().copied().zip(self.probabilities.iter().copied())
    }
}

/// Incident energy distribution (GeV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnergyDistribution {
    /// Single energy.
    Fixed {
        /// Energy (GeV).
        value: f64,
    },
    /// Uniform in `[min, max]`.
    Uniform {
        /// Lower edge (GeV).
        min: f64,
        /// Upper edge (GeV).
        max: f64,
    },
    /// Uniform in `ln E` over `[min, max]`.
    LogUniform {
        /// Lower edge (GeV).
        min: f64,
        /// Upper edge (GeV).
        max: f64,
    },
    /// Uniform choice among a fixed set of energies.
    Discrete {
        /// Candidate energies (GeV).
        values: Vec<f64>,
    },
}

fn check_energy(what: &str, e: f64) -> Result<()> {
    if !e.is_finite() || e <= 0.0 {
        return Err(Error::Configuration(format!("{what} must be finite and > 0 GeV, got {e}")));
    }
    Ok(())
}

impl EnergyDistribution {
    /// Check that all energies are positive and ranges are ordered.
    pub fn validate(&self) -> Result<()> {
        match self {
            EnergyDistribution::Fixed { value } => check_energy("energy", *value),
            EnergyDistribution::Uniform { min, max } | EnergyDistribution::LogUniform { min, max } => {
                check_energy("energy min", *min)?;
                check_energy("energy max", *max)?;
                if min >= max {
                    return Err(Error::Configuration(format!(
                        "energy range must have min < max, got [{min}, {max}]"
                    )));
                }
                Ok(())
            }
            EnergyDistribution::Discrete { values } => {
                if values.is_empty() {
                    return Err(Error::Configuration("discrete energy set is empty".into()));
                }
                values.iter().try_for_each(|&v| check_energy("energy", v))
            }
        }
    }

    /// `(min, max)` of the support.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            EnergyDistribution::Fixed { value } => (*value, *value),
            EnergyDistribution::Uniform { min, max } | EnergyDistribution::LogUniform { min, max } => {
                (*min, *max)
            }
            EnergyDistribution::Discrete { values } => values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        }
    }

    /// Draw an energy. Assumes [`Self::validate`] passed.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            EnergyDistribution::Fixed { value } => *value,
            EnergyDistribution::Uniform { min, max } => rng.random_range(*min..=*max),
            EnergyDistribution::LogUniform { min, max } => {
                rng.random_range(min.ln()..=max.ln()).exp().clamp(*min, *max)
            }
            EnergyDistribution::Discrete { values } => values[rng.random_range(0..values.len())],
        }
    }
}

/// Direction of the incident particle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectionDistribution {
    /// Normal incidence.
    #[default]
    Axial,
    /// Fixed polar/azimuthal angles (radians).
    Fixed {
        /// Polar angle to the calorimeter axis.
        theta: f64,
        /// Azimuth.
        #[serde(default)]
        phi: f64,
    },
    /// Isotropic within a cone of half-angle `max_theta` around the axis.
    Cone {
        /// Half-angle (radians), `0 <= max_theta < π/2`.
        max_theta: f64,
    },
}

impl DirectionDistribution {
    /// Check angles.
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, theta: f64| {
            if !theta.is_finite() || !(0.0..PI / 2.0).contains(&theta) {
                return Err(Error::Configuration(format!(
                    "{name} must be in [0, π/2) radians, got {theta}"
                )));
            }
            Ok(())
        };
        match self {
            DirectionDistribution::Axial => Ok(()),
            DirectionDistribution::Fixed { theta, .. } => check("theta", *theta),
            DirectionDistribution::Cone { max_theta } => check("max_theta", *max_theta),
        }
    }

    /// Draw a direction. Assumes [`Self::validate`] passed.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Direction> {
        match self {
            DirectionDistribution::Axial => Ok(Direction::AXIAL),
            DirectionDistribution::Fixed { theta, phi } => Direction::from_angles(*theta, *phi),
            DirectionDistribution::Cone { max_theta } => {
                let cos_min = max_theta.cos();
                let cos_theta = rng.random_range(cos_min..=1.0);
                let phi = rng.random_range(0.0..2.0 * PI);
                Direction::from_angles(cos_theta.acos(), phi)
            }
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// Event-generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Particle type → probability (must sum to 1).
    pub particles: BTreeMap<String, f64>,
    /// Incident energy distribution.
    pub energy: EnergyDistribution,
    /// Direction distribution.
    #[serde(default)]
    pub direction: DirectionDistribution,
    /// Run seed; event `i` uses sub-stream `seed + i`.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Worker threads (0 = rayon default pool).
    #[serde(default)]
    pub threads: usize,
    /// Derived feature set.
    #[serde(default)]
    pub feature_set: FeatureSet,
}

impl SimulationConfig {
    /// Config with a particle mix and energy distribution, other fields defaulted.
    pub fn new(particles: impl IntoIterator<Item = (ParticleType, f64)>, energy: EnergyDistribution) -> Self {
        Self {
            particles: particles.into_iter().map(|(k, p)| (k.as_str().to_string(), p)).collect(),
            energy,
            direction: DirectionDistribution::Axial,
            seed: default_seed(),
            threads: 0,
            feature_set: FeatureSet::default(),
        }
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate and compile into a sampling plan.
    pub fn plan(&self) -> Result<SimulationPlan> {
        let particles = ParticleMix::from_names(&self.particles)?;
        self.energy.validate()?;
        self.direction.validate()?;
        Ok(SimulationPlan {
            particles,
            energy: self.energy.clone(),
            direction: self.direction.clone(),
            seed: self.seed,
            feature_set: self.feature_set,
        })
    }
}

/// Validated, ready-to-sample form of a [`SimulationConfig`].
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    /// Particle mix.
    pub particles: ParticleMix,
    /// Energy distribution.
    pub energy: EnergyDistribution,
    /// Direction distribution.
    pub direction: DirectionDistribution,
    /// Run seed.
    pub seed: u64,
    /// Feature set.
    pub feature_set: FeatureSet,
}
