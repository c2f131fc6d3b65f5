//! Stochastic per-layer energy deposition.

use calo_core::{DepositionProfile, Error, Particle, Result, Section};
use calo_geometry::GeometryModel;
use rand::RngCore;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::profile::{GammaProfile, em_fraction, em_profile, hadronic_profile};

/// Shower model abstraction used by the event simulator.
pub trait ShowerModel: Send + Sync {
    /// Sample one deposition profile for `particle` traversing `geometry`.
    fn sample(
        &self,
        particle: &Particle,
        geometry: &GeometryModel,
        rng: &mut dyn RngCore,
    ) -> Result<DepositionProfile>;

    /// Model name, recorded in run metadata.
    fn name(&self) -> &str;
}

/// Resolution and response parameters of the parametric sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Stochastic term for EM showers (√GeV): per-layer `σ² = s² · μ`.
    pub em_stochastic: f64,
    /// Stochastic term for hadronic showers (√GeV).
    pub hadronic_stochastic: f64,
    /// Visible response of the non-EM part of hadronic showers relative to EM (h/e).
    pub h_over_e: f64,
    /// Upper bound on the contained fraction.
    pub max_containment: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { em_stochastic: 0.10, hadronic_stochastic: 0.50, h_over_e: 0.7, max_containment: 0.999 }
    }
}

impl SamplerConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let stochastic =
            [("em_stochastic", self.em_stochastic), ("hadronic_stochastic", self.hadronic_stochastic)];
        for (name, v) in stochastic {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Configuration(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        if !(self.h_over_e > 0.0 && self.h_over_e <= 1.0) {
            return Err(Error::Configuration(format!(
                "h_over_e must be in (0, 1], got {}",
                self.h_over_e
            )));
        }
        if !(self.max_containment > 0.0 && self.max_containment < 1.0) {
            return Err(Error::Configuration(format!(
                "max_containment must be in (0, 1), got {}",
                self.max_containment
            )));
        }
        Ok(())
    }
}

/// Cumulative layer boundaries (depth from the front face) in units of
/// `length(layer)`, stretched by the path-length factor `1 / cos θ`.
fn layer_edges<F>(geometry: &GeometryModel, cos_theta: f64, length: F) -> Vec<f64>
where
    F: Fn(&calo_geometry::Layer) -> f64,
{
    let mut edges = Vec::with_capacity(geometry.layer_count() + 1);
    let mut t = 0.0;
    edges.push(t);
    for layer in geometry.iter_layers() {
        t += layer.thickness() / (length(layer) * cos_theta);
        edges.push(t);
    }
    edges
}

/// Radiation-length weighted critical energy of the ECAL materials (GeV).
pub fn effective_critical_energy(geometry: &GeometryModel) -> f64 {
    let (num, den) = geometry.layers(Section::Ecal).iter().fold((0.0, 0.0), |(n, d), l| {
        let w = l.radiation_lengths();
        (n + w * l.material().critical_energy, d + w)
    });
    num / den
}

/// Parametric shower sampler.
///
/// The mean profile is deterministic in (particle, energy, direction,
/// geometry); fluctuations are drawn from the supplied generator only.
#[derive(Debug, Clone, Default)]
pub struct ShowerSampler {
    config: SamplerConfig,
}

impl ShowerSampler {
    /// Sampler with validated parameters.
    pub fn new(config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Parameters.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Mean per-layer deposits (GeV), ECAL then HCAL.
    ///
    /// The summed fraction is the containment of the whole stack, capped at
    /// `max_containment`. Hadronic showers are further scaled by the visible
    /// response `f_em + (1 − f_em) · h/e`.
    pub fn expected_profile(&self, particle: &Particle, geometry: &GeometryModel) -> Result<Vec<f64>> {
        let energy = particle.initial_energy;
        if !energy.is_finite() || energy <= 0.0 {
            return Err(Error::InvalidEnergy(energy));
        }
        let cos_theta = particle.direction.cos_theta();

        let (fractions, response) = if particle.kind.is_electromagnetic() {
            let profile = em_profile(particle.kind, energy, effective_critical_energy(geometry))?;
            let edges = layer_edges(geometry, cos_theta, |l| l.material().radiation_length);
            (profile.layer_fractions(&edges), 1.0)
        } else {
            let profile: GammaProfile = hadronic_profile(energy)?;
            let edges = layer_edges(geometry, cos_theta, |l| l.material().interaction_length);
            let f_em = em_fraction(energy);
            (profile.layer_fractions(&edges), f_em + (1.0 - f_em) * self.config.h_over_e)
        };

        let containment: f64 = fractions.iter().sum();
        let scale = if containment > self.config.max_containment {
            self.config.max_containment / containment
        } else {
            1.0
        };

        Ok(fractions.into_iter().map(|f| energy * response * f * scale).collect())
    }

    /// Sample a fluctuated profile.
    ///
    /// Each layer gets independent `N(0, s² μ)` noise; negative deposits are
    /// clipped to zero and the total is capped at the incident energy.
    pub fn sample_with<R: rand::Rng + ?Sized>(
        &self,
        particle: &Particle,
        geometry: &GeometryModel,
        rng: &mut R,
    ) -> Result<DepositionProfile> {
        let means = self.expected_profile(particle, geometry)?;
        let s = if particle.kind.is_electromagnetic() {
            self.config.em_stochastic
        } else {
            self.config.hadronic_stochastic
        };

        let mut deposits = Vec::with_capacity(means.len());
        for mu in means {
            let sigma = s * mu.sqrt();
            let noise = if sigma > 0.0 {
                let normal = Normal::new(0.0, sigma)
                    .map_err(|e| Error::Validation(format!("invalid fluctuation width {sigma}: {e}")))?;
                normal.sample(rng)
            } else {
                0.0
            };
            deposits.push(mu + noise);
        }

        DepositionProfile::new(deposits, geometry.section_len(Section::Ecal), particle.initial_energy)
    }
}

impl ShowerModel for ShowerSampler {
    fn sample(
        &self,
        particle: &Particle,
        geometry: &GeometryModel,
        rng: &mut dyn RngCore,
    ) -> Result<DepositionProfile> {
        self.sample_with(particle, geometry, rng)
    }

    fn name(&self) -> &str {
        "gamma_profile_v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calo_core::{Direction, ParticleType};
    use calo_geometry::LayerSpec;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn reference_geometry() -> GeometryModel {
        GeometryModel::build(
            &vec![LayerSpec::new("PbWO4", 1.0); 10],
            &vec![LayerSpec::new("Iron", 5.0); 5],
        )
        .unwrap()
    }

    #[test]
    fn test_photon_reference_scenario() {
        let geo = reference_geometry();
        let sampler = ShowerSampler::default();
        let photon = Particle::axial(ParticleType::Photon, 10.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let p = sampler.sample_with(&photon, &geo, &mut rng).unwrap();

        assert_eq!(p.len(), 15);
        assert!(p.per_layer_energy().iter().all(|&e| e >= 0.0));
        assert!(p.total() <= 10.0);
        assert!(p.section_total(Section::Ecal) > p.section_total(Section::Hcal));

        let mut rng = StdRng::seed_from_u64(42);
        let q = sampler.sample_with(&photon, &geo, &mut rng).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn test_expected_profile_contained() {
        let geo = reference_geometry();
        let sampler = ShowerSampler::default();
        for kind in ParticleType::ALL {
            for e in [0.5, 5.0, 50.0, 500.0] {
                let particle = Particle::axial(kind, e).unwrap();
                let means = sampler.expected_profile(&particle, &geo).unwrap();
                let total: f64 = means.iter().sum();
                assert!(total > 0.0 && total < e, "{kind} at {e} GeV: total {total}");
                assert!(means.iter().all(|&m| m >= 0.0));
            }
        }
    }

    #[test]
    fn test_pion_deeper_than_photon() {
        let geo = reference_geometry();
        let sampler = ShowerSampler::default();
        let frac_hcal = |kind| {
            let p = Particle::axial(kind, 20.0).unwrap();
            let m = sampler.expected_profile(&p, &geo).unwrap();
            let hcal: f64 = m[10..].iter().sum();
            hcal / m.iter().sum::<f64>()
        };
        assert!(frac_hcal(ParticleType::ChargedPion) > frac_hcal(ParticleType::Photon));
    }

    #[test]
    fn test_inclined_track_starts_shower_earlier() {
        let geo = reference_geometry();
        let sampler = ShowerSampler::default();
        let axial = Particle::axial(ParticleType::Photon, 10.0).unwrap();
        let inclined =
            Particle::new(ParticleType::Photon, 10.0, Direction::from_angles(0.8, 0.0).unwrap())
                .unwrap();
        let a = sampler.expected_profile(&axial, &geo).unwrap();
        let b = sampler.expected_profile(&inclined, &geo).unwrap();
        let ecal = |m: &[f64]| m[..10].iter().sum::<f64>();
        assert!(ecal(&b) > ecal(&a));
    }

    #[test]
    fn test_fluctuated_sum_never_exceeds_energy() {
        let geo = reference_geometry();
        let sampler = ShowerSampler::new(SamplerConfig {
            em_stochastic: 2.0,
            hadronic_stochastic: 2.0,
            ..SamplerConfig::default()
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for kind in ParticleType::ALL {
            for _ in 0..200 {
                let p = Particle::axial(kind, 2.0).unwrap();
                let d = sampler.sample_with(&p, &geo, &mut rng).unwrap();
                assert!(d.per_layer_energy().iter().all(|&e| e >= 0.0));
                assert!(d.total() <= 2.0);
            }
        }
    }

    #[test]
    fn test_low_energy_photons_stay_within_energy() {
        let geo = calo_geometry::reference_design("pbwo4_fe_scint_v1").unwrap().build().unwrap();
        let sampler = ShowerSampler::default();
        let mut rng = StdRng::seed_from_u64(42);
        for step in 0..50 {
            let energy = 1.0 + 0.01 * step as f64;
            let p = Particle::axial(ParticleType::Photon, energy).unwrap();
            for _ in 0..200 {
                let d = sampler.sample_with(&p, &geo, &mut rng).unwrap();
                assert!(d.total() <= energy, "sum {} exceeds {energy}", d.total());
            }
        }
    }

    #[test]
    fn test_trait_object_sampling() {
        let geo = reference_geometry();
        let model: Box<dyn ShowerModel> = Box::new(ShowerSampler::default());
        let mut rng = StdRng::seed_from_u64(1);
        let p = Particle::axial(ParticleType::Proton, 30.0).unwrap();
        let d = model.sample(&p, &geo, &mut rng).unwrap();
        assert_eq!(d.n_ecal(), 10);
        assert_eq!(model.name(), "gamma_profile_v1");
    }

    #[test]
    fn test_invalid_config() {
        let bad = SamplerConfig { max_containment: 1.0, ..SamplerConfig::default() };
        assert!(matches!(ShowerSampler::new(bad), Err(Error::Configuration(_))));
        let bad = SamplerConfig { h_over_e: 0.0, ..SamplerConfig::default() };
        assert!(ShowerSampler::new(bad).is_err());
    }
}
