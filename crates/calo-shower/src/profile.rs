//! Longitudinal shower profiles.
//!
//! The mean energy deposited per unit depth follows the gamma form
//!
//! `dE/dt = E · b (b t)^(a-1) e^(-b t) / Γ(a)`
//!
//! with `t` the depth in characteristic lengths (X0 for EM showers, λ_I for
//! hadronic ones). The fraction of the energy deposited in `[t_lo, t_hi]` is
//! `P(a, b t_hi) − P(a, b t_lo)`, `P` being the regularized lower incomplete
//! gamma function.

use calo_core::{Error, ParticleType, Result};
use statrs::function::gamma::{gamma_lr, ln_gamma};

/// Smallest accepted shape parameter. Keeps the profile peaked at `t > 0`.
pub const MIN_SHAPE: f64 = 1.0 + 1e-3;

/// EM slope parameter `b`.
pub const EM_SLOPE: f64 = 0.5;

/// Hadronic slope parameter `b` (λ_I units).
pub const HADRONIC_SLOPE: f64 = 1.0;

/// Exponent `k` of the EM-fraction power law `f_em = 1 − (E / E0)^(k−1)`.
pub const EM_FRACTION_EXPONENT: f64 = 0.82;

/// Scale `E0` (GeV) of the EM-fraction power law.
pub const EM_FRACTION_SCALE: f64 = 1.0;

/// Gamma-shaped longitudinal profile with `shape` (a) and `rate` (b).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaProfile {
    shape: f64,
    rate: f64,
}

impl GammaProfile {
    /// Create a profile.
    ///
    /// Parameterization:
    /// - `shape > 0`
    /// - `rate > 0` (inverse scale, per characteristic length)
    pub fn new(shape: f64, rate: f64) -> Result<Self> {
        if !shape.is_finite() || shape <= 0.0 {
            return Err(Error::Validation(format!(
                "shape must be finite and > 0, got {}",
                shape
            )));
        }
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::Validation(format!("rate must be finite and > 0, got {}", rate)));
        }
        Ok(Self { shape, rate })
    }

    /// Profile peaking at depth `t_max`: `a = b · t_max + 1`, floored at [`MIN_SHAPE`].
    pub fn from_shower_max(t_max: f64, rate: f64) -> Result<Self> {
        if !t_max.is_finite() {
            return Err(Error::Validation(format!("t_max must be finite, got {}", t_max)));
        }
        Self::new((rate * t_max + 1.0).max(MIN_SHAPE), rate)
    }

    /// Shape parameter `a`.
    pub fn shape(&self) -> f64 {
        self.shape
    }

    /// Rate parameter `b`.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Depth of the profile maximum, `(a − 1) / b`.
    pub fn shower_max(&self) -> f64 {
        (self.shape - 1.0) / self.rate
    }

    /// Log of the normalized density `(1/E) dE/dt` at depth `t`.
    pub fn ln_density(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return f64::NEG_INFINITY;
        }
        self.shape * self.rate.ln() - ln_gamma(self.shape) + (self.shape - 1.0) * t.ln()
            - self.rate * t
    }

    /// Fraction of the energy deposited before depth `t`.
    pub fn cumulative(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        gamma_lr(self.shape, self.rate * t)
    }

    /// Fraction of the energy deposited between `t_lo` and `t_hi`.
    pub fn fraction_between(&self, t_lo: f64, t_hi: f64) -> f64 {
        (self.cumulative(t_hi) - self.cumulative(t_lo)).max(0.0)
    }

    /// Per-layer fractions for cumulative layer boundaries `edges` (`n + 1` entries, from 0).
    pub fn layer_fractions(&self, edges: &[f64]) -> Vec<f64> {
        edges.windows(2).map(|w| self.fraction_between(w[0], w[1])).collect()
    }
}

/// EM profile in radiation lengths for an electron/photon of `energy` GeV
/// in a medium of critical energy `critical_energy` GeV.
///
/// `t_max = ln(E / E_c) + C`, with `C = +0.5` for photons and `−0.5` for electrons.
pub fn em_profile(kind: ParticleType, energy: f64, critical_energy: f64) -> Result<GammaProfile> {
    if !energy.is_finite() || energy <= 0.0 {
        return Err(Error::InvalidEnergy(energy));
    }
    if !critical_energy.is_finite() || critical_energy <= 0.0 {
        return Err(Error::Validation(format!(
            "critical energy must be finite and > 0, got {}",
            critical_energy
        )));
    }
    let c = match kind {
        ParticleType::Photon => 0.5,
        _ => -0.5,
    };
    GammaProfile::from_shower_max((energy / critical_energy).ln() + c, EM_SLOPE)
}

/// Hadronic profile in interaction lengths: `t_max = 0.2 ln(E / GeV) + 0.7`.
pub fn hadronic_profile(energy: f64) -> Result<GammaProfile> {
    if !energy.is_finite() || energy <= 0.0 {
        return Err(Error::InvalidEnergy(energy));
    }
    GammaProfile::from_shower_max(0.2 * energy.ln() + 0.7, HADRONIC_SLOPE)
}

/// Average EM fraction of a hadronic shower, `1 − (E / E0)^(k−1)`, clamped to `[0, 1]`.
pub fn em_fraction(energy: f64) -> f64 {
    if energy <= EM_FRACTION_SCALE {
        return 0.0;
    }
    (1.0 - (energy / EM_FRACTION_SCALE).powf(EM_FRACTION_EXPONENT - 1.0)).clamp(0.0, 1.0)
}
