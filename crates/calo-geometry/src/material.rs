//! Material constants and the process-wide material library.
//!
//! Lengths are in cm, densities in g/cm³, energies in GeV. Attenuation
//! coefficients are linear photon attenuation at 1 MeV (cm⁻¹).

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use calo_core::{Error, Result};
use serde::Serialize;

/// Immutable physical description of one absorber or active material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    /// Canonical name (e.g. `"PbWO4"`, `"Fe"`).
    pub name: String,
    /// Density (g/cm³).
    pub density: f64,
    /// Radiation length X0 (cm).
    pub radiation_length: f64,
    /// Nuclear interaction length λ_I (cm).
    pub interaction_length: f64,
    /// Linear photon attenuation coefficient at 1 MeV (cm⁻¹).
    pub attenuation_coefficient: f64,
    /// Critical energy E_c (GeV), where ionization and bremsstrahlung losses are equal.
    pub critical_energy: f64,
    /// Unit price per cm of thickness over 1 m² of transverse area (CHF).
    pub cost_per_cm_m2: f64,
}

impl Material {
    fn validate(&self) -> Result<()> {
        let physical = [
            ("density", self.density),
            ("radiation_length", self.radiation_length),
            ("interaction_length", self.interaction_length),
            ("attenuation_coefficient", self.attenuation_coefficient),
            ("critical_energy", self.critical_energy),
        ];
        for (field, value) in physical {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Configuration(format!(
                    "material '{}': {field} must be finite and > 0, got {value}",
                    self.name
                )));
            }
        }
        if !self.cost_per_cm_m2.is_finite() || self.cost_per_cm_m2 < 0.0 {
            return Err(Error::Configuration(format!(
                "material '{}': cost_per_cm_m2 must be finite and >= 0, got {}",
                self.name, self.cost_per_cm_m2
            )));
        }
        Ok(())
    }

    /// Thickness expressed in radiation lengths.
    pub fn in_radiation_lengths(&self, thickness: f64) -> f64 {
        thickness / self.radiation_length
    }

    /// Thickness expressed in interaction lengths.
    pub fn in_interaction_lengths(&self, thickness: f64) -> f64 {
        thickness / self.interaction_length
    }
}

/// `(name, density, X0, λ_I, μ(1 MeV), E_c, CHF/(cm·m²))`
const STANDARD_TABLE: &[(&str, f64, f64, f64, f64, f64, f64)] = &[
    ("PbWO4", 8.28, 0.89, 20.7, 0.571, 0.00964, 30000.0),
    ("Pb", 11.35, 0.56, 17.1, 0.805, 0.00743, 300.0),
    ("Fe", 7.874, 1.76, 16.8, 0.472, 0.02168, 50.0),
    ("W", 19.3, 0.35, 9.6, 1.278, 0.00797, 6000.0),
    ("Cu", 8.96, 1.43, 15.3, 0.527, 0.01942, 800.0),
    ("Brass", 8.52, 1.50, 15.0, 0.511, 0.02000, 200.0),
    ("Polystyrene", 1.06, 42.4, 77.0, 0.0727, 0.09311, 0.0),
];

const ALIASES: &[(&str, &str)] = &[
    ("iron", "Fe"),
    ("lead", "Pb"),
    ("tungsten", "W"),
    ("copper", "Cu"),
    ("scintillator", "Polystyrene"),
    ("scint", "Polystyrene"),
];

/// Read-only lookup table of materials.
///
/// Names are matched case-insensitively; a Geant4-style `G4_` prefix is
/// ignored and a few common aliases (`Iron`, `Lead`, `Scintillator`, ...)
/// resolve to their canonical entries.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    by_key: BTreeMap<String, Arc<Material>>,
    aliases: BTreeMap<String, String>,
}

fn normalize(name: &str) -> String {
    let trimmed = name.trim();
    let stripped = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("g4_") => &trimmed[3..],
        _ => trimmed,
    };
    stripped.to_ascii_lowercase()
}

impl MaterialLibrary {
    /// Build a library from a fixed list of materials.
    pub fn from_materials(materials: impl IntoIterator<Item = Material>) -> Result<Self> {
        let mut by_key = BTreeMap::new();
        for m in materials {
            m.validate()?;
            let key = normalize(&m.name);
            if by_key.insert(key, Arc::new(m.clone())).is_some() {
                return Err(Error::Configuration(format!("duplicate material '{}'", m.name)));
            }
        }
        Ok(Self { by_key, aliases: BTreeMap::new() })
    }

    fn standard_table() -> Self {
        let materials = STANDARD_TABLE.iter().map(|&(name, rho, x0, lam, mu, ec, cost)| Material {
            name: name.to_string(),
            density: rho,
            radiation_length: x0,
            interaction_length: lam,
            attenuation_coefficient: mu,
            critical_energy: ec,
            cost_per_cm_m2: cost,
        });
        let mut lib = Self::from_materials(materials).expect("built-in material table is valid");
        lib.aliases = ALIASES.iter().map(|&(a, c)| (a.to_string(), normalize(c))).collect();
        lib
    }

    /// The process-wide standard library, built once on first use.
    pub fn standard() -> &'static MaterialLibrary {
        static LIBRARY: OnceLock<MaterialLibrary> = OnceLock::new();
        LIBRARY.get_or_init(Self::standard_table)
    }

    /// Look up a material by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<Material>> {
        let key = normalize(name);
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.by_key.get(key).cloned().ok_or_else(|| Error::UnknownMaterial(name.to_string()))
    }

    /// Canonical material names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.by_key.values().map(|m| m.name.as_str()).collect()
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// `true` if the library holds no materials.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
