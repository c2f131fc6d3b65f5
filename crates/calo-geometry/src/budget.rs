//! Material budget of a geometry: thickness, X0, λ_I and cost per material.

use std::collections::BTreeMap;

use calo_core::{Error, Result, Section};
use serde::Serialize;

use crate::geometry::GeometryModel;

/// Per-material totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialUsage {
    /// Summed thickness (cm).
    pub total_cm: f64,
    /// Summed depth in radiation lengths.
    pub total_x0: f64,
    /// Summed depth in interaction lengths.
    pub total_lambda: f64,
    /// Cost over the configured area (CHF).
    pub total_cost_chf: f64,
}

/// Per-section depth summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionBudget {
    /// Number of layers.
    pub layers: usize,
    /// Depth (cm).
    pub depth_cm: f64,
    /// Depth in radiation lengths.
    pub depth_x0: f64,
    /// Depth in interaction lengths.
    pub depth_lambda: f64,
    /// Fraction of 1 MeV photons crossing the section unattenuated.
    pub photon_transmission: f64,
}

/// Material budget of a whole geometry over a transverse area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialBudget {
    /// Transverse area (m²).
    pub area_m2: f64,
    /// Usage keyed by canonical material name.
    pub by_material: BTreeMap<String, MaterialUsage>,
    /// ECAL summary.
    pub ecal: SectionBudget,
    /// HCAL summary.
    pub hcal: SectionBudget,
    /// Total length (cm).
    pub total_length_cm: f64,
    /// Total depth in radiation lengths.
    pub total_x0: f64,
    /// Total depth in interaction lengths.
    pub total_lambda: f64,
    /// Total cost (CHF).
    pub total_cost_chf: f64,
}

fn section_budget(geometry: &GeometryModel, section: Section) -> SectionBudget {
    let mu_t: f64 = geometry
        .layers(section)
        .iter()
        .map(|l| l.material().attenuation_coefficient * l.thickness())
        .sum();
    SectionBudget {
        layers: geometry.section_len(section),
        depth_cm: geometry.total_depth(section),
        depth_x0: geometry.depth_radiation_lengths(section),
        depth_lambda: geometry.depth_interaction_lengths(section),
        photon_transmission: (-mu_t).exp(),
    }
}

impl MaterialBudget {
    /// Accumulate the budget of `geometry` over `area_m2` of transverse area.
    pub fn from_geometry(geometry: &GeometryModel, area_m2: f64) -> Result<Self> {
        if !area_m2.is_finite() || area_m2 <= 0.0 {
            return Err(Error::Configuration(format!("area_m2 must be finite and > 0, got {area_m2}")));
        }

        let mut by_material: BTreeMap<String, MaterialUsage> = BTreeMap::new();
        for layer in geometry.iter_layers() {
            let m = layer.material();
            let row = by_material.entry(m.name.clone()).or_default();
            row.total_cm += layer.thickness();
            row.total_x0 += layer.radiation_lengths();
            row.total_lambda += layer.interaction_lengths();
            row.total_cost_chf += layer.thickness() * area_m2 * m.cost_per_cm_m2;
        }

        let ecal = section_budget(geometry, Section::Ecal);
        let hcal = section_budget(geometry, Section::Hcal);
        let total_cost_chf = by_material.values().map(|r| r.total_cost_chf).sum();

        Ok(Self {
            area_m2,
            total_length_cm: ecal.depth_cm + hcal.depth_cm,
            total_x0: ecal.depth_x0 + hcal.depth_x0,
            total_lambda: ecal.depth_lambda + hcal.depth_lambda,
            total_cost_chf,
            by_material,
            ecal,
            hcal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::LayerSpec;
    use approx::assert_relative_eq;

    #[test]
    fn test_budget_totals() {
        let ecal = vec![LayerSpec::new("Pb", 0.15); 96];
        let hcal = vec![LayerSpec::new("Fe", 2.0), LayerSpec::new("Polystyrene", 1.0)];
        let geo = GeometryModel::build(&ecal, &hcal).unwrap();
        let b = MaterialBudget::from_geometry(&geo, 0.25).unwrap();

        let pb = &b.by_material["Pb"];
        assert_relative_eq!(pb.total_cm, 14.4, epsilon = 1e-9);
        assert_relative_eq!(pb.total_x0, 14.4 / 0.56, epsilon = 1e-9);
        assert_relative_eq!(pb.total_cost_chf, 14.4 * 0.25 * 300.0, epsilon = 1e-6);
        assert_eq!(b.by_material["Polystyrene"].total_cost_chf, 0.0);

        assert_relative_eq!(b.total_length_cm, 17.4, epsilon = 1e-9);
        assert_relative_eq!(
            b.total_cost_chf,
            14.4 * 0.25 * 300.0 + 2.0 * 0.25 * 50.0,
            epsilon = 1e-6
        );
        assert_eq!(b.ecal.layers, 96);
        assert!(b.ecal.photon_transmission < b.hcal.photon_transmission);
    }

    #[test]
    fn test_budget_rejects_bad_area() {
        let geo = GeometryModel::build(&[LayerSpec::new("Pb", 1.0)], &[LayerSpec::new("Fe", 1.0)])
            .unwrap();
        assert!(MaterialBudget::from_geometry(&geo, 0.0).is_err());
    }
}
