//! Named reference detector layouts.
//!
//! Each design is a parameter struct whose `Default` reproduces the
//! reference layout and whose `to_spec()` emits a [`GeometrySpec`]. HCALs
//! are graded Fe/scintillator sandwiches of roughly 2 m total length.

use calo_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::spec::{GeometrySpec, LayerSpec, SectionEntry};

/// Absorber/active pair repeated `pairs` times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingPeriod {
    /// Number of (absorber, active) pairs.
    pub pairs: usize,
    /// Absorber thickness per pair (cm).
    pub absorber: f64,
    /// Active thickness per pair (cm).
    pub active: f64,
}

impl SamplingPeriod {
    const fn new(pairs: usize, absorber: f64, active: f64) -> Self {
        Self { pairs, absorber, active }
    }

    fn length(&self) -> f64 {
        self.pairs as f64 * (self.absorber + self.active)
    }

    fn entry(&self, absorber: &str, active: &str) -> SectionEntry {
        SectionEntry::Period {
            repeat: self.pairs,
            layers: vec![LayerSpec::new(absorber, self.absorber), LayerSpec::new(active, self.active)],
        }
    }
}

fn graded_hcal(sections: &[SamplingPeriod], absorber: &str, active: &str) -> Vec<SectionEntry> {
    sections.iter().filter(|s| s.pairs > 0).map(|s| s.entry(absorber, active)).collect()
}

/// Homogeneous PbWO4 ECAL (sliced for layer resolution) + graded Fe/scint HCAL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PbWo4FeScintV1 {
    /// ECAL depth in radiation lengths.
    pub total_x0: f64,
    /// Number of ECAL slices.
    pub ecal_slices: usize,
    /// HCAL front section.
    pub front: SamplingPeriod,
    /// HCAL middle section.
    pub mid: SamplingPeriod,
    /// HCAL back section.
    pub back: SamplingPeriod,
}

impl Default for PbWo4FeScintV1 {
    fn default() -> Self {
        Self {
            total_x0: 26.0,
            ecal_slices: 30,
            front: SamplingPeriod::new(16, 0.8, 0.8),
            mid: SamplingPeriod::new(32, 1.2, 0.6),
            back: SamplingPeriod::new(47, 1.5, 0.5),
        }
    }
}

impl PbWo4FeScintV1 {
    /// PbWO4 radiation length used to size the ECAL (cm).
    const PBWO4_X0: f64 = 0.89;

    /// Emit the geometry spec.
    pub fn to_spec(&self) -> GeometrySpec {
        let ecal_len = self.total_x0 * Self::PBWO4_X0;
        let slices = self.ecal_slices.max(1);
        let slice = ecal_len / slices as f64;
        GeometrySpec {
            name: Some("pbwo4_fe_scint_v1".into()),
            ecal: vec![SectionEntry::Period {
                repeat: slices,
                layers: vec![LayerSpec::new("PbWO4", slice)],
            }],
            hcal: graded_hcal(&[self.front, self.mid, self.back], "Fe", "Polystyrene"),
        }
    }
}

/// Pb/scint sampling ECAL + graded Fe/scint HCAL with a thin-Fe transition section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PbScintFeScintV2 {
    /// ECAL Pb/scint sampling.
    pub ecal: SamplingPeriod,
    /// HCAL transition section.
    pub front: SamplingPeriod,
    /// HCAL middle section.
    pub mid: SamplingPeriod,
    /// HCAL back section.
    pub back: SamplingPeriod,
}

impl Default for PbScintFeScintV2 {
    fn default() -> Self {
        Self {
            ecal: SamplingPeriod::new(60, 0.20, 0.20),
            front: SamplingPeriod::new(18, 0.5, 1.0),
            mid: SamplingPeriod::new(28, 1.0, 0.7),
            back: SamplingPeriod::new(50, 1.5, 0.5),
        }
    }
}

impl PbScintFeScintV2 {
    /// Emit the geometry spec.
    pub fn to_spec(&self) -> GeometrySpec {
        GeometrySpec {
            name: Some("pb_scint_fe_scint_v2".into()),
            ecal: vec![self.ecal.entry("Pb", "Polystyrene")],
            hcal: graded_hcal(&[self.front, self.mid, self.back], "Fe", "Polystyrene"),
        }
    }
}

/// Triple-period ECAL `[Pb, scint, PbWO4]` with a scint end-cap, transition
/// HCAL, and a passive Fe shim padding the stack to `target_total_len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripleEcalFeScintV4_2 {
    /// Number of ECAL triplets.
    pub ecal_periods: usize,
    /// Pb thickness per triplet (cm).
    pub pb: f64,
    /// Scintillator thickness per triplet (cm).
    pub scint: f64,
    /// PbWO4 thickness per triplet (cm).
    pub pbwo4: f64,
    /// Add one scintillator layer after the last triplet.
    pub scint_endcap: bool,
    /// HCAL transition section.
    pub transition: SamplingPeriod,
    /// HCAL middle section.
    pub mid: SamplingPeriod,
    /// HCAL back section.
    pub back: SamplingPeriod,
    /// Target total stack length (cm).
    pub target_total_len: f64,
}

impl Default for TripleEcalFeScintV4_2 {
    fn default() -> Self {
        Self {
            ecal_periods: 60,
            pb: 0.15,
            scint: 0.20,
            pbwo4: 0.10,
            scint_endcap: true,
            transition: SamplingPeriod::new(8, 0.30, 1.20),
            mid: SamplingPeriod::new(24, 1.00, 0.70),
            back: SamplingPeriod::new(50, 1.50, 0.50),
            target_total_len: 200.0,
        }
    }
}

impl TripleEcalFeScintV4_2 {
    /// Emit the geometry spec.
    pub fn to_spec(&self) -> GeometrySpec {
        let mut ecal = vec![SectionEntry::Period {
            repeat: self.ecal_periods,
            layers: vec![
                LayerSpec::new("Pb", self.pb),
                LayerSpec::new("Polystyrene", self.scint),
                LayerSpec::new("PbWO4", self.pbwo4),
            ],
        }];
        let mut ecal_len = self.ecal_periods as f64 * (self.pb + self.scint + self.pbwo4);
        if self.scint_endcap {
            ecal.push(SectionEntry::Layer(LayerSpec::new("Polystyrene", self.scint)));
            ecal_len += self.scint;
        }

        let sections = [self.transition, self.mid, self.back];
        let mut hcal = graded_hcal(&sections, "Fe", "Polystyrene");
        let total_len = ecal_len + sections.iter().map(SamplingPeriod::length).sum::<f64>();

        let leftover = self.target_total_len - total_len;
        if leftover > 1e-6 {
            hcal.push(SectionEntry::Layer(LayerSpec::new("Fe", leftover)));
        }

        GeometrySpec { name: Some("triple_ecal_fe_scint_v4_2".into()), ecal, hcal }
    }
}

/// Names and one-line descriptions of the built-in designs.
pub const REFERENCE_DESIGNS: &[(&str, &str)] = &[
    ("pbwo4_fe_scint_v1", "26 X0 PbWO4 ECAL in 30 slices + graded Fe/scint HCAL (~200 cm)"),
    ("pb_scint_fe_scint_v2", "Pb/scint sampling ECAL (~24 cm) + graded Fe/scint HCAL (~199 cm)"),
    ("triple_ecal_fe_scint_v4_2", "Pb/scint/PbWO4 triplet ECAL + transition Fe/scint HCAL, 200 cm"),
];

/// Default spec of a named reference design.
pub fn reference_design(name: &str) -> Result<GeometrySpec> {
    match name {
        "pbwo4_fe_scint_v1" => Ok(PbWo4FeScintV1::default().to_spec()),
        "pb_scint_fe_scint_v2" => Ok(PbScintFeScintV2::default().to_spec()),
        "triple_ecal_fe_scint_v4_2" => Ok(TripleEcalFeScintV4_2::default().to_spec()),
        other => {
            let known: Vec<&str> = REFERENCE_DESIGNS.iter().map(|(n, _)| *n).collect();
            Err(Error::Configuration(format!(
                "unknown reference design '{other}' (known: {})",
                known.join(", ")
            )))
        }
    }
}

/// Geometry source in a run configuration: a named design or an inline spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometrySource {
    /// `{ design: <name> }`
    Design {
        /// Reference design name.
        design: String,
    },
    /// Inline `{ ecal: [...], hcal: [...] }`.
    Inline(GeometrySpec),
}

impl GeometrySource {
    /// Resolve to a concrete spec.
    pub fn resolve(&self) -> Result<GeometrySpec> {
        match self {
            GeometrySource::Design { design } => reference_design(design),
            GeometrySource::Inline(spec) => Ok(spec.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calo_core::Section;

    #[test]
    fn test_all_reference_designs_build() {
        for (name, _) in REFERENCE_DESIGNS {
            let geo = reference_design(name).unwrap().build().unwrap();
            assert_eq!(geo.name(), Some(*name));
            assert!(geo.section_len(Section::Ecal) > 0);
            assert!(geo.section_len(Section::Hcal) > 0);
        }
        assert!(matches!(reference_design("nope"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_v1_dimensions() {
        let geo = PbWo4FeScintV1::default().to_spec().build().unwrap();
        assert_eq!(geo.section_len(Section::Ecal), 30);
        assert!((geo.total_depth(Section::Ecal) - 26.0 * 0.89).abs() < 1e-9);
        assert!((geo.depth_radiation_lengths(Section::Ecal) - 26.0).abs() < 1e-9);
        let hcal_len = 16.0 * 1.6 + 32.0 * 1.8 + 47.0 * 2.0;
        assert!((geo.total_depth(Section::Hcal) - hcal_len).abs() < 1e-9);
        assert_eq!(geo.section_len(Section::Hcal), 2 * (16 + 32 + 47));
    }

    #[test]
    fn test_v2_dimensions() {
        let geo = PbScintFeScintV2::default().to_spec().build().unwrap();
        assert_eq!(geo.section_len(Section::Ecal), 120);
        assert!((geo.total_depth(Section::Ecal) - 24.0).abs() < 1e-9);
        let total = geo.total_depth(Section::Ecal) + geo.total_depth(Section::Hcal);
        assert!((total - 198.6).abs() < 1e-9);
    }

    #[test]
    fn test_v4_2_shim_reaches_target() {
        let geo = TripleEcalFeScintV4_2::default().to_spec().build().unwrap();
        assert_eq!(geo.section_len(Section::Ecal), 181);
        let total = geo.total_depth(Section::Ecal) + geo.total_depth(Section::Hcal);
        assert!((total - 200.0).abs() < 1e-9);
        let last = geo.layers(Section::Hcal).last().unwrap();
        assert_eq!(last.material().name, "Fe");
        assert!((last.thickness() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_source_untagged() {
        let s: GeometrySource = serde_yaml_ng::from_str("design: pb_scint_fe_scint_v2").unwrap();
        assert_eq!(s.resolve().unwrap().name.as_deref(), Some("pb_scint_fe_scint_v2"));

        let s: GeometrySource = serde_yaml_ng::from_str(
            "ecal: [{material: Pb, thickness: 0.5}]\nhcal: [{material: Fe, thickness: 2.0}]",
        )
        .unwrap();
        assert!(matches!(s, GeometrySource::Inline(_)));
    }
}
