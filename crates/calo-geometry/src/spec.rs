//! Geometry configuration input (JSON / YAML).
//!
//! A section is an ordered list of entries, each either a single layer or a
//! repeated period of layers:
//!
//! ```yaml
//! ecal:
//!   - { material: PbWO4, thickness: 1.0 }
//! hcal:
//!   - repeat: 5
//!     layers:
//!       - { material: Iron, thickness: 5.0 }
//! ```
//!
//! Thicknesses are in cm.

use serde::{Deserialize, Serialize};

use calo_core::{Error, Result};

use crate::geometry::GeometryModel;
use crate::material::MaterialLibrary;

/// One layer of a section: material name and thickness (cm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSpec {
    /// Material name, resolved through the [`MaterialLibrary`].
    pub material: String,
    /// Thickness along the calorimeter axis (cm).
    pub thickness: f64,
}

impl LayerSpec {
    /// Convenience constructor.
    pub fn new(material: impl Into<String>, thickness: f64) -> Self {
        Self { material: material.into(), thickness }
    }
}

/// Entry of a section description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionEntry {
    /// A single layer.
    Layer(LayerSpec),
    /// `layers` repeated `repeat` times, in order.
    Period {
        /// Number of repetitions (> 0).
        repeat: usize,
        /// Layers of one period.
        layers: Vec<LayerSpec>,
    },
}

/// Flatten section entries into an ordered list of layers.
pub fn expand_section(entries: &[SectionEntry]) -> Result<Vec<LayerSpec>> {
    let mut out = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match entry {
            SectionEntry::Layer(l) => out.push(l.clone()),
            SectionEntry::Period { repeat, layers } => {
                if *repeat == 0 || layers.is_empty() {
                    return Err(Error::Configuration(format!(
                        "section entry {i}: period must have repeat > 0 and at least one layer"
                    )));
                }
                for _ in 0..*repeat {
                    out.extend(layers.iter().cloned());
                }
            }
        }
    }
    Ok(out)
}

/// Full geometry description: ECAL then HCAL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometrySpec {
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ECAL section, front to back.
    pub ecal: Vec<SectionEntry>,
    /// HCAL section, front to back.
    pub hcal: Vec<SectionEntry>,
}

impl GeometrySpec {
    /// Spec from flat layer lists.
    pub fn from_layers(ecal: Vec<LayerSpec>, hcal: Vec<LayerSpec>) -> Self {
        Self {
            name: None,
            ecal: ecal.into_iter().map(SectionEntry::Layer).collect(),
            hcal: hcal.into_iter().map(SectionEntry::Layer).collect(),
        }
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build against the standard material library.
    pub fn build(&self) -> Result<GeometryModel> {
        self.build_with(MaterialLibrary::standard())
    }

    /// Build against an explicit material library.
    pub fn build_with(&self, library: &MaterialLibrary) -> Result<GeometryModel> {
        let ecal = expand_section(&self.ecal)?;
        let hcal = expand_section(&self.hcal)?;
        let model = GeometryModel::build_with(library, &ecal, &hcal)?;
        Ok(match &self.name {
            Some(name) => model.with_name(name.clone()),
            None => model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_periods() {
        let entries = vec![
            SectionEntry::Layer(LayerSpec::new("Pb", 0.5)),
            SectionEntry::Period {
                repeat: 3,
                layers: vec![LayerSpec::new("Fe", 1.0), LayerSpec::new("Polystyrene", 0.5)],
            },
        ];
        let flat = expand_section(&entries).unwrap();
        assert_eq!(flat.len(), 7);
        assert_eq!(flat[0].material, "Pb");
        assert_eq!(flat[1].material, "Fe");
        assert_eq!(flat[6].material, "Polystyrene");
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let entries = vec![SectionEntry::Period { repeat: 0, layers: vec![LayerSpec::new("Fe", 1.0)] }];
        assert!(matches!(expand_section(&entries), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_yaml_input_with_periods() {
        let yaml = r#"
name: toy
ecal:
  - { material: PbWO4, thickness: 1.0 }
  - { material: PbWO4, thickness: 1.0 }
hcal:
  - repeat: 5
    layers:
      - { material: Iron, thickness: 5.0 }
"#;
        let spec: GeometrySpec = serde_yaml_ng::from_str(yaml).unwrap();
        let geo = spec.build().unwrap();
        assert_eq!(geo.name(), Some("toy"));
        assert_eq!(geo.layer_count(), 7);
    }

    #[test]
    fn test_json_input() {
        let json = r#"{"ecal":[{"material":"Pb","thickness":0.2}],"hcal":[{"material":"Fe","thickness":2.0}]}"#;
        let spec: GeometrySpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.build().unwrap().layer_count(), 2);
    }

    #[test]
    fn test_misspelled_keys_rejected() {
        let layer = r#"{ material: Iron, thicknes: 5.0 }"#;
        assert!(serde_yaml_ng::from_str::<LayerSpec>(layer).is_err());

        let yaml = r#"
ecal: [{ material: PbWO4, thickness: 1.0, thicknes: 2.0 }]
hcal: [{ material: Iron, thickness: 5.0 }]
"#;
        assert!(serde_yaml_ng::from_str::<GeometrySpec>(yaml).is_err());

        let yaml = r#"
nmae: toy
ecal: [{ material: PbWO4, thickness: 1.0 }]
hcal: [{ material: Iron, thickness: 5.0 }]
"#;
        assert!(serde_yaml_ng::from_str::<GeometrySpec>(yaml).is_err());
    }
}
