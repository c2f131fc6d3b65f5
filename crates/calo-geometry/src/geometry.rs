//! Layered ECAL + HCAL geometry.

use std::sync::Arc;

use calo_core::{Error, Result, Section};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::material::{Material, MaterialLibrary};
use crate::spec::LayerSpec;

/// One layer of a calorimeter section.
#[derive(Debug, Clone)]
pub struct Layer {
    material: Arc<Material>,
    thickness: f64,
    index: usize,
}

impl Layer {
    /// Material of this layer (shared with the library).
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Thickness along the axis (cm).
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// 0-based position within its section.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Thickness in radiation lengths.
    pub fn radiation_lengths(&self) -> f64 {
        self.material.in_radiation_lengths(self.thickness)
    }

    /// Thickness in interaction lengths.
    pub fn interaction_lengths(&self) -> f64 {
        self.material.in_interaction_lengths(self.thickness)
    }
}

/// Immutable calorimeter geometry: an ECAL stack followed by an HCAL stack.
///
/// Layer indices are contiguous from 0 within each section and both sections
/// are non-empty. A SHA-256 hash of the resolved layer list identifies the
/// configuration in dataset metadata.
#[derive(Debug, Clone)]
pub struct GeometryModel {
    name: Option<String>,
    ecal: Vec<Layer>,
    hcal: Vec<Layer>,
    hash: String,
}

#[derive(Serialize)]
struct CanonicalLayer<'a> {
    material: &'a str,
    thickness: f64,
}

#[derive(Serialize)]
struct CanonicalGeometry<'a> {
    ecal: Vec<CanonicalLayer<'a>>,
    hcal: Vec<CanonicalLayer<'a>>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut s = String::with_capacity(64);
    for b in out {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn canonical(layers: &[Layer]) -> Vec<CanonicalLayer<'_>> {
    layers
        .iter()
        .map(|l| CanonicalLayer { material: &l.material.name, thickness: l.thickness })
        .collect()
}

fn build_section(
    library: &MaterialLibrary,
    section: Section,
    spec: &[LayerSpec],
) -> Result<Vec<Layer>> {
    if spec.is_empty() {
        return Err(Error::Configuration(format!("{section} section must have at least one layer")));
    }
    spec.iter()
        .enumerate()
        .map(|(index, l)| {
            if !l.thickness.is_finite() || l.thickness <= 0.0 {
                return Err(Error::Configuration(format!(
                    "{section} layer {index}: thickness must be finite and > 0, got {}",
                    l.thickness
                )));
            }
            let material = library
                .lookup(&l.material)
                .map_err(|e| Error::Configuration(format!("{section} layer {index}: {e}")))?;
            Ok(Layer { material, thickness: l.thickness, index })
        })
        .collect()
}

impl GeometryModel {
    /// Build from ordered `(material, thickness)` lists using the standard library.
    ///
    /// # Errors
    /// [`Error::Configuration`] if a section is empty, a thickness is not > 0,
    /// or a material is unknown.
    pub fn build(ecal_spec: &[LayerSpec], hcal_spec: &[LayerSpec]) -> Result<Self> {
        Self::build_with(MaterialLibrary::standard(), ecal_spec, hcal_spec)
    }

    /// Build against an explicit material library.
    pub fn build_with(
        library: &MaterialLibrary,
        ecal_spec: &[LayerSpec],
        hcal_spec: &[LayerSpec],
    ) -> Result<Self> {
        let ecal = build_section(library, Section::Ecal, ecal_spec)?;
        let hcal = build_section(library, Section::Hcal, hcal_spec)?;

        let bytes =
            serde_json::to_vec(&CanonicalGeometry { ecal: canonical(&ecal), hcal: canonical(&hcal) })?;
        let hash = sha256_hex(&bytes);

        Ok(Self { name: None, ecal, hcal, hash })
    }

    pub(crate) fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Optional configuration name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Hex SHA-256 of the resolved layer list (canonical material names + thicknesses).
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Total number of layers over both sections.
    pub fn layer_count(&self) -> usize {
        self.ecal.len() + self.hcal.len()
    }

    /// Number of layers in one section.
    pub fn section_len(&self, section: Section) -> usize {
        self.layers(section).len()
    }

    /// Layers of one section, front to back.
    pub fn layers(&self, section: Section) -> &[Layer] {
        match section {
            Section::Ecal => &self.ecal,
            Section::Hcal => &self.hcal,
        }
    }

    /// Layer `index` of `section`, or `None` if out of range.
    pub fn layer_at(&self, section: Section, index: usize) -> Option<&Layer> {
        self.layers(section).get(index)
    }

    /// All layers in beam order (ECAL then HCAL).
    pub fn iter_layers(&self) -> impl Iterator<Item = &Layer> {
        self.ecal.iter().chain(self.hcal.iter())
    }

    /// Summed thickness of a section (cm).
    pub fn total_depth(&self, section: Section) -> f64 {
        self.layers(section).iter().map(|l| l.thickness).sum()
    }

    /// Depth of a section in radiation lengths.
    pub fn depth_radiation_lengths(&self, section: Section) -> f64 {
        self.layers(section).iter().map(Layer::radiation_lengths).sum()
    }

    /// Depth of a section in interaction lengths.
    pub fn depth_interaction_lengths(&self, section: Section) -> f64 {
        self.layers(section).iter().map(Layer::interaction_lengths).sum()
    }

    /// Layer list as input specs (canonical material names), e.g. for metadata.
    pub fn layer_specs(&self, section: Section) -> Vec<LayerSpec> {
        self.layers(section)
            .iter()
            .map(|l| LayerSpec::new(l.material.name.clone(), l.thickness))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_specs() -> (Vec<LayerSpec>, Vec<LayerSpec>) {
        let ecal = vec![LayerSpec::new("PbWO4", 1.0); 10];
        let hcal = vec![LayerSpec::new("Iron", 5.0); 5];
        (ecal, hcal)
    }

    #[test]
    fn test_layer_count_and_indices() {
        let (ecal, hcal) = reference_specs();
        let geo = GeometryModel::build(&ecal, &hcal).unwrap();
        assert_eq!(geo.layer_count(), ecal.len() + hcal.len());
        for section in Section::ALL {
            for (i, l) in geo.layers(section).iter().enumerate() {
                assert_eq!(l.index(), i);
            }
        }
        assert_eq!(geo.layer_at(Section::Hcal, 4).unwrap().material().name, "Fe");
        assert!(geo.layer_at(Section::Hcal, 5).is_none());
    }

    #[test]
    fn test_total_depth() {
        let (ecal, hcal) = reference_specs();
        let geo = GeometryModel::build(&ecal, &hcal).unwrap();
        assert!((geo.total_depth(Section::Ecal) - 10.0).abs() < 1e-12);
        assert!((geo.total_depth(Section::Hcal) - 25.0).abs() < 1e-12);
        assert!((geo.depth_radiation_lengths(Section::Ecal) - 10.0 / 0.89).abs() < 1e-9);
        assert!((geo.depth_interaction_lengths(Section::Hcal) - 25.0 / 16.8).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_specs() {
        let (ecal, hcal) = reference_specs();
        assert!(matches!(GeometryModel::build(&[], &hcal), Err(Error::Configuration(_))));
        assert!(matches!(GeometryModel::build(&ecal, &[]), Err(Error::Configuration(_))));

        let bad_thickness = vec![LayerSpec::new("Pb", 0.0)];
        assert!(matches!(GeometryModel::build(&bad_thickness, &hcal), Err(Error::Configuration(_))));

        let bad_material = vec![LayerSpec::new("Unobtainium", 1.0)];
        let err = GeometryModel::build(&ecal, &bad_material).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("Unobtainium")));
    }

    #[test]
    fn test_hash_uses_canonical_names() {
        let (ecal, hcal) = reference_specs();
        let a = GeometryModel::build(&ecal, &hcal).unwrap();
        let hcal_g4: Vec<LayerSpec> = vec![LayerSpec::new("G4_Fe", 5.0); 5];
        let b = GeometryModel::build(&ecal, &hcal_g4).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);

        let hcal_thin = vec![LayerSpec::new("Fe", 4.0); 5];
        let c = GeometryModel::build(&ecal, &hcal_thin).unwrap();
        assert_ne!(a.hash(), c.hash());
    }
}
