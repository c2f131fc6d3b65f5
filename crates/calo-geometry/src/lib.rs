//! # calo-geometry
//!
//! Materials and layered calorimeter geometry for CaloSim.
//!
//! - [`MaterialLibrary`]: fixed table of physical constants, looked up by name.
//! - [`GeometryModel`]: immutable ECAL + HCAL layer stacks built from a
//!   [`GeometrySpec`] (JSON/YAML) or from flat `(material, thickness)` lists.
//! - [`designs`]: named reference layouts.
//! - [`MaterialBudget`]: thickness / X0 / λ_I / cost accounting.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod designs;
pub mod geometry;
pub mod material;
pub mod spec;

pub use budget::{MaterialBudget, MaterialUsage, SectionBudget};
pub use designs::{GeometrySource, REFERENCE_DESIGNS, reference_design};
pub use geometry::{GeometryModel, Layer};
pub use material::{Material, MaterialLibrary};
pub use spec::{GeometrySpec, LayerSpec, SectionEntry};
