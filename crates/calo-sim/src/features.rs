//! Versioned derived-feature sets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use calo_core::{DepositionProfile, Error, Result, Section};
use serde::{Deserialize, Serialize};

/// Denominator floor (GeV) for the ECAL/HCAL ratio.
///
/// Showers fully absorbed in the ECAL leave the HCAL total at or near zero;
/// the ratio is `ecal / max(hcal, RATIO_FLOOR)` so it stays finite.
pub const RATIO_FLOOR: f64 = 1e-3;

/// Named, versioned list of derived features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Section totals and their ratio.
    #[default]
    BasicV1,
    /// `basic_v1` plus total, ECAL fraction, depth barycentre and peak layer.
    ExtendedV1,
}

const BASIC_V1: &[&str] = &["total_ecal_energy", "total_hcal_energy", "ecal_hcal_ratio"];

const EXTENDED_V1: &[&str] = &[
    "total_ecal_energy",
    "total_hcal_energy",
    "ecal_hcal_ratio",
    "total_energy",
    "ecal_fraction",
    "depth_barycentre",
    "max_layer",
];

impl FeatureSet {
    /// All feature sets.
    pub const ALL: [FeatureSet; 2] = [FeatureSet::BasicV1, FeatureSet::ExtendedV1];

    /// Versioned name, written to dataset metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSet::BasicV1 => "basic_v1",
            FeatureSet::ExtendedV1 => "extended_v1",
        }
    }

    /// Feature names, in column order.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            FeatureSet::BasicV1 => BASIC_V1,
            FeatureSet::ExtendedV1 => EXTENDED_V1,
        }
    }

    /// Compute this set's features from a deposition profile.
    pub fn derive(&self, profile: &DepositionProfile) -> BTreeMap<String, f64> {
        let ecal = profile.section_total(Section::Ecal);
        let hcal = profile.section_total(Section::Hcal);
        let mut out = BTreeMap::new();
        out.insert("total_ecal_energy".to_string(), ecal);
        out.insert("total_hcal_energy".to_string(), hcal);
        out.insert("ecal_hcal_ratio".to_string(), ecal / hcal.max(RATIO_FLOOR));

        if *self == FeatureSet::ExtendedV1 {
            let total = ecal + hcal;
            let deposits = profile.per_layer_energy();
            let (fraction, barycentre) = if total > 0.0 {
                let weighted: f64 = deposits.iter().enumerate().map(|(i, e)| i as f64 * e).sum();
                (ecal / total, weighted / total)
            } else {
                (0.0, 0.0)
            };
            let max_layer = deposits
                .iter()
                .enumerate()
                .fold((0usize, f64::NEG_INFINITY), |best, (i, &e)| if e > best.1 { (i, e) } else { best })
                .0;
            out.insert("total_energy".to_string(), total);
            out.insert("ecal_fraction".to_string(), fraction);
            out.insert("depth_barycentre".to_string(), barycentre);
            out.insert("max_layer".to_string(), max_layer as f64);
        }
        out
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FeatureSet::ALL
            .into_iter()
            .find(|fs| fs.as_str() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown feature set '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile() -> DepositionProfile {
        DepositionProfile::new(vec![1.0, 3.0, 0.5, 0.5], 2, 10.0).unwrap()
    }

    #[test]
    fn test_basic_features() {
        let f = FeatureSet::BasicV1.derive(&profile());
        assert_eq!(f.len(), 3);
        assert_relative_eq!(f["total_ecal_energy"], 4.0);
        assert_relative_eq!(f["total_hcal_energy"], 1.0);
        assert_relative_eq!(f["ecal_hcal_ratio"], 4.0);
    }

    #[test]
    fn test_extended_features() {
        let f = FeatureSet::ExtendedV1.derive(&profile());
        assert_eq!(f.len(), FeatureSet::ExtendedV1.names().len());
        assert_relative_eq!(f["total_energy"], 5.0);
        assert_relative_eq!(f["ecal_fraction"], 0.8);
        assert_relative_eq!(f["depth_barycentre"], (3.0 + 1.0 + 1.5) / 5.0);
        assert_eq!(f["max_layer"], 1.0);
        for name in FeatureSet::ExtendedV1.names() {
            assert!(f.contains_key(*name));
        }
    }

    #[test]
    fn test_ratio_with_empty_hcal_is_finite() {
        let p = DepositionProfile::new(vec![2.0, 0.0], 1, 5.0).unwrap();
        let f = FeatureSet::ExtendedV1.derive(&p);
        assert_relative_eq!(f["ecal_hcal_ratio"], 2.0 / RATIO_FLOOR);

        let empty = DepositionProfile::new(vec![0.0, 0.0], 1, 5.0).unwrap();
        let f = FeatureSet::ExtendedV1.derive(&empty);
        assert!(f.values().all(|v| v.is_finite()));
        assert_eq!(f["ecal_hcal_ratio"], 0.0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("extended_v1".parse::<FeatureSet>().unwrap(), FeatureSet::ExtendedV1);
        assert!("basic_v2".parse::<FeatureSet>().is_err());
    }
}
