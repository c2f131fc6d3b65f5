//! # calo-sim
//!
//! Event generation: draws particle type, energy and direction from the
//! configured distributions, samples a shower per event and derives features.
//!
//! Runs are reproducible: event `i` of a run seeded with `s` always uses the
//! sub-stream `s + i`, whatever the thread count.

#![warn(missing_docs)]

pub mod config;
pub mod features;
pub mod metadata;
pub mod record;
pub mod simulator;

pub use config::{
    DirectionDistribution, EnergyDistribution, ParticleMix, SimulationConfig, SimulationPlan,
};
pub use features::FeatureSet;
pub use metadata::RunMetadata;
pub use record::EventRecord;
pub use simulator::{EventSimulator, SimulationOutcome};
