//! Parallel, reproducible event generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use calo_core::rng::substream;
use calo_core::{Error, Particle, Result, Section};
use calo_geometry::GeometryModel;
use calo_shower::{ShowerModel, ShowerSampler};
use rayon::prelude::*;

use crate::config::{SimulationConfig, SimulationPlan};
use crate::metadata::RunMetadata;
use crate::record::EventRecord;

/// Events simulated between two checks of the stop flag.
pub const CHUNK_SIZE: usize = 1024;

/// Records and metadata of one run.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// Records in event order.
    pub records: Vec<EventRecord>,
    /// Run metadata.
    pub metadata: RunMetadata,
}

/// Draws events against a fixed geometry and shower model.
///
/// Event `i` uses its own generator seeded with `seed + i`, so output is
/// identical for any thread count.
pub struct EventSimulator<'g, S = ShowerSampler> {
    geometry: &'g GeometryModel,
    model: S,
}

impl<'g> EventSimulator<'g, ShowerSampler> {
    /// Simulator with the default parametric shower model.
    pub fn with_default_model(geometry: &'g GeometryModel) -> Self {
        Self::new(geometry, ShowerSampler::default())
    }
}

impl<'g, S: ShowerModel> EventSimulator<'g, S> {
    /// Simulator over `geometry` using `model`.
    pub fn new(geometry: &'g GeometryModel, model: S) -> Self {
        Self { geometry, model }
    }

    /// Geometry.
    pub fn geometry(&self) -> &GeometryModel {
        self.geometry
    }

    /// Generate `n_events` records.
    ///
    /// # Errors
    /// [`Error::Configuration`] for an invalid configuration or `n_events == 0`;
    /// [`Error::UnsupportedParticle`] for unknown particle names.
    pub fn run(&self, config: &SimulationConfig, n_events: usize) -> Result<Vec<EventRecord>> {
        Ok(self.run_with_stop(config, n_events, None)?.records)
    }

    /// Generate up to `n_events` records, checking `stop` before each chunk of
    /// [`CHUNK_SIZE`] events.
    ///
    /// A chunk already in flight when `stop` is raised runs to completion. The
    /// records produced so far (a prefix of the full run, a whole number of
    /// chunks) are returned and `metadata.stopped_early` is set.
    pub fn run_with_stop(
        &self,
        config: &SimulationConfig,
        n_events: usize,
        stop: Option<&AtomicBool>,
    ) -> Result<SimulationOutcome> {
        if n_events == 0 {
            return Err(Error::Configuration("n_events must be > 0".into()));
        }
        let plan = config.plan()?;
        let start = Instant::now();

        tracing::info!(
            n_events,
            seed = plan.seed,
            threads = config.threads,
            geometry = %self.geometry.hash(),
            model = self.model.name(),
            "simulating events"
        );

        let run_chunks = || -> Result<(Vec<EventRecord>, bool)> {
            let mut records = Vec::with_capacity(n_events);
            let mut stopped_early = false;
            for chunk_start in (0..n_events).step_by(CHUNK_SIZE) {
                if stop.is_some_and(|s| s.load(Ordering::Relaxed)) {
                    stopped_early = true;
                    break;
                }
                let chunk_end = (chunk_start + CHUNK_SIZE).min(n_events);
                let chunk: Vec<EventRecord> = (chunk_start..chunk_end)
                    .into_par_iter()
                    .map(|i| self.simulate_event(&plan, i as u64))
                    .collect::<Result<_>>()?;
                records.extend(chunk);
                tracing::debug!(done = records.len(), total = n_events, "chunk complete");
            }
            Ok((records, stopped_early))
        };

        let (records, stopped_early) = if config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build()
                .map_err(|e| Error::Configuration(format!("failed to create thread pool: {e}")))?;
            pool.install(run_chunks)?
        } else {
            run_chunks()?
        };

        let wall_s = start.elapsed().as_secs_f64();
        if stopped_early {
            tracing::warn!(produced = records.len(), requested = n_events, "run stopped early");
        }
        tracing::info!(n_events = records.len(), wall_s, "simulation finished");

        let metadata = RunMetadata {
            tool_version: calo_core::VERSION.to_string(),
            geometry_name: self.geometry.name().map(str::to_string),
            geometry_hash: self.geometry.hash().to_string(),
            n_ecal_layers: self.geometry.section_len(Section::Ecal),
            n_hcal_layers: self.geometry.section_len(Section::Hcal),
            shower_model: self.model.name().to_string(),
            seed: plan.seed,
            n_events_requested: n_events,
            n_events: records.len(),
            stopped_early,
            particles: plan.particles.entries().map(|(k, p)| (k.as_str().to_string(), p)).collect(),
            energy: plan.energy.clone(),
            direction: plan.direction.clone(),
            feature_set: plan.feature_set,
            threads: config.threads,
            wall_s,
        };
        Ok(SimulationOutcome { records, metadata })
    }

    /// Simulate event `event_id` of a run.
    ///
    /// Draw order on the sub-stream is fixed: type, energy, direction, shower.
    pub fn simulate_event(&self, plan: &SimulationPlan, event_id: u64) -> Result<EventRecord> {
        let mut rng = substream(plan.seed, event_id);
        let kind = plan.particles.sample(&mut rng);
        let energy = plan.energy.sample(&mut rng);
        let direction = plan.direction.sample(&mut rng)?;
        let particle = Particle::new(kind, energy, direction)?;
        let profile = self.model.sample(&particle, self.geometry, &mut rng)?;
        Ok(EventRecord::new(event_id, kind, energy, direction, profile, plan.feature_set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DirectionDistribution, EnergyDistribution};
    use crate::features::FeatureSet;
    use calo_core::{DepositionProfile, ParticleType};
    use calo_geometry::LayerSpec;
    use rand::RngCore;
    use std::sync::atomic::AtomicUsize;

    fn geometry() -> GeometryModel {
        GeometryModel::build(
            &vec![LayerSpec::new("PbWO4", 1.0); 10],
            &vec![LayerSpec::new("Iron", 5.0); 5],
        )
        .unwrap()
    }

    fn mixed_config(seed: u64) -> SimulationConfig {
        SimulationConfig::new(
            [(ParticleType::Photon, 0.5), (ParticleType::ChargedPion, 0.5)],
            EnergyDistribution::Uniform { min: 1.0, max: 50.0 },
        )
        .with_seed(seed)
    }

    #[test]
    fn test_mixed_run_labels() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        let records = sim.run(&mixed_config(7), 1000).unwrap();
        assert_eq!(records.len(), 1000);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.event_id(), i as u64);
            assert!(matches!(r.particle_type(), ParticleType::Photon | ParticleType::ChargedPion));
            assert!((1.0..=50.0).contains(&r.initial_energy()));
            assert_eq!(r.profile().len(), 15);
            assert!(r.profile().total() <= r.initial_energy());
            assert!(r.feature("ecal_hcal_ratio").is_some_and(f64::is_finite));
        }
        let photons = records.iter().filter(|r| r.particle_type() == ParticleType::Photon).count();
        assert!((350..650).contains(&photons), "photons: {photons}");
    }

    #[test]
    fn test_reproducible_across_thread_counts() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        let mut cfg = mixed_config(11);
        cfg.direction = DirectionDistribution::Cone { max_theta: 0.3 };
        cfg.feature_set = FeatureSet::ExtendedV1;

        cfg.threads = 1;
        let a = sim.run(&cfg, 2500).unwrap();
        cfg.threads = 4;
        let b = sim.run(&cfg, 2500).unwrap();
        cfg.threads = 0;
        let c = sim.run(&cfg, 2500).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);

        let d = sim.run(&cfg.clone().with_seed(12), 2500).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_prefix_property() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        let cfg = mixed_config(3);
        let short = sim.run(&cfg, 10).unwrap();
        let long = sim.run(&cfg, 50).unwrap();
        assert_eq!(short[..], long[..10]);
    }

    #[test]
    fn test_bad_probabilities() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        let cfg = SimulationConfig::new(
            [(ParticleType::Photon, 0.3), (ParticleType::ChargedPion, 0.6)],
            EnergyDistribution::Fixed { value: 10.0 },
        );
        assert!(matches!(sim.run(&cfg, 10), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_zero_events_rejected() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        assert!(matches!(sim.run(&mixed_config(1), 0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_stop_before_start() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        let stop = AtomicBool::new(true);
        let out = sim.run_with_stop(&mixed_config(1), 5000, Some(&stop)).unwrap();
        assert!(out.records.is_empty());
        assert!(out.metadata.stopped_early);
        assert_eq!(out.metadata.n_events_requested, 5000);
    }

    #[test]
    fn test_metadata() {
        let geo = geometry();
        let sim = EventSimulator::with_default_model(&geo);
        let out = sim.run_with_stop(&mixed_config(5), 20, None).unwrap();
        let m = &out.metadata;
        assert_eq!(m.n_events, 20);
        assert!(!m.stopped_early);
        assert_eq!(m.geometry_hash, geo.hash());
        assert_eq!((m.n_ecal_layers, m.n_hcal_layers), (10, 5));
        assert_eq!(m.shower_model, "gamma_profile_v1");
        assert_eq!(m.particles["charged_pion"], 0.5);
        let json = serde_json::to_string(m).unwrap();
        let back: RunMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, m);
    }

    struct FailingModel;

    impl ShowerModel for FailingModel {
        fn sample(
            &self,
            particle: &Particle,
            _geometry: &GeometryModel,
            _rng: &mut dyn RngCore,
        ) -> Result<DepositionProfile> {
            Err(Error::UnsupportedParticle(particle.kind.to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_model_error_propagates() {
        let geo = geometry();
        let sim = EventSimulator::new(&geo, FailingModel);
        assert!(matches!(sim.run(&mixed_config(1), 4), Err(Error::UnsupportedParticle(_))));
    }

    /// Default sampler that raises `stop` once `after` events have been drawn.
    struct StopAfter<'a> {
        inner: ShowerSampler,
        stop: &'a AtomicBool,
        calls: AtomicUsize,
        after: usize,
    }

    impl ShowerModel for StopAfter<'_> {
        fn sample(
            &self,
            particle: &Particle,
            geometry: &GeometryModel,
            rng: &mut dyn RngCore,
        ) -> Result<DepositionProfile> {
            if self.calls.fetch_add(1, Ordering::Relaxed) + 1 >= self.after {
                self.stop.store(true, Ordering::Relaxed);
            }
            self.inner.sample(particle, geometry, rng)
        }

        fn name(&self) -> &str {
            self.inner.name()
        }
    }

    #[test]
    fn test_stop_mid_run_returns_whole_chunks() {
        let geo = geometry();
        let mut cfg = mixed_config(9);
        cfg.threads = 2;
        let stop = AtomicBool::new(false);
        let model = StopAfter {
            inner: ShowerSampler::default(),
            stop: &stop,
            calls: AtomicUsize::new(0),
            after: CHUNK_SIZE + CHUNK_SIZE / 2,
        };
        let out = EventSimulator::new(&geo, model).run_with_stop(&cfg, 5000, Some(&stop)).unwrap();

        // The chunk in flight when the flag is raised still completes.
        assert_eq!(out.records.len(), 2 * CHUNK_SIZE);
        assert!(out.metadata.stopped_early);
        assert_eq!(out.metadata.n_events, 2 * CHUNK_SIZE);
        assert_eq!(out.metadata.n_events_requested, 5000);

        let full = EventSimulator::with_default_model(&geo).run(&cfg, 5000).unwrap();
        assert_eq!(out.records[..], full[..2 * CHUNK_SIZE]);
    }
}
