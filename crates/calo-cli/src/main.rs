//! CaloSim CLI

use anyhow::{Context, Result};
use calo_core::Section;
use calo_dataset::{DatasetBuilder, write_parquet};
use calo_geometry::{GeometryModel, GeometrySource, MaterialBudget, REFERENCE_DESIGNS, reference_design};
use calo_shower::ShowerSampler;
use calo_sim::EventSimulator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod run_config;

use run_config::{GeometryConfig, RunConfig};

#[derive(Parser)]
#[command(name = "calosim")]
#[command(about = "CaloSim - parametric calorimeter simulation to ML datasets")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate events and write a Parquet dataset
    Generate {
        /// Run configuration (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output dataset (Parquet)
        #[arg(short, long)]
        output: PathBuf,

        /// Override the number of events
        #[arg(long)]
        n_events: Option<usize>,

        /// Override the run seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override worker threads (0 = auto)
        #[arg(long)]
        threads: Option<usize>,

        /// Write the run metadata JSON here instead of stdout
        #[arg(long)]
        metadata_out: Option<PathBuf>,
    },

    /// Summarize a geometry and its material budget
    Geometry {
        /// Run or geometry configuration (YAML or JSON)
        #[arg(short, long, conflicts_with = "design", required_unless_present = "design")]
        config: Option<PathBuf>,

        /// Reference design name
        #[arg(long)]
        design: Option<String>,

        /// Transverse area for the cost estimate (m²)
        #[arg(long, default_value = "1.0")]
        area_m2: f64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the reference designs
    Designs,

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate { config, output, n_events, seed, threads, metadata_out } => {
            cmd_generate(&config, &output, n_events, seed, threads, metadata_out.as_ref())
        }
        Commands::Geometry { config, design, area_m2, output } => {
            cmd_geometry(config.as_ref(), design.as_deref(), area_m2, output.as_ref())
        }
        Commands::Designs => cmd_designs(),
        Commands::Version => {
            println!("calosim {}", calo_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_generate(
    config: &PathBuf,
    output: &PathBuf,
    n_events: Option<usize>,
    seed: Option<u64>,
    threads: Option<usize>,
    metadata_out: Option<&PathBuf>,
) -> Result<()> {
    let mut cfg: RunConfig = run_config::load(config)?;
    if let Some(n) = n_events {
        cfg.n_events = n;
    }
    if let Some(s) = seed {
        cfg.simulation.seed = s;
    }
    if let Some(t) = threads {
        cfg.simulation.threads = t;
    }

    let geometry = cfg.geometry.resolve()?.build().context("invalid geometry")?;
    let sampler = ShowerSampler::new(cfg.sampler.clone()).context("invalid sampler settings")?;
    tracing::info!(
        geometry = geometry.name().unwrap_or("inline"),
        hash = %geometry.hash(),
        layers = geometry.layer_count(),
        "geometry resolved"
    );

    let outcome = EventSimulator::new(&geometry, sampler)
        .run_with_stop(&cfg.simulation, cfg.n_events, None)
        .context("simulation failed")?;
    let metadata = outcome.metadata.clone();

    let dataset = DatasetBuilder::new(cfg.simulation.feature_set)
        .with_run_metadata(outcome.metadata)
        .finalize(outcome.records, &geometry)?;
    write_parquet(&dataset, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let value = serde_json::json!({
        "output": output.display().to_string(),
        "rows": dataset.len(),
        "columns": dataset.schema().column_names().len(),
        "run": metadata,
    });
    write_json(metadata_out, value)
}

fn geometry_summary(geometry: &GeometryModel, area_m2: f64) -> Result<serde_json::Value> {
    let budget = MaterialBudget::from_geometry(geometry, area_m2)?;
    Ok(serde_json::json!({
        "name": geometry.name(),
        "hash": geometry.hash(),
        "layer_count": geometry.layer_count(),
        "n_ecal_layers": geometry.section_len(Section::Ecal),
        "n_hcal_layers": geometry.section_len(Section::Hcal),
        "ecal_depth_x0": geometry.depth_radiation_lengths(Section::Ecal),
        "hcal_depth_lambda": geometry.depth_interaction_lengths(Section::Hcal),
        "budget": budget,
    }))
}

fn cmd_geometry(
    config: Option<&PathBuf>,
    design: Option<&str>,
    area_m2: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let source = match (config, design) {
        (Some(path), _) => run_config::load::<GeometryConfig>(path)?.geometry,
        (None, Some(name)) => GeometrySource::Design { design: name.to_string() },
        (None, None) => anyhow::bail!("either --config or --design is required"),
    };
    let geometry = source.resolve()?.build().context("invalid geometry")?;
    write_json(output, geometry_summary(&geometry, area_m2)?)
}

fn cmd_designs() -> Result<()> {
    let designs = REFERENCE_DESIGNS
        .iter()
        .map(|(name, description)| {
            let geometry = reference_design(name)?.build()?;
            Ok(serde_json::json!({
                "name": name,
                "description": description,
                "hash": geometry.hash(),
                "n_ecal_layers": geometry.section_len(Section::Ecal),
                "n_hcal_layers": geometry.section_len(Section::Hcal),
                "total_length_cm": geometry.total_depth(Section::Ecal) + geometry.total_depth(Section::Hcal),
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    write_json(None, serde_json::Value::Array(designs))
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
