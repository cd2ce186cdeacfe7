//! Demo simulator: drives the megafauna core against a logistic-growth
//! grass habitat and writes the configured output tables.

mod habitat;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use habitat::{SimpleHabitat, SimpleHabitatConfig};
use megafauna_core::date::Date;
use megafauna_core::world::World;

const EXAMPLE_INSTRUCTION: &str = r#"# Example megafauna instruction file.

[simulation]
herbivore_type = "Cohort"
establish_interval = 365
seed = 42

[output]
format = "TextTables"
interval = "Annual"

[output.text_tables]
directory = "megafauna_output"
precision = 3
mass_density = true
individual_density = true
body_fat = true
available_forage = true

[group.ruminants]
digestion.type = "Ruminant"
digestion.limit = "IlliusGordon1992"

[[hft]]
name = "grazer"
groups = ["ruminants"]
body_fat.maximum = 0.25
body_fat.birth = 0.2
body_mass.birth = 5
body_mass.female = 50
body_mass.male = 70
breeding_season.start = 121
breeding_season.length = 30
establishment.density = 1.0
establishment.age_range = [1, 15]
expenditure.components = ["Taylor1981", "Thermoregulation"]
foraging.diet_composer = "PureGrazer"
foraging.net_energy_model = "Default"
foraging.limits = ["IlliusOConnor2000"]
foraging.half_max_intake_density = 20
life_history.lifespan = 16
life_history.sexual_maturity = 2
mortality.factors = ["Background", "Lifespan", "StarvationIlliusOConnor2000"]
mortality.adult_rate = 0.1
mortality.juvenile_rate = 0.3
reproduction.model = "IlliusOConnor2000"
reproduction.annual_maximum = 1.0
reproduction.gestation_months = 9
"#;

#[derive(Parser)]
#[command(name = "megafauna-sim")]
#[command(about = "Megafauna model demo simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML instruction file.
    Run {
        /// Path to the instruction file.
        #[arg(long)]
        instruction: PathBuf,

        /// Number of years to simulate.
        #[arg(long, default_value_t = 10)]
        years: u32,

        /// Number of identical habitats to simulate.
        #[arg(long, default_value_t = 1)]
        habitats: usize,

        /// Write a JSON run summary to this file.
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Print an example instruction file to stdout.
    DumpExampleInstruction,
}

#[derive(Serialize)]
struct RunSummary {
    simulated_years: u32,
    habitat_count: usize,
    /// Final individual density per HFT, averaged over habitats [ind/km²].
    final_inddens_per_hft: Vec<(String, f64)>,
}

fn run(
    instruction: &PathBuf,
    years: u32,
    habitats: usize,
    summary_path: Option<&PathBuf>,
) -> Result<()> {
    let mut world = World::new(instruction)
        .with_context(|| format!("failed to set up world from {}", instruction.display()))?;

    for index in 0..habitats {
        let habitat = SimpleHabitat::new(
            format!("habitat{index}"),
            SimpleHabitatConfig::default(),
        );
        world.create_simulation_unit(Box::new(habitat));
    }

    tracing::info!(years, habitats, "simulation starting");
    let mut date = Date::new(0, 0);
    for _ in 0..(years as u64 * 365) {
        world
            .simulate_day(date, true)
            .context("simulation day failed")?;
        date = date.successor();
    }
    world.flush_output().context("failed to write output")?;
    tracing::info!("simulation finished");

    let mut final_inddens: Vec<(String, f64)> = world
        .hfts()
        .iter()
        .map(|hft| (hft.name.clone(), 0.0))
        .collect();
    for unit in world.simulation_units() {
        for population in unit.populations() {
            if let Some(entry) = final_inddens
                .iter_mut()
                .find(|(name, _)| *name == population.hft().name)
            {
                entry.1 += population.ind_per_km2() / habitats as f64;
            }
        }
    }

    for (name, density) in &final_inddens {
        println!("{name}: {density:.3} ind/km²");
    }

    if let Some(path) = summary_path {
        let summary = RunSummary {
            simulated_years: years,
            habitat_count: habitats,
            final_inddens_per_hft: final_inddens,
        };
        let file = File::create(path)
            .with_context(|| format!("failed to create summary file {}", path.display()))?;
        serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
        println!("Summary written to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::DumpExampleInstruction => {
            print!("{EXAMPLE_INSTRUCTION}");
            Ok(())
        }
        Commands::Run {
            instruction,
            years,
            habitats,
            summary,
        } => run(&instruction, years, habitats, summary.as_ref()),
    }
}
