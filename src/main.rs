use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use planetforge::cli::commands;
use planetforge::config::generation::GenerationParams;
use planetforge::config::simulation::SimulationConfig;

#[derive(Parser)]
#[command(name = "planetforge")]
#[command(about = "Procedural planet terrain generator for grid strategy maps")]
#[command(version)]
struct Cli {
    /// Path to the simulation config file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a planet from generation parameters
    Generate {
        /// Path to world generation config file
        #[arg(short, long, default_value = "worldgen.toml")]
        worldgen: String,

        /// Write the final terrain as JSON to this file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Regenerate a planet and show one tile
    Inspect {
        /// Path to world generation config file
        #[arg(short, long, default_value = "worldgen.toml")]
        worldgen: String,

        /// Tile column
        #[arg(short, long)]
        x: usize,

        /// Tile row
        #[arg(short, long)]
        y: usize,
    },
}

fn load_config(path: Option<&str>) -> SimulationConfig {
    match path {
        Some(path) => match SimulationConfig::from_file(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    }
}

fn load_params(path: &str) -> GenerationParams {
    match GenerationParams::from_file(Path::new(path)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error loading generation config: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config);

    match cli.command {
        Commands::Generate { worldgen, output } => {
            let params = load_params(&worldgen);
            println!("Generating planet from {}...", worldgen);
            if let Err(e) = commands::generate(&params, &config, output.as_deref().map(Path::new)) {
                eprintln!("Generation error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Inspect { worldgen, x, y } => {
            let params = load_params(&worldgen);
            if let Err(e) = commands::inspect(&params, &config, x, y) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
