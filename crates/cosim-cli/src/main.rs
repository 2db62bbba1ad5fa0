//! fmi-cosim: drive FMI co-simulation slaves from the command line.
//!
//! This is the main entry point for the co-simulation tool.

mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_description::{read_model_description, MODEL_DESCRIPTION_FILE};
use lib_fmi_ffi::{uri_to_path, PlatformTag, SlaveLocation, SlaveRegistry, UnloadStatus};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fmi-cosim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a co-simulation
    Run {
        /// Path to the run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Print the model description of an unpacked FMU
    Inspect {
        /// FMU root directory (path or file:// URI)
        fmu: String,
    },

    /// Try to load a slave binary and report what was found
    Probe {
        /// Model identifier
        identifier: String,

        /// FMU root directory (path or file:// URI)
        uri: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Run { config, output } => {
            run(&config, &output, cli.format)?;
        }
        Commands::Inspect { fmu } => {
            inspect(&fmu)?;
        }
        Commands::Probe { identifier, uri } => {
            probe(&identifier, &uri)?;
        }
    }

    Ok(())
}

fn run(config_path: &Path, output_dir: &Path, format: OutputFormat) -> Result<()> {
    tracing::info!("Loading configuration from {:?}", config_path);

    let config = config::load_config(config_path)?;
    let orchestrator = orchestrator::Orchestrator::new(config)?;

    let results = orchestrator.run()?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    output::write_results(&results, output_dir, format)?;
    output::print_results(&results);

    tracing::info!("Run complete. Results written to {:?}", output_dir);
    Ok(())
}

fn inspect(fmu: &str) -> Result<()> {
    let root = uri_to_path(fmu)?;
    let path = root.join(MODEL_DESCRIPTION_FILE);
    tracing::info!("Reading model description: {:?}", path);

    let description = read_model_description(&path)
        .with_context(|| format!("Failed to read {:?}", path))?;

    println!("Model: {}", description.model_name());
    println!("  Identifier: {}", description.model_identifier());
    println!("  FMI version: {:?}", description.fmi_version());
    println!("  GUID: {}", description.guid());
    println!("  Kind: {:?}", description.kind());
    if let Some(mime) = description.mime_type() {
        println!("  MIME type: {}", mime);
    }

    let caps = description.capabilities();
    println!("\nCapabilities:");
    println!("  Variable step size:     {}", caps.can_handle_variable_communication_step_size);
    println!("  Handles events:         {}", caps.can_handle_events);
    println!("  Rejects steps:          {}", caps.can_reject_steps);
    println!("  Interpolates inputs:    {}", caps.can_interpolate_inputs);
    println!("  Max output derivative:  {}", caps.max_output_derivative_order);
    println!("  Runs asynchronously:    {}", caps.can_run_asynchronuously);

    if let Some(experiment) = description.default_experiment() {
        println!("\nDefault experiment:");
        println!("  Start: {:?}", experiment.start_time);
        println!("  Stop:  {:?}", experiment.stop_time);
        println!("  Step:  {:?}", experiment.step_size);
    }

    println!("\nVariables: {}", description.variables().len());
    for var in description.variables() {
        println!(
            "  {:<24} vr={:<6} {:<8} {:?}/{:?}",
            var.name,
            var.value_reference,
            var.var_type.to_string(),
            var.causality,
            var.variability
        );
    }

    if let Some(tag) = PlatformTag::native() {
        let location = SlaveLocation::resolve_for(description.model_identifier(), fmu, tag)?;
        let found = if location.binary.exists() { "found" } else { "missing" };
        println!("\nBinary ({}): {:?} [{}]", tag, location.binary, found);
    }

    Ok(())
}

fn probe(identifier: &str, uri: &str) -> Result<()> {
    let registry = SlaveRegistry::global();
    let outcome = registry.load(identifier, uri, false);

    println!("Slave: {}", identifier);
    println!("  Load status: {}", outcome.status);
    println!("  Kind: {:?}", outcome.kind);

    if !outcome.is_resident() {
        anyhow::bail!("Failed to load slave '{}' from {}", identifier, uri);
    }

    if let Some(descriptor) = registry.get(identifier) {
        println!("  Binary: {:?}", descriptor.path());
        println!("  Variables: {}", descriptor.variables().len());
        let optional = descriptor.functions().optional_present();
        if optional.is_empty() {
            println!("  Optional functions: none");
        } else {
            println!("  Optional functions: {}", optional.join(", "));
        }
    }

    match registry.unload(identifier) {
        UnloadStatus::Ok => {}
        other => tracing::warn!("Unload of {} returned {}", identifier, other),
    }
    Ok(())
}
