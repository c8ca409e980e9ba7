//! Nanotron command line
//!
//! - `check-config`: load and validate a machine configuration
//! - `dry-run`: run a protocol against simulated devices and print the
//!   commands each device received

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nanotron_drivers::{SimGantry, SimTempdeck, SimThermocycler, ThermalModel};
use nanotron_host::cancel::InstantPacer;
use nanotron_host::config::load_config;
use nanotron_host::device::{MotorBus, TempdeckBus, ThermalBus};
use nanotron_host::labware_store::load_setup;
use nanotron_host::protocol::{preflight, ProtocolScript};
use nanotron_host::{Coordinator, DeviceSet};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Liquid-handling robot coordinator
#[derive(Parser, Debug)]
#[command(name = "nanotron")]
#[command(version)]
struct Args {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a machine configuration file
    CheckConfig {
        /// Machine configuration (TOML)
        path: PathBuf,
    },

    /// Execute a protocol against simulated devices
    DryRun {
        /// Machine configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Protocol script (TOML)
        #[arg(short, long)]
        protocol: PathBuf,

        /// Saved labware setup (JSON)
        #[arg(short, long)]
        labware: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::CheckConfig { path } => {
            let config = load_config(&path)
                .with_context(|| format!("invalid configuration {}", path.display()))?;
            println!(
                "{}: ok ({} slots, {} syringe models)",
                path.display(),
                config.deck.slots.len(),
                config.syringes.len()
            );
            Ok(())
        }
        Command::DryRun {
            config,
            protocol,
            labware,
        } => dry_run(config, protocol, labware),
    }
}

fn dry_run(config: PathBuf, protocol: PathBuf, labware: Option<PathBuf>) -> Result<()> {
    let config = load_config(&config)
        .with_context(|| format!("invalid configuration {}", config.display()))?;
    let script = ProtocolScript::load(&protocol)
        .with_context(|| format!("invalid protocol {}", protocol.display()))?;

    let gantry = Arc::new(Mutex::new(SimGantry::default()));
    let cycler = config
        .devices
        .thermocycler_port
        .as_ref()
        .map(|_| Arc::new(Mutex::new(SimThermocycler::new(ThermalModel::default()))));
    let tempdeck = config
        .devices
        .tempdeck_port
        .as_ref()
        .map(|_| Arc::new(Mutex::new(SimTempdeck::new(ThermalModel::default()))));

    let mut devices = DeviceSet::new(MotorBus::from_shared("motor", gantry.clone()))
        .with_pacer(Arc::new(InstantPacer::new()));
    if let Some(cycler) = &cycler {
        devices = devices.with_thermocycler(ThermalBus::from_shared("thermocycler", cycler.clone()));
    }
    if let Some(tempdeck) = &tempdeck {
        devices = devices.with_tempdeck(TempdeckBus::from_shared("tempdeck", tempdeck.clone()));
    }

    let mut coordinator = Coordinator::new(config, devices)?;
    if let Some(path) = labware {
        let setup =
            load_setup(&path).with_context(|| format!("invalid labware setup {}", path.display()))?;
        coordinator.load_labware(setup)?;
    }

    let problems = preflight(&script, &coordinator);
    if !problems.is_empty() {
        for (index, problem) in &problems {
            eprintln!("step {index}: {problem}");
        }
        bail!("protocol '{}' failed preflight", script.name);
    }

    coordinator.connect_all()?;
    let outcome = script.run(&mut coordinator);

    println!("motor:");
    for call in lock_device(&gantry).calls() {
        println!("  {call:?}");
    }
    if let Some(cycler) = &cycler {
        println!("thermocycler:");
        for call in lock_device(cycler).calls() {
            println!("  {call:?}");
        }
    }
    if let Some(tempdeck) = &tempdeck {
        println!("tempdeck:");
        for call in lock_device(tempdeck).calls() {
            println!("  {call:?}");
        }
    }

    let steps = outcome?;
    info!(steps, "dry run complete");
    Ok(())
}

fn lock_device<T>(device: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    device.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
