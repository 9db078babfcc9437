/// OBD Firmware
///
/// Assembles the onboard controller: shell console, clock and terminal
/// input, wired through the message-passing kernel and ticked at a fixed rate.
use anyhow::{Context, Result};
use clap::Parser;
use obd::prelude::KernelConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod assembly;
mod nodes;

use assembly::{assemble, FirmwareOptions};

#[derive(Parser, Debug)]
#[command(name = "obd_firmware")]
#[command(about = "OBD onboard controller firmware", long_about = None)]
struct Args {
    /// Kernel configuration file (TOML or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tick rate in Hz, overrides the configuration
    #[arg(short, long)]
    rate: Option<f64>,

    /// Stop after that many ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Clock settings file, loaded at start and saved at shutdown
    #[arg(long)]
    clock_config: Option<PathBuf>,

    /// Write the effective kernel configuration to this file
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Do not read commands from stdin
    #[arg(long)]
    no_stdin: bool,

    /// Disable colored console output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "obd_firmware=debug,obd_core=debug,info"
    } else {
        "obd_firmware=info,obd_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<KernelConfig> {
    let mut config = match &args.config {
        Some(path) => KernelConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => KernelConfig::default(),
    };
    if let Some(rate) = args.rate {
        config.tick_rate_hz = rate;
    }
    if let Some(ticks) = args.ticks {
        config.max_ticks = Some(ticks);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = load_config(&args)?;
    if let Some(path) = &args.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote kernel configuration to {}", path.display());
    }

    let options = FirmwareOptions {
        stdin: !args.no_stdin,
        clock_config: args.clock_config.clone(),
    };
    let mut system = assemble(config, options, Box::new(std::io::stdout()))?;
    system
        .load_all_config()
        .context("loading driver configuration")?;

    info!(
        "OBD firmware {} starting at {} Hz with {} drivers",
        obd::version(),
        system.config().tick_rate_hz,
        system.manager().size()
    );
    system.run()?;

    system
        .save_all_config()
        .context("saving driver configuration")?;
    Ok(())
}
