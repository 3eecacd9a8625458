//! Vega Plotter CLI
//!
//! Usage:
//!   vega-plotter [OPTIONS] <FILE>
//!
//! Options:
//!   -p, --palette <FILE>   Color palette overlay (TOML format)
//!   -C, --base-dir <DIR>   Directory relative urls resolve against
//!   -v, --verbose          Debug logging
//!   -h, --help             Print help

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use vega_plotter::{run_config, Config, RunOptions};

#[derive(Parser)]
#[command(name = "vega-plotter")]
#[command(about = "Declarative plotting from XML documents")]
struct Cli {
    /// XML document describing data, transforms and plots
    input: PathBuf,

    /// Color palette overlay (TOML format)
    #[arg(short, long)]
    palette: Option<PathBuf>,

    /// Directory relative urls resolve against
    #[arg(short = 'C', long, default_value = ".")]
    base_dir: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.input) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading '{}': {}", cli.input.display(), e);
            std::process::exit(1);
        }
    };

    // Log:url mirrors the log stream into a file, truncated per run
    let log_file = config.raw("Log:url").map(|url| {
        let path = cli.base_dir.join(url);
        let file = File::create(&path);
        (path.display().to_string(), file)
    });
    let file_layer = match log_file {
        Some((_, Ok(file))) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        Some((url, Err(e))) => {
            eprintln!("Cannot open log file '{}': {}", url, e);
            None
        }
        None => None,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(url) = config.raw("Log:url") {
        tracing::info!(url, "writing log");
    } else {
        tracing::info!("not writing logfile");
    }

    let mut options = RunOptions::new(&cli.input).with_base_dir(&cli.base_dir);
    if let Some(palette) = &cli.palette {
        options = options.with_palette(palette);
    }

    if let Err(e) = run_config(config, &options) {
        tracing::error!(error = %e, "run failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
