//! fints-ofx CLI
//!
//! Exports the statements of all configured bank accounts as OFX files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- configure
//! cargo run -- -v export --source exports --output-dir out
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `info` to control logging verbosity

use clap::{Parser, Subcommand};
use fints_ofx::config::{self, CONFIG_FILE_NAME};
use fints_ofx::{AppConfig, CsvConnector, ExportOptions, Exporter, Result};
use log::debug;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "fints-ofx",
    version,
    about = "Export bank account statements as open financial exchange (ofx) files"
)]
struct Cli {
    /// Print the exported transactions
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print nothing on success
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (default: ./config.yaml or ~/.config/fints-ofx/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export transactions as ofx files
    Export {
        /// Directory holding one CSV export directory per institution
        #[arg(short, long, default_value = ".")]
        source: PathBuf,

        /// Directory the ofx files are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write a configuration template
    Configure,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export { source, output_dir } => {
            let path = config::locate(cli.config.as_deref())?;
            debug!("Using configuration {}", path.display());
            let config = AppConfig::load(&path)?;

            let options = ExportOptions {
                output_dir,
                verbose: cli.verbose,
                quiet: cli.quiet,
                ..ExportOptions::default()
            };
            let exporter = Exporter::new(CsvConnector::new(source), options);

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            exporter.run(&config, &mut handle)?;
        }
        Command::Configure => {
            let path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            config::write_template(&path)?;
            if !cli.quiet {
                println!("Configuration template saved as {}", path.display());
            }
        }
    }

    Ok(())
}
