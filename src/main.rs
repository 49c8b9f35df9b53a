use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fv3config::{enable_nudging, enable_restart, load_file, dump_file, write_run_directory};
use fv3config::config::AssetSource;

/// CLI for fv3config: assemble FV3GFS run directories from YAML
/// configurations.
#[derive(Parser)]
#[clap(
    name = "fv3config",
    version,
    about = "Assemble ready-to-run FV3GFS run directories from a declarative configuration"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the run directory described by a configuration file
    WriteRundir {
        /// Path to the YAML config file
        config: PathBuf,
        /// Target run directory
        rundir: PathBuf,
    },
    /// Rewrite a configuration in place for restart operation
    EnableRestart {
        /// Path to the YAML config file
        config: PathBuf,
        /// Directory holding the restart initial conditions
        initial_conditions: String,
    },
    /// Rewrite a configuration in place for nudged operation, when
    /// fv_core_nml.nudge is set
    EnableNudging {
        /// Path to the YAML config file
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::WriteRundir { config, rundir } => {
            let config = load_file(&config).context("failed to load configuration")?;
            write_run_directory(&config, &rundir)
                .await
                .context("failed to write run directory")?;
            println!("Wrote run directory to {}", rundir.display());
        }
        Commands::EnableRestart {
            config: config_path,
            initial_conditions,
        } => {
            let config = load_file(&config_path).context("failed to load configuration")?;
            let mut updated = enable_restart(&config)?;
            updated.initial_conditions = AssetSource::Path(initial_conditions);
            dump_file(&updated, &config_path).context("failed to rewrite configuration")?;
            println!("Enabled restart in {}", config_path.display());
        }
        Commands::EnableNudging {
            config: config_path,
        } => {
            let config = load_file(&config_path).context("failed to load configuration")?;
            if config
                .namelist_bool("fv_core_nml", "nudge")
                .unwrap_or(false)
            {
                let updated = enable_nudging(&config).await?;
                dump_file(&updated, &config_path).context("failed to rewrite configuration")?;
                println!("Enabled nudging in {}", config_path.display());
            } else {
                println!(
                    "fv_core_nml.nudge is not set in {}, leaving it untouched",
                    config_path.display()
                );
            }
        }
    }
    Ok(())
}
