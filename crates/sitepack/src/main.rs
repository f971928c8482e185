//! sitepack CLI - build, stage and verify a multi-page static site.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sitepack_static::status;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "sitepack")]
#[command(about = "Build, stage and verify a multi-page static site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root; every other path is resolved against it
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Path to sitepack.toml, relative to the project root
    #[arg(short, long, default_value = "sitepack.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default sitepack.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        yes: bool,
    },

    /// Compile entry points, then stage static assets
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,

        /// Do not stage favicons and root files after the build
        #[arg(long)]
        no_stage: bool,
    },

    /// Copy favicons and root files into an already-built output directory
    Stage {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the output directory exists and is not empty
    Verify {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{} {:#}", status::FATAL, e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.root.join(&cli.config);

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.root, &config_path, yes)?;
        }
        Commands::Build {
            output,
            no_minify,
            no_stage,
        } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&cli.root, &config_path, output, minify, !no_stage)?;
        }
        Commands::Stage { output } => {
            commands::stage::run(&cli.root, &config_path, output)?;
        }
        Commands::Verify { output } => {
            commands::verify::run(&cli.root, &config_path, output)?;
        }
    }

    Ok(())
}
