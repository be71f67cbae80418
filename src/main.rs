//! brtimg - base-runtime container image builder.
//!
//! Reconciles the mock chroot package set with the modulemd profile, builds
//! a base image from the chroot, and smoke-checks the result.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use brtimg::clean;
use brtimg::config::Config;
use brtimg::modulemd::ModuleDoc;
use brtimg::pipeline;
use brtimg::preflight;
use brtimg::smoke::{self, DockerRunner};

#[derive(Parser)]
#[command(name = "brtimg")]
#[command(about = "Base-runtime container image builder")]
#[command(
    after_help = "QUICK START:\n  brtimg preflight  Check host tools\n  brtimg build      Build the base image from the mock chroot\n  brtimg smoke      Smoke-check the built image\n  brtimg clean      Remove build artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the base image (reconcile packages, init chroot, import, tag)
    Build,

    /// Run the smoke battery against the built image
    Smoke {
        /// Image to check (default: configured IMAGE_NAME)
        #[arg(long)]
        image: Option<String>,
    },

    /// Remove containers, images, and the mock chroot from previous runs
    Clean,

    /// Check host tools are available before a build
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load(&base_dir);

    match cli.command {
        Commands::Build => {
            let outcome = pipeline::run_build(&config)?;
            for warning in &outcome.warnings {
                println!("Warning: {warning}");
            }
            println!("Built image: {}", outcome.image);
        }

        Commands::Smoke { image } => {
            let image = image.unwrap_or_else(|| config.image_name.clone());
            let required = ModuleDoc::load(&config.modulemd)?
                .profile(&config.profile)?
                .rpms;

            let mut runner = DockerRunner::start(&image, config.command_timeout)?;
            let report = smoke::run_smoke(&mut runner, &required)?;
            drop(runner);

            println!("{} checks run", report.checked);
            if !report.passed() {
                for failure in &report.failures {
                    println!("FAIL: {failure}");
                }
                bail!("{} smoke checks failed", report.failures.len());
            }
            println!("Smoke checks passed.");
        }

        Commands::Clean => {
            clean::cleanup_artifacts(&config)?;
            println!("Clean complete.");
        }

        Commands::Preflight { strict } => {
            let results = preflight::check_host_tools();
            for result in &results {
                println!("{result}");
            }
            if strict && !preflight::all_passed(&results) {
                bail!("preflight checks failed");
            }
        }

        Commands::Show { what } => match what {
            ShowTarget::Config => config.print(),
        },
    }

    Ok(())
}
