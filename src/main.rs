//! Waruna Dataset Preparation CLI
//!
//! Command-line entry point for the two dataset-preparation utilities:
//! topping up under-populated class folders with augmented samples, and
//! aggregating VIA region-annotation exports into one class mapping.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use waruna_dataprep::augment::pipeline::AugmentationPolicy;
use waruna_dataprep::augment::{fill_to_target, FillConfig};
use waruna_dataprep::annotations::aggregate_to_file;
use waruna_dataprep::utils::logging::{init_logging, LogConfig};
use waruna_dataprep::{DEFAULT_SEED, DEFAULT_TARGET_SAMPLES};

/// Waruna dataset preparation tools
#[derive(Parser, Debug)]
#[command(name = "waruna_dataprep")]
#[command(version)]
#[command(about = "Augmentation filler and annotation aggregator", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Top up a class folder to a target sample count with augmented copies
    Augment {
        /// Directory holding the original images of one class
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory the augmented folder is created under
        #[arg(short, long)]
        output_root: PathBuf,

        /// Total sample count to top up to
        #[arg(short, long, default_value_t = DEFAULT_TARGET_SAMPLES)]
        target: usize,

        /// Random seed for reproducible sampling
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Merge VIA annotation exports into one filename-to-class mapping
    Aggregate {
        /// Directory holding the per-batch .json exports
        #[arg(short, long, default_value = "../annotations")]
        annotations_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Augment {
            input_dir,
            output_root,
            target,
            seed,
        } => {
            cmd_augment(&input_dir, &output_root, target, seed)?;
        }

        Commands::Aggregate { annotations_dir } => {
            cmd_aggregate(&annotations_dir)?;
        }
    }

    Ok(())
}

fn cmd_augment(input_dir: &Path, output_root: &Path, target: usize, seed: u64) -> Result<()> {
    info!("Filling {:?} to {} samples (seed {})", input_dir, target, seed);

    let policy = AugmentationPolicy::default();
    let config = FillConfig {
        target_samples: target,
        seed,
    };

    match fill_to_target(input_dir, output_root, &policy, &config) {
        Ok(report) => {
            println!("{}", "Augmentation complete.".green().bold());
            println!("  Output directory:  {}", report.output_dir.display());
            println!("  Originals copied:  {}", report.originals_copied);
            println!("  Augmented written: {}", report.augmented_written);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "Augmentation failed:".red().bold(), e);
            Err(e.into())
        }
    }
}

fn cmd_aggregate(annotations_dir: &Path) -> Result<()> {
    info!("Aggregating annotations from {:?}", annotations_dir);

    match aggregate_to_file(annotations_dir) {
        Ok(output) => {
            println!(
                "{} Wrote {}",
                "Annotation aggregation complete.".green().bold(),
                output.display()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "Annotation aggregation failed:".red().bold(), e);
            Err(e.into())
        }
    }
}
