//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};

/// Sweep command arguments.
#[derive(Debug, Args)]
pub struct SweepCommand {
    /// Date to sweep (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

/// Generate command arguments.
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Directory for the QR code images (overrides `codegen.output_dir`)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Date to report (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
