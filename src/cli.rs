// src/cli.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Path to the local capture database
    #[arg(long, global = true, default_value = "./data/trapwire")]
    pub db: PathBuf,

    /// Optional YAML file overriding the stored scoring configuration
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the attack-analysis pipeline over the captured records
    Analyze(AnalyzeArgs),
    /// Import captured records from a JSON file
    Import(ImportArgs),
    /// Manage stored configuration values
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Minimum records a source must accumulate to count as an attack
    #[arg(long, default_value_t = 10)]
    pub min_logs: usize,

    /// Only analyze records captured in the last N minutes
    #[arg(long, conflicts_with_all = ["hours", "days"])]
    pub minutes: Option<i64>,

    /// Only analyze records captured in the last N hours
    #[arg(long, conflicts_with = "days")]
    pub hours: Option<i64>,

    /// Only analyze records captured in the last N days
    #[arg(long)]
    pub days: Option<i64>,

    /// Absolute window start (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Absolute window end (RFC 3339 or YYYY-MM-DD; date-only values are
    /// inclusive through end of day)
    #[arg(long)]
    pub to: Option<String>,

    /// Filter by source address (case-insensitive regex)
    #[arg(long)]
    pub address: Option<String>,

    /// Filter by URL (case-insensitive regex)
    #[arg(long)]
    pub url: Option<String>,

    /// Page of results to print
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Results per page
    #[arg(long, default_value_t = 20)]
    pub page_size: usize,

    /// Print full attack aggregates as JSON instead of the summary table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// JSON file holding an array of captured records
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Store a configuration value
    Set { key: String, value: String },
    /// Print a stored configuration value
    Get { key: String },
    /// List all stored configuration values
    List,
    /// Delete a stored configuration value
    Delete { key: String },
}
