use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The adaptflow developers",
    version,
    about = "adaptflow CLI - drives adaptive simulation campaigns: distance searches, structure annotation and surrogate-guided parameter searches.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one distance decision round over a stored sample series.
    Distance(DistanceArgs),
    /// Label surface positions and classify the adsorption site of a structure.
    Site(SiteArgs),
    /// Run one surrogate search round and emit the requested evaluations.
    Plan(PlanArgs),
}

/// Arguments for the `distance` subcommand.
#[derive(Args, Debug)]
pub struct DistanceArgs {
    /// Path to the campaign configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// CSV file with `parameter,observable[,artifact]` rows.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub samples: PathBuf,

    /// Final structure (JSON) accompanying the samples, used for scoring and annotation.
    #[arg(long, value_name = "PATH")]
    pub structure: Option<PathBuf>,

    /// Directory the final campaign record is stored in.
    #[arg(long, value_name = "DIR", default_value = "records")]
    pub records: PathBuf,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S distance.method=polynomial
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `site` subcommand.
#[derive(Args, Debug)]
pub struct SiteArgs {
    /// Structure (JSON) with positions, probe ids, normal and lattice repeat.
    #[arg(long, required = true, value_name = "PATH")]
    pub structure: PathBuf,

    /// Height window below the top layer that still counts as surface.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.9)]
    pub height: f64,
}

/// Arguments for the `plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the campaign configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Stored evaluation cache (JSON list of `{point, value}` entries).
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Override the remaining search budget.
    #[arg(short, long, value_name = "INT")]
    pub budget: Option<usize>,

    /// Write the emitted task specifications to a file instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S surrogate.model=gaussian-process
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
