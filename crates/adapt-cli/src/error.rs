use adaptflow::core::io::samples::SeriesLoadError;
use adaptflow::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration describes a different kind of campaign than the
    /// subcommand drives.
    #[error("The '{command}' command needs a {expected} campaign, found '{found}'.")]
    StrategyMismatch {
        command: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("Failed to load the sample series: {0}")]
    Samples(#[from] SeriesLoadError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
