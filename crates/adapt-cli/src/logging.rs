use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Maps `-v` occurrences and `--quiet` onto the console level.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Campaign internals at debug level; everything else only when it warns.
fn file_targets() -> Targets {
    Targets::new()
        .with_target("adaptflow", LevelFilter::DEBUG)
        .with_default(LevelFilter::WARN)
}

/// Plain-text campaign log: closed `campaign_*` spans carry their campaign
/// id and timings, independent of console verbosity.
fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(file_targets())
}

/// Installs the global subscriber: a compact stderr layer filtered by
/// verbosity plus, when a path is given, the campaign log file.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(level_filter(verbosity, quiet));

    let subscriber = tracing_subscriber::registry().with(stderr_layer);

    match log_file {
        Some(path) => {
            let file = File::create(path).map_err(CliError::Io)?;
            subscriber.with(file_layer(file)).init();
        }
        None => subscriber.init(),
    }

    Ok(())
}
