use super::{emit_json, read_json};
use crate::cli::DistanceArgs;
use crate::config::PartialCampaignFile;
use crate::error::{CliError, Result};
use crate::progress::CliProgressHandler;
use adaptflow::core::io::persistence::{JsonDirectorySink, PersistOutcome};
use adaptflow::core::io::samples::read_series;
use adaptflow::core::models::structure::StructureGeometry;
use adaptflow::core::models::task::{TaskKind, TaskSpec};
use adaptflow::engine::config::StrategyConfig;
use adaptflow::engine::decision::{DecisionReport, TerminationReason};
use adaptflow::engine::graph::TaskGraph;
use adaptflow::engine::progress::ProgressReporter;
use adaptflow::workflows::campaign::{CampaignController, Transition};
use adaptflow::workflows::distance::DistanceStrategy;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// What one distance round produced, printed as JSON.
#[derive(Debug, Serialize)]
pub struct DistanceSummary {
    pub campaign: String,
    pub decision: Option<DecisionReport>,
    /// Work attached for the next round; empty once the campaign ended.
    pub tasks: Vec<TaskSpec>,
    pub termination_reason: Option<TerminationReason>,
    pub record: Option<PathBuf>,
}

pub fn run(args: DistanceArgs) -> Result<()> {
    let summary = execute(&args)?;
    match (&summary.termination_reason, &summary.record) {
        (Some(reason), Some(path)) => println!(
            "Campaign finished ({}); record written to {}",
            reason,
            path.display()
        ),
        _ => println!(
            "Campaign continues with {} new task(s).",
            summary.tasks.iter().filter(|t| t.is_heavy()).count()
        ),
    }
    emit_json(&summary, None)
}

pub fn execute(args: &DistanceArgs) -> Result<DistanceSummary> {
    let config =
        PartialCampaignFile::from_file(&args.config)?.merge_with_cli(&args.set_values, None)?;
    let StrategyConfig::Distance(distance_config) = config.strategy.clone() else {
        return Err(CliError::StrategyMismatch {
            command: "distance",
            expected: "distance",
            found: config.strategy.name().to_string(),
        });
    };

    info!("Loading samples from {:?}", &args.samples);
    let series = read_series(&args.samples, config.campaign.clone())?;

    let handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(handler.get_callback());
    let mut controller =
        CampaignController::new(&config, DistanceStrategy::new(distance_config), &reporter)
            .with_series(series);
    if let Some(path) = &args.structure {
        info!("Loading final structure from {:?}", path);
        let geometry: StructureGeometry = read_json(path)?;
        controller = controller.with_geometry(geometry);
    }

    let mut graph = TaskGraph::new();
    let root = graph.add_root(TaskSpec::new(
        "campaign root",
        TaskKind::DistanceAnalysis { round: 0 },
    ));
    let sink = JsonDirectorySink::new(args.records.clone());

    controller.resume(root)?;
    let transition = controller.advance(&mut graph, &sink)?;

    let mut summary = DistanceSummary {
        campaign: config.campaign.as_str().to_string(),
        decision: controller.last_decision().cloned(),
        tasks: Vec::new(),
        termination_reason: None,
        record: None,
    };
    match transition {
        Transition::Expanded { round, tasks } => {
            info!(round, tasks = tasks.len(), "Distance campaign expanded.");
            summary.tasks = tasks
                .iter()
                .filter_map(|id| graph.node(*id).map(|node| node.spec.clone()))
                .collect();
        }
        Transition::Terminated { reason, outcome } => {
            summary.termination_reason = Some(reason);
            summary.record = Some(match outcome {
                PersistOutcome::Stored => sink.record_path(&config.campaign),
                PersistOutcome::FallbackFile(path) => path,
            });
        }
        Transition::Waiting { received, expected } => {
            warn!(received, expected, "Round did not settle from stored samples.");
        }
    }
    Ok(summary)
}
