use crate::core::io::persistence::{
    PersistOutcome, PersistenceError, RecordSink, persist_with_fallback,
};
use crate::core::models::completion::Completion;
use crate::core::models::grid::GridPoint;
use crate::core::models::ids::TaskId;
use crate::core::models::sample::{Sample, SampleSeries};
use crate::core::models::structure::StructureGeometry;
use crate::core::models::task::{TaskSpec, WorkKey};
use crate::engine::cache::EvaluationCache;
use crate::engine::config::CampaignConfig;
use crate::engine::context::CampaignContext;
use crate::engine::decision::{Decision, DecisionReport, DecisionResult, TerminationReason};
use crate::engine::error::EngineError;
use crate::engine::extract::SampleExtractor;
use crate::engine::graph::GraphMutator;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::record::CampaignRecord;
use crate::engine::state::{CampaignPhase, RoundProgress};
use crate::engine::tasks::site_annotation;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// A pluggable decision strategy.
///
/// Strategies are pure: they read the campaign context and return task
/// specifications or a [`Decision`], and never see the task graph.
pub trait DecisionStrategy {
    fn name(&self) -> &'static str;

    /// Work attached under the root task when the campaign is launched.
    fn initial_tasks(&self, context: &CampaignContext) -> Result<Vec<TaskSpec>, EngineError>;

    fn decide(&self, context: &CampaignContext) -> Result<Decision, EngineError>;

    /// Work that materializes a `Continue` decision.
    fn continuation_tasks(
        &self,
        _next_parameter: f64,
        _context: &CampaignContext,
    ) -> Vec<TaskSpec> {
        Vec::new()
    }

    fn extractor(&self) -> &dyn SampleExtractor;
}

/// What a call to [`CampaignController::advance`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The round has not settled yet.
    Waiting { received: usize, expected: usize },
    /// New work was attached under the deciding task.
    Expanded { round: usize, tasks: Vec<TaskId> },
    /// The final record was handed to persistence.
    Terminated {
        reason: TerminationReason,
        outcome: PersistOutcome,
    },
}

/// Drives one campaign through `Sampling -> Deciding -> {Expanding | Terminating}`.
pub struct CampaignController<'a, S: DecisionStrategy> {
    context: CampaignContext,
    strategy: S,
    phase: CampaignPhase,
    record: CampaignRecord,
    expected_override: Option<usize>,
    annotation_height: f64,
    fallback_dir: PathBuf,
    reporter: &'a ProgressReporter<'a>,
    deciding_task: Option<TaskId>,
    last_decision: Option<DecisionReport>,
    /// Work already accounted for in the current round.
    settled: Vec<WorkKey>,
}

impl<'a, S: DecisionStrategy> CampaignController<'a, S> {
    pub fn new(config: &CampaignConfig, strategy: S, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            context: CampaignContext::new(config.campaign.clone(), config.search_budget),
            record: CampaignRecord::new(config.campaign.clone(), strategy.name()),
            strategy,
            phase: CampaignPhase::Pending,
            expected_override: config.expected_samples_per_round,
            annotation_height: config.annotation_height,
            fallback_dir: config.fallback_dir.clone(),
            reporter,
            deciding_task: None,
            last_decision: None,
            settled: Vec::new(),
        }
    }

    /// Seeds the campaign with samples gathered outside the controller.
    pub fn with_series(mut self, series: SampleSeries) -> Self {
        self.context = self.context.with_series(series);
        self
    }

    pub fn with_cache(mut self, cache: EvaluationCache) -> Self {
        self.context = self.context.with_cache(cache);
        self
    }

    pub fn with_geometry(mut self, geometry: StructureGeometry) -> Self {
        self.context = self.context.with_geometry(geometry);
        self
    }

    pub fn phase(&self) -> &CampaignPhase {
        &self.phase
    }

    pub fn context(&self) -> &CampaignContext {
        &self.context
    }

    pub fn record(&self) -> &CampaignRecord {
        &self.record
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The most recent decision together with the evidence behind it.
    pub fn last_decision(&self) -> Option<&DecisionReport> {
        self.last_decision.as_ref()
    }

    /// Attaches the opening round under `root` and starts sampling.
    ///
    /// The opening round does not consume search budget.
    #[instrument(skip_all, name = "campaign_launch", fields(campaign = %self.context.campaign()))]
    pub fn launch(
        &mut self,
        graph: &mut impl GraphMutator,
        root: TaskId,
    ) -> Result<Vec<TaskId>, EngineError> {
        self.require_pending("launch")?;
        self.reporter.report(Progress::PhaseStart { name: "Launch" });
        info!(strategy = self.strategy.name(), "Launching campaign.");

        let specs = self.strategy.initial_tasks(&self.context)?;
        self.deciding_task = Some(root);
        let ids = self.expand(graph, root, specs, false)?;

        self.reporter.report(Progress::PhaseFinish);
        Ok(ids)
    }

    /// Starts a campaign whose samples were all gathered beforehand, so the
    /// next [`advance`](Self::advance) decides immediately.
    pub fn resume(&mut self, deciding_task: TaskId) -> Result<(), EngineError> {
        self.require_pending("resume")?;
        let available = self.context.series().len() + self.context.cache().len();
        let round = self.context.advance_round();
        self.record.rounds = round;
        self.deciding_task = Some(deciding_task);
        self.settled.clear();
        self.phase = CampaignPhase::Sampling(RoundProgress {
            round,
            expected: available,
            received: available,
            failed: 0,
        });
        info!(round, samples = available, "Resuming campaign from stored samples.");
        Ok(())
    }

    /// Accounts for one finished heavy unit.
    ///
    /// Completions may arrive in any order. A failed unit or one whose
    /// observable cannot be extracted counts as missing. Completions outside
    /// of a sampling phase, and repeats of a unit already accounted for in
    /// this round, are ignored.
    pub fn on_completion(&mut self, completion: Completion) -> Result<(), EngineError> {
        if !matches!(self.phase, CampaignPhase::Sampling(_)) {
            warn!(
                work = %completion.key,
                phase = %self.phase,
                "Ignoring completion outside of a sampling phase."
            );
            return Ok(());
        }
        if self.settled.contains(&completion.key) {
            warn!(work = %completion.key, "Ignoring repeated completion.");
            return Ok(());
        }
        self.settled.push(completion.key.clone());
        let work = completion.key.to_string();

        if let WorkKey::Grid { point } = &completion.key {
            if !completion.succeeded {
                self.context.release_in_flight(point);
            }
        }
        if let Some(geometry) = completion.geometry.clone() {
            self.context.record_geometry(geometry);
        }

        if !completion.succeeded {
            warn!(work = %work, "Work unit failed; counting its sample as missing.");
            self.record.warn(format!("{} failed", work));
            self.count_missing(work);
            return Ok(());
        }

        let value = match self.strategy.extractor().extract(&completion) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Sample unavailable; counting it as missing.");
                self.record.warn(e.to_string());
                if let WorkKey::Grid { point } = &completion.key {
                    self.context.release_in_flight(point);
                }
                self.count_missing(work);
                return Ok(());
            }
        };

        let artifact = completion.primary_artifact();
        match completion.key {
            WorkKey::Distance { distance } => {
                self.context.record_sample(Sample::new(distance, value, artifact));
            }
            WorkKey::Grid { point } => {
                if let Err(e) = self.context.record_evaluation(point, value) {
                    warn!(error = %e, "Evaluation cache violated; aborting campaign.");
                    self.record.warn(e.to_string());
                    self.context.request_abort();
                    return Err(e);
                }
            }
            WorkKey::Relaxation { distance } => {
                self.context.record_relaxation(Sample::new(distance, value, artifact));
            }
        }

        if let CampaignPhase::Sampling(progress) = &mut self.phase {
            progress.received += 1;
        }
        debug!(work = %work, value, "Recorded completion.");
        self.reporter.report(Progress::CompletionRecorded { work });
        Ok(())
    }

    /// Sets the abort flag; the next [`advance`](Self::advance) terminates.
    pub fn request_abort(&mut self) {
        info!(campaign = %self.context.campaign(), "Abort requested.");
        self.context.request_abort();
    }

    /// Computes the decision for the current state without changing it.
    ///
    /// Identical state yields an identical decision.
    pub fn decide(&self) -> Result<DecisionReport, EngineError> {
        let decision = if self.context.abort_requested() {
            Decision::terminate(TerminationReason::Aborted)
        } else if matches!(
            self.phase,
            CampaignPhase::Sampling(progress) if progress.expected > 0 && progress.received == 0
        ) {
            Decision::terminate(TerminationReason::NoUsableSamples)
        } else {
            self.strategy.decide(&self.context)?
        };
        Ok(DecisionReport {
            decision,
            samples: self.context.series().samples().to_vec(),
            evaluations: self.context.cache().entries(),
        })
    }

    /// Moves a settled round forward: decide, then expand or terminate.
    #[instrument(skip_all, name = "campaign_advance", fields(campaign = %self.context.campaign()))]
    pub fn advance(
        &mut self,
        graph: &mut impl GraphMutator,
        sink: &dyn RecordSink,
    ) -> Result<Transition, EngineError> {
        let progress = match &self.phase {
            CampaignPhase::Sampling(progress) => *progress,
            other => {
                return Err(EngineError::InvalidTransition {
                    action: "advance",
                    phase: other.to_string(),
                });
            }
        };
        if !progress.is_settled() && !self.context.abort_requested() {
            return Ok(Transition::Waiting {
                received: progress.received + progress.failed,
                expected: progress.expected,
            });
        }

        self.reporter.report(Progress::PhaseStart { name: "Deciding" });
        let report = match self.decide() {
            Ok(report) => report,
            Err(e) => {
                self.fail(TerminationReason::Aborted, &e, sink)?;
                return Err(e);
            }
        };
        self.phase = CampaignPhase::Deciding;
        self.reporter.report(Progress::Decided {
            decision: report.decision.kind(),
        });
        self.reporter.report(Progress::PhaseFinish);
        self.note_result(report.decision.result());
        let decision = report.decision.clone();
        self.last_decision = Some(report);

        match decision {
            Decision::Terminate { .. } => self.terminate(decision, sink),
            Decision::Continue {
                next_parameter,
                basis,
            } => {
                if self.context.remaining_budget() == 0 {
                    return self.terminate(
                        Decision::Terminate {
                            result: basis,
                            reason: TerminationReason::BudgetExhausted,
                        },
                        sink,
                    );
                }
                let specs = self
                    .strategy
                    .continuation_tasks(next_parameter, &self.context);
                self.expand_round(graph, specs, sink)
            }
            Decision::Expand { subtasks } => {
                if self.context.remaining_budget() == 0 {
                    return self
                        .terminate(Decision::terminate(TerminationReason::BudgetExhausted), sink);
                }
                if subtasks.is_empty() {
                    return self
                        .terminate(Decision::terminate(TerminationReason::SearchStalled), sink);
                }
                self.expand_round(graph, subtasks, sink)
            }
        }
    }

    fn expand_round(
        &mut self,
        graph: &mut impl GraphMutator,
        specs: Vec<TaskSpec>,
        sink: &dyn RecordSink,
    ) -> Result<Transition, EngineError> {
        let Some(parent) = self.deciding_task else {
            let e = EngineError::Internal("campaign has no deciding task".to_string());
            self.fail(TerminationReason::Aborted, &e, sink)?;
            return Err(e);
        };
        match self.expand(graph, parent, specs, true) {
            Ok(tasks) => Ok(Transition::Expanded {
                round: self.context.round(),
                tasks,
            }),
            Err(e) => {
                let reason = match e {
                    EngineError::DuplicateWorkRequested { .. } => TerminationReason::DuplicateWork,
                    _ => TerminationReason::Aborted,
                };
                self.fail(reason, &e, sink)?;
                Err(e)
            }
        }
    }

    /// Attaches `specs` under `parent` and opens the next sampling round.
    fn expand(
        &mut self,
        graph: &mut impl GraphMutator,
        parent: TaskId,
        specs: Vec<TaskSpec>,
        consume_budget: bool,
    ) -> Result<Vec<TaskId>, EngineError> {
        self.phase = CampaignPhase::Expanding;

        let mut batch_points: BTreeSet<GridPoint> = BTreeSet::new();
        for point in specs.iter().filter_map(TaskSpec::grid_point) {
            if self.context.in_flight().contains(point)
                || self.context.cache().contains(point)
                || !batch_points.insert(point.clone())
            {
                return Err(EngineError::DuplicateWorkRequested {
                    point: point.clone(),
                });
            }
        }

        let heavy = specs.iter().filter(|s| s.is_heavy()).count();
        let next_deciding = specs.iter().rposition(|s| !s.is_heavy());
        let ids = graph.attach(parent, specs)?;

        for point in batch_points {
            self.context.mark_in_flight(point);
        }
        if consume_budget {
            self.context.consume_budget();
        }
        if let Some(position) = next_deciding {
            self.deciding_task = Some(ids[position]);
        }

        let expected = match self.expected_override {
            Some(count) if heavy > 0 => count.min(heavy),
            _ => heavy,
        };
        let round = self.context.advance_round();
        self.record.rounds = round;
        self.settled.clear();
        self.phase = CampaignPhase::Sampling(RoundProgress::new(round, expected));

        info!(
            round,
            tasks = ids.len(),
            expected,
            budget = self.context.remaining_budget(),
            "Expanded task graph."
        );
        self.reporter.report(Progress::Expanded {
            round,
            tasks: ids.len(),
        });
        self.reporter.report(Progress::RoundStart { round, expected });
        Ok(ids)
    }

    /// Finishes after a fatal or unexpected error, persisting what is known.
    fn fail(
        &mut self,
        reason: TerminationReason,
        error: &EngineError,
        sink: &dyn RecordSink,
    ) -> Result<(), EngineError> {
        warn!(error = %error, reason = %reason, "Campaign cannot continue.");
        self.record.warn(error.to_string());
        self.terminate(Decision::terminate(reason), sink)?;
        Ok(())
    }

    /// Assembles the final record, hands it to persistence and finishes.
    fn terminate(
        &mut self,
        decision: Decision,
        sink: &dyn RecordSink,
    ) -> Result<Transition, EngineError> {
        self.phase = CampaignPhase::Terminating;
        let reason = match &decision {
            Decision::Terminate { reason, .. } => *reason,
            _ => TerminationReason::Completed,
        };
        self.reporter.report(Progress::PhaseStart { name: "Terminating" });

        self.record.samples = self.context.series().samples().to_vec();
        self.record.evaluations = self.context.cache().entries();
        self.record.relaxation = self.context.relaxation().cloned();
        self.note_result(decision.result());
        self.record.annotation = self
            .context
            .final_geometry()
            .map(|geometry| site_annotation::run(geometry, self.annotation_height));
        self.record.final_decision = Some(decision);
        self.record.termination_reason = Some(reason);

        self.phase = CampaignPhase::Finished { reason };
        self.context.discard_series();

        let json = self.record.to_json().map_err(PersistenceError::from)?;
        let outcome = persist_with_fallback(
            sink,
            self.context.campaign(),
            &json,
            &self.fallback_dir,
        )?;

        info!(reason = %reason, outcome = ?outcome, "Campaign finished.");
        self.reporter.report(Progress::Terminated {
            reason: reason.to_string(),
        });
        self.reporter.report(Progress::PhaseFinish);
        Ok(Transition::Terminated { reason, outcome })
    }

    /// Keeps the latest strategy result so that a later failure still
    /// reports it.
    fn note_result(&mut self, result: Option<&DecisionResult>) {
        match result {
            Some(DecisionResult::Distance(estimate)) => self.record.optimum = Some(*estimate),
            Some(DecisionResult::Surrogate(best)) => {
                self.record.best_evaluation = Some(best.clone())
            }
            None => {}
        }
    }

    fn count_missing(&mut self, work: String) {
        if let CampaignPhase::Sampling(progress) = &mut self.phase {
            progress.failed += 1;
        }
        self.reporter.report(Progress::CompletionMissing { work });
    }

    fn require_pending(&self, action: &'static str) -> Result<(), EngineError> {
        match self.phase {
            CampaignPhase::Pending => Ok(()),
            ref other => Err(EngineError::InvalidTransition {
                action,
                phase: other.to_string(),
            }),
        }
    }
}
