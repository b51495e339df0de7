use super::campaign::DecisionStrategy;
use crate::core::models::task::{TaskKind, TaskSpec};
use crate::core::utils::geometry::{displace_along, unit_direction};
use crate::engine::config::DistanceSearchConfig;
use crate::engine::context::CampaignContext;
use crate::engine::decision::{Decision, DecisionResult, TerminationReason};
use crate::engine::error::EngineError;
use crate::engine::extract::{ObservableExtractor, SampleExtractor};
use crate::engine::tasks::distance_search;
use nalgebra::Point3;
use tracing::info;

/// Name of the observable every distance probe reports.
pub const ENERGY_OBSERVABLE: &str = "energy";

/// Probes a small set of distances, locates the optimum, then relaxes the
/// structure from it.
pub struct DistanceStrategy {
    config: DistanceSearchConfig,
    extractor: ObservableExtractor,
}

impl DistanceStrategy {
    pub fn new(config: DistanceSearchConfig) -> Self {
        Self {
            config,
            extractor: ObservableExtractor::new(ENERGY_OBSERVABLE),
        }
    }

    pub fn config(&self) -> &DistanceSearchConfig {
        &self.config
    }

    fn probe_position(&self, distance: f64) -> Option<Point3<f64>> {
        let site = self.config.probe_site.as_ref()?;
        let direction = unit_direction(&site.normal)?;
        Some(displace_along(&site.coordinate, &direction, distance))
    }
}

impl DecisionStrategy for DistanceStrategy {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn initial_tasks(&self, context: &CampaignContext) -> Result<Vec<TaskSpec>, EngineError> {
        let mut specs: Vec<TaskSpec> = self
            .config
            .probe_distances
            .iter()
            .enumerate()
            .map(|(index, &distance)| {
                TaskSpec::new(
                    format!("probe at {:.3}", distance),
                    TaskKind::DistanceProbe {
                        index,
                        distance,
                        probe_position: self.probe_position(distance),
                    },
                )
                .expecting(&[ENERGY_OBSERVABLE])
            })
            .collect();

        let probes = specs.len();
        specs.push(
            TaskSpec::new(
                "analyse probe round",
                TaskKind::DistanceAnalysis {
                    round: context.round() + 1,
                },
            )
            .with_dependencies((0..probes).collect())
            .allowing_failed_parents(),
        );
        Ok(specs)
    }

    fn decide(&self, context: &CampaignContext) -> Result<Decision, EngineError> {
        if context.relaxation().is_some() {
            let estimate = distance_search::find_optimum(
                context.series(),
                &self.config,
                context.cell_volume(),
            )?;
            info!(
                parameter = estimate.parameter,
                score = ?estimate.derived_score,
                "Relaxation finished; closing the distance campaign."
            );
            return Ok(Decision::Terminate {
                result: Some(DecisionResult::Distance(estimate)),
                reason: TerminationReason::Completed,
            });
        }
        distance_search::decide(context.series(), &self.config, context.cell_volume())
    }

    fn continuation_tasks(
        &self,
        next_parameter: f64,
        context: &CampaignContext,
    ) -> Vec<TaskSpec> {
        let parent_artifacts = context
            .series()
            .samples()
            .iter()
            .min_by(|a, b| {
                (a.parameter - next_parameter)
                    .abs()
                    .total_cmp(&(b.parameter - next_parameter).abs())
            })
            .map(|sample| vec![sample.artifact.clone()])
            .unwrap_or_default();

        vec![
            TaskSpec::new(
                format!("relax from {:.3}", next_parameter),
                TaskKind::OptimumRelaxation {
                    distance: next_parameter,
                    probe_position: self.probe_position(next_parameter),
                },
            )
            .with_parent_artifacts(parent_artifacts)
            .expecting(&[ENERGY_OBSERVABLE, "structure"]),
            TaskSpec::new(
                "analyse relaxation",
                TaskKind::DistanceAnalysis {
                    round: context.round() + 1,
                },
            )
            .with_dependencies(vec![0])
            .allowing_failed_parents(),
        ]
    }

    fn extractor(&self) -> &dyn SampleExtractor {
        &self.extractor
    }
}
