use super::campaign::DecisionStrategy;
use crate::core::models::task::TaskSpec;
use crate::engine::config::SurrogateSearchConfig;
use crate::engine::context::CampaignContext;
use crate::engine::decision::{BestEvaluation, Decision, DecisionResult, TerminationReason};
use crate::engine::error::EngineError;
use crate::engine::extract::{LossExtractor, SampleExtractor};
use crate::engine::tasks::surrogate_search;

/// Model-guided search for the grid point with the lowest loss.
pub struct GlobalOptimumStrategy {
    config: SurrogateSearchConfig,
    extractor: LossExtractor,
}

impl GlobalOptimumStrategy {
    pub fn new(config: SurrogateSearchConfig) -> Self {
        let extractor = LossExtractor::new(config.loss_metric);
        Self { config, extractor }
    }

    pub fn config(&self) -> &SurrogateSearchConfig {
        &self.config
    }

    fn search(&self, context: &CampaignContext) -> Result<Vec<TaskSpec>, EngineError> {
        surrogate_search::run(
            &self.config.grid,
            context.cache(),
            context.in_flight(),
            context.remaining_budget(),
            &self.config,
        )
    }

    fn best_evaluation(
        &self,
        context: &CampaignContext,
    ) -> Result<Option<BestEvaluation>, EngineError> {
        context
            .cache()
            .best()
            .map(|entry| -> Result<BestEvaluation, EngineError> {
                Ok(BestEvaluation {
                    settings: self.config.grid.settings(&entry.point)?,
                    point: entry.point,
                    value: entry.value,
                })
            })
            .transpose()
    }
}

impl DecisionStrategy for GlobalOptimumStrategy {
    fn name(&self) -> &'static str {
        "surrogate"
    }

    fn initial_tasks(&self, context: &CampaignContext) -> Result<Vec<TaskSpec>, EngineError> {
        self.search(context)
    }

    fn decide(&self, context: &CampaignContext) -> Result<Decision, EngineError> {
        let subtasks = self.search(context)?;
        if !subtasks.is_empty() {
            return Ok(Decision::Expand { subtasks });
        }

        let reason = if context.remaining_budget() == 0 {
            TerminationReason::BudgetExhausted
        } else if context.cache().covers(&self.config.grid) {
            TerminationReason::GridExhausted
        } else {
            TerminationReason::SearchStalled
        };
        Ok(Decision::Terminate {
            result: self.best_evaluation(context)?.map(DecisionResult::Surrogate),
            reason,
        })
    }

    fn extractor(&self) -> &dyn SampleExtractor {
        &self.extractor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::grid::{Dimension, Domain, GridPoint, ParameterGrid};
    use crate::core::models::ids::CampaignId;

    fn config() -> SurrogateSearchConfig {
        let grid = ParameterGrid::new(vec![Dimension {
            name: "ISMEAR".to_string(),
            domain: Domain::IntRange {
                low: 0,
                high: 2,
                step: 1,
            },
        }])
        .unwrap();
        SurrogateSearchConfig {
            max_tasks_per_round: 2,
            ..SurrogateSearchConfig::new(grid)
        }
    }

    fn context_with(values: &[(usize, f64)], budget: usize) -> CampaignContext {
        let mut context = CampaignContext::new(CampaignId::new("c"), budget);
        for &(i, value) in values {
            context
                .record_evaluation(GridPoint::new(vec![i]), value)
                .unwrap();
        }
        context
    }

    #[test]
    fn open_grid_expands_with_evaluation_pairs() {
        let strategy = GlobalOptimumStrategy::new(config());
        let decision = strategy.decide(&context_with(&[(1, -3.0)], 4)).unwrap();

        let Decision::Expand { subtasks } = decision else {
            panic!("expected an expansion");
        };
        assert_eq!(subtasks.len(), 4);
        assert!(subtasks.iter().all(|s| s.grid_point() != Some(&GridPoint::new(vec![1]))));
    }

    #[test]
    fn covered_grid_terminates_with_best_evaluation() {
        let strategy = GlobalOptimumStrategy::new(config());
        let decision = strategy
            .decide(&context_with(&[(0, -1.0), (1, -3.0), (2, -2.0)], 4))
            .unwrap();

        match decision {
            Decision::Terminate {
                reason: TerminationReason::GridExhausted,
                result: Some(DecisionResult::Surrogate(best)),
            } => {
                assert_eq!(best.point, GridPoint::new(vec![1]));
                assert_eq!(best.value, -3.0);
                assert_eq!(best.settings[0].name, "ISMEAR");
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn spent_budget_terminates_before_the_grid_is_covered() {
        let strategy = GlobalOptimumStrategy::new(config());
        let decision = strategy.decide(&context_with(&[(0, -1.0)], 0)).unwrap();
        assert!(matches!(
            decision,
            Decision::Terminate {
                reason: TerminationReason::BudgetExhausted,
                ..
            }
        ));
    }
}
