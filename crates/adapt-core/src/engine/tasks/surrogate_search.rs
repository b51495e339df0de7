use crate::core::models::grid::{GridPoint, ParameterGrid};
use crate::core::models::task::{TaskKind, TaskSpec};
use crate::engine::cache::EvaluationCache;
use crate::engine::config::SurrogateSearchConfig;
use crate::engine::error::EngineError;
use crate::engine::surrogate::{SurrogateModel, build_model};
use crate::engine::utils::sampling::{draw_unobserved, round_seed};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Neutral value the objective returns for work that has not finished yet.
pub const PLACEHOLDER_LOSS: f64 = 0.0;

/// Objective calls allowed per invocation once the cache is this large.
const LARGE_CACHE_THRESHOLD: usize = 100;
const LARGE_CACHE_CALLS: usize = 100;

/// Objective calls one invocation of the search may make.
pub fn call_budget(cached: usize, max_tasks_per_round: usize) -> usize {
    if cached < LARGE_CACHE_THRESHOLD {
        max_tasks_per_round
    } else {
        LARGE_CACHE_CALLS
    }
}

/// The objective seen by the optimizer.
///
/// Instead of running a simulation it records a request for one: a grid
/// evaluation followed by a continuation that re-enters the search once every
/// evaluation requested so far in the batch has settled. The last
/// continuation therefore waits on the whole batch.
pub struct PendingObjective<'a> {
    grid: &'a ParameterGrid,
    cache: &'a EvaluationCache,
    in_flight: &'a BTreeSet<GridPoint>,
    remaining_budget: usize,
    requested: BTreeSet<GridPoint>,
    tasks: Vec<TaskSpec>,
    evaluations: Vec<usize>,
}

impl<'a> PendingObjective<'a> {
    pub fn new(
        grid: &'a ParameterGrid,
        cache: &'a EvaluationCache,
        in_flight: &'a BTreeSet<GridPoint>,
        remaining_budget: usize,
    ) -> Self {
        Self {
            grid,
            cache,
            in_flight,
            remaining_budget,
            requested: BTreeSet::new(),
            tasks: Vec::new(),
            evaluations: Vec::new(),
        }
    }

    /// In-flight or already requested points yield the placeholder, cached
    /// points yield their stored value, and anything else is requested.
    pub fn evaluate(&mut self, point: &GridPoint) -> Result<f64, EngineError> {
        if self.in_flight.contains(point) || self.requested.contains(point) {
            return Ok(PLACEHOLDER_LOSS);
        }
        if let Some(value) = self.cache.get(point) {
            return Ok(value);
        }

        let settings = self.grid.settings(point)?;
        self.evaluations.push(self.tasks.len());
        self.tasks.push(
            TaskSpec::new(
                format!("evaluate {}", point),
                TaskKind::GridEvaluation {
                    point: point.clone(),
                    settings,
                },
            )
            .expecting(&["loss"]),
        );
        self.tasks.push(
            TaskSpec::new(
                format!("continue search after {}", point),
                TaskKind::SurrogateContinuation {
                    remaining_budget: self.remaining_budget.saturating_sub(1),
                },
            )
            .with_dependencies(self.evaluations.clone())
            .allowing_failed_parents(),
        );
        self.requested.insert(point.clone());
        debug!(point = %point, "Requested grid evaluation.");
        Ok(PLACEHOLDER_LOSS)
    }

    pub fn requested(&self) -> usize {
        self.requested.len()
    }

    pub fn into_tasks(self) -> Vec<TaskSpec> {
        self.tasks
    }
}

/// Runs one round of model-guided search over `grid`.
///
/// The model is seeded with every cached evaluation; each objective call
/// either reuses a known value or requests new work. The returned batch holds
/// one evaluation/continuation pair per requested grid point and is empty
/// once the budget is spent or the cache covers the grid.
#[instrument(skip_all, name = "surrogate_search_task", fields(budget = remaining_budget, cached = cache.len()))]
pub fn run(
    grid: &ParameterGrid,
    cache: &EvaluationCache,
    in_flight: &BTreeSet<GridPoint>,
    remaining_budget: usize,
    config: &SurrogateSearchConfig,
) -> Result<Vec<TaskSpec>, EngineError> {
    if remaining_budget == 0 {
        info!("Search budget exhausted; no further evaluations.");
        return Ok(Vec::new());
    }
    if cache.covers(grid) {
        info!(points = grid.point_count(), "Every grid point is evaluated.");
        return Ok(Vec::new());
    }

    let candidates: Vec<GridPoint> = grid.points().collect();
    let candidate_features: Vec<Vec<f64>> = candidates
        .iter()
        .map(|p| grid.features(p))
        .collect::<Result<_, _>>()?;

    let mut rng = StdRng::seed_from_u64(round_seed(config.seed, cache.len(), remaining_budget));
    let mut model = build_model(config.model, config.seed);
    let mut objective = PendingObjective::new(grid, cache, in_flight, remaining_budget);

    let mut observed: HashSet<GridPoint> = HashSet::new();
    let mut train_x: Vec<Vec<f64>> = Vec::new();
    let mut train_y: Vec<f64> = Vec::new();
    for entry in cache.entries() {
        train_x.push(grid.features(&entry.point)?);
        train_y.push(entry.value);
        observed.insert(entry.point);
    }

    let calls = call_budget(cache.len(), config.max_tasks_per_round);
    for _ in 0..calls {
        let proposal = if train_y.len() < config.initial_points {
            draw_unobserved(&candidates, &observed, &mut rng).ok()
        } else {
            match propose(
                &mut *model,
                &train_x,
                &train_y,
                &candidates,
                &candidate_features,
                &observed,
                config.exploration_weight,
            ) {
                Ok(index) => index,
                Err(e) => {
                    warn!(error = %e, "Surrogate fit failed; proposing a random point.");
                    draw_unobserved(&candidates, &observed, &mut rng).ok()
                }
            }
        };
        let Some(index) = proposal else {
            break;
        };

        let point = &candidates[index];
        let value = objective.evaluate(point)?;
        train_x.push(candidate_features[index].clone());
        train_y.push(value);
        observed.insert(point.clone());
    }

    info!(
        requested = objective.requested(),
        model = config.model.name(),
        "Surrogate search round finished."
    );
    Ok(objective.into_tasks())
}

/// Index of the unobserved candidate with the lowest confidence bound.
fn propose(
    model: &mut dyn SurrogateModel,
    train_x: &[Vec<f64>],
    train_y: &[f64],
    candidates: &[GridPoint],
    features: &[Vec<f64>],
    observed: &HashSet<GridPoint>,
    kappa: f64,
) -> Result<Option<usize>, EngineError> {
    model.fit(train_x, train_y)?;
    let open: Vec<usize> = (0..candidates.len())
        .filter(|&i| !observed.contains(&candidates[i]))
        .collect();
    let model: &dyn SurrogateModel = model;

    #[cfg(not(feature = "parallel"))]
    let iterator = open.iter();

    #[cfg(feature = "parallel")]
    let iterator = open.par_iter();

    let scores: Vec<(usize, f64)> = iterator
        .map(|&i| (i, model.predict(&features[i]).lower_confidence_bound(kappa)))
        .collect();

    Ok(scores
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(i, _)| i))
}
