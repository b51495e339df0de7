use super::tree::{RegressionTree, TreeParams};
use super::{Prediction, SurrogateError, SurrogateModel, check_training_set, mean_and_std};
use crate::engine::utils::sampling::bootstrap_indices;
use rand::SeedableRng;
use rand::rngs::StdRng;

const ENSEMBLE_COUNT: usize = 5;
const STAGES: usize = 40;
const LEARNING_RATE: f64 = 0.1;

#[derive(Debug, Clone)]
struct BoostedEnsemble {
    base: f64,
    stages: Vec<RegressionTree>,
}

impl BoostedEnsemble {
    fn fit(features: &[Vec<f64>], targets: &[f64], rows: &[usize]) -> Self {
        let params = TreeParams {
            max_depth: 3,
            min_samples_leaf: 1,
        };
        let base = rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64;
        let mut fitted = vec![base; targets.len()];
        let mut stages = Vec::with_capacity(STAGES);
        for _ in 0..STAGES {
            let residuals: Vec<f64> = targets.iter().zip(&fitted).map(|(y, f)| y - f).collect();
            let tree = RegressionTree::fit(features, &residuals, rows, params);
            for (value, x) in fitted.iter_mut().zip(features) {
                *value += LEARNING_RATE * tree.predict(x);
            }
            stages.push(tree);
        }
        Self { base, stages }
    }

    fn predict(&self, x: &[f64]) -> f64 {
        self.base
            + self
                .stages
                .iter()
                .map(|tree| LEARNING_RATE * tree.predict(x))
                .sum::<f64>()
    }
}

/// Gradient-boosted trees on bootstrap resamples; the spread is the
/// disagreement between the resampled ensembles.
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    seed: u64,
    ensembles: Vec<BoostedEnsemble>,
}

impl GradientBoosting {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ensembles: Vec::new(),
        }
    }
}

impl SurrogateModel for GradientBoosting {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), SurrogateError> {
        check_training_set(features, targets)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let all_rows: Vec<usize> = (0..targets.len()).collect();

        let mut ensembles = Vec::with_capacity(ENSEMBLE_COUNT);
        ensembles.push(BoostedEnsemble::fit(features, targets, &all_rows));
        for _ in 1..ENSEMBLE_COUNT {
            let rows = bootstrap_indices(targets.len(), &mut rng)
                .map_err(|_| SurrogateError::EmptyTrainingSet)?;
            ensembles.push(BoostedEnsemble::fit(features, targets, &rows));
        }
        self.ensembles = ensembles;
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Prediction {
        let votes: Vec<f64> = self
            .ensembles
            .iter()
            .map(|e| e.predict(features))
            .collect();
        let (mean, std) = mean_and_std(&votes);
        Prediction { mean, std }
    }
}
