use super::tree::{RegressionTree, TreeParams};
use super::{Prediction, SurrogateError, SurrogateModel, check_training_set, mean_and_std};
use crate::engine::utils::sampling::bootstrap_indices;
use rand::SeedableRng;
use rand::rngs::StdRng;

const FOREST_SIZE: usize = 32;

/// Bagged regression trees; the spread is the disagreement between trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    seed: u64,
    params: TreeParams,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            params: TreeParams::default(),
            trees: Vec::new(),
        }
    }
}

impl SurrogateModel for RandomForest {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), SurrogateError> {
        check_training_set(features, targets)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.trees = (0..FOREST_SIZE)
            .map(|_| {
                let rows = bootstrap_indices(targets.len(), &mut rng)
                    .map_err(|_| SurrogateError::EmptyTrainingSet)?;
                Ok(RegressionTree::fit(features, targets, &rows, self.params))
            })
            .collect::<Result<Vec<_>, SurrogateError>>()?;
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Prediction {
        let votes: Vec<f64> = self.trees.iter().map(|t| t.predict(features)).collect();
        let (mean, std) = mean_and_std(&votes);
        Prediction { mean, std }
    }
}
