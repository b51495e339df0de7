//! Regression models used to rank unexplored grid points.
//!
//! Each model predicts a mean and a spread for a feature vector; the search
//! minimizes the lower confidence bound `mean - kappa * spread`.

pub mod boosted;
pub mod forest;
pub mod gaussian;
pub mod tree;

use super::config::SurrogateKind;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurrogateError {
    #[error("Cannot fit a surrogate model on an empty training set")]
    EmptyTrainingSet,
    #[error("Training set has {features} feature rows but {targets} targets")]
    LengthMismatch { features: usize, targets: usize },
    #[error("Kernel matrix is not positive definite")]
    IllConditioned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub mean: f64,
    pub std: f64,
}

impl Prediction {
    pub fn lower_confidence_bound(&self, kappa: f64) -> f64 {
        self.mean - kappa * self.std
    }
}

pub trait SurrogateModel: Send + Sync {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), SurrogateError>;
    fn predict(&self, features: &[f64]) -> Prediction;
}

pub fn build_model(kind: SurrogateKind, seed: u64) -> Box<dyn SurrogateModel> {
    match kind {
        SurrogateKind::Forest => Box::new(forest::RandomForest::new(seed)),
        SurrogateKind::GradientBoostedTrees => Box::new(boosted::GradientBoosting::new(seed)),
        SurrogateKind::GaussianProcess => Box::new(gaussian::GaussianProcess::default()),
    }
}

pub(crate) fn check_training_set(
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<(), SurrogateError> {
    if features.len() != targets.len() {
        return Err(SurrogateError::LengthMismatch {
            features: features.len(),
            targets: targets.len(),
        });
    }
    if targets.is_empty() {
        return Err(SurrogateError::EmptyTrainingSet);
    }
    Ok(())
}

pub(crate) fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_set() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64 / 7.0]).collect();
        let targets: Vec<f64> = features.iter().map(|x| (x[0] - 0.6).powi(2)).collect();
        (features, targets)
    }

    #[test]
    fn every_model_kind_ranks_the_valley_below_the_edge() {
        let (features, targets) = training_set();
        for kind in [
            SurrogateKind::Forest,
            SurrogateKind::GradientBoostedTrees,
            SurrogateKind::GaussianProcess,
        ] {
            let mut model = build_model(kind, 3);
            model.fit(&features, &targets).unwrap();
            let valley = model.predict(&[4.0 / 7.0]).mean;
            let edge = model.predict(&[0.0]).mean;
            assert!(valley < edge, "{} failed to rank the valley", kind.name());
        }
    }

    #[test]
    fn empty_and_mismatched_training_sets_are_rejected() {
        let mut model = build_model(SurrogateKind::Forest, 1);
        assert_eq!(model.fit(&[], &[]), Err(SurrogateError::EmptyTrainingSet));
        assert_eq!(
            model.fit(&[vec![0.0]], &[1.0, 2.0]),
            Err(SurrogateError::LengthMismatch {
                features: 1,
                targets: 2
            })
        );
    }

    #[test]
    fn lower_confidence_bound_subtracts_weighted_spread() {
        let prediction = Prediction {
            mean: 1.0,
            std: 0.5,
        };
        assert_eq!(prediction.lower_confidence_bound(2.0), 0.0);
    }
}
