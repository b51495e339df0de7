use super::{Prediction, SurrogateError, SurrogateModel, check_training_set, mean_and_std};
use nalgebra::{DMatrix, DVector};

/// Gaussian-process regression with a squared-exponential kernel.
///
/// Targets are standardized before fitting; predictions are mapped back.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    length_scale: f64,
    noise: f64,
    fitted: Option<FittedProcess>,
}

#[derive(Debug, Clone)]
struct FittedProcess {
    training: Vec<Vec<f64>>,
    alpha: DVector<f64>,
    lower: DMatrix<f64>,
    target_mean: f64,
    target_scale: f64,
}

impl Default for GaussianProcess {
    fn default() -> Self {
        Self::new(0.3, 1e-6)
    }
}

impl GaussianProcess {
    pub fn new(length_scale: f64, noise: f64) -> Self {
        Self {
            length_scale,
            noise,
            fitted: None,
        }
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
        (-sq / (2.0 * self.length_scale * self.length_scale)).exp()
    }
}

impl SurrogateModel for GaussianProcess {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), SurrogateError> {
        check_training_set(features, targets)?;
        let (target_mean, spread) = mean_and_std(targets);
        let target_scale = if spread > 1e-12 { spread } else { 1.0 };

        let n = features.len();
        let gram = DMatrix::from_fn(n, n, |i, j| {
            let k = self.kernel(&features[i], &features[j]);
            if i == j { k + self.noise } else { k }
        });
        let cholesky = gram.cholesky().ok_or(SurrogateError::IllConditioned)?;
        let standardized =
            DVector::from_iterator(n, targets.iter().map(|y| (y - target_mean) / target_scale));
        let alpha = cholesky.solve(&standardized);

        self.fitted = Some(FittedProcess {
            training: features.to_vec(),
            alpha,
            lower: cholesky.l(),
            target_mean,
            target_scale,
        });
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Prediction {
        let Some(fit) = &self.fitted else {
            return Prediction {
                mean: 0.0,
                std: 1.0,
            };
        };
        let cross = DVector::from_iterator(
            fit.training.len(),
            fit.training.iter().map(|x| self.kernel(x, features)),
        );
        let mean = cross.dot(&fit.alpha) * fit.target_scale + fit.target_mean;
        let variance = fit
            .lower
            .solve_lower_triangular(&cross)
            .map(|v| 1.0 - v.dot(&v))
            .unwrap_or(1.0)
            .max(0.0);
        Prediction {
            mean,
            std: variance.sqrt() * fit.target_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn process_interpolates_training_points() {
        let features = vec![vec![0.0], vec![0.5], vec![1.0]];
        let targets = [1.0, -2.0, 3.0];
        let mut gp = GaussianProcess::default();
        gp.fit(&features, &targets).unwrap();

        let at_middle = gp.predict(&[0.5]);
        assert!(f64_approx_equal(at_middle.mean, -2.0));
        assert!(at_middle.std < 1e-2);
    }

    #[test]
    fn uncertainty_grows_away_from_data() {
        let features = vec![vec![0.0], vec![0.1]];
        let targets = [1.0, 2.0];
        let mut gp = GaussianProcess::default();
        gp.fit(&features, &targets).unwrap();

        assert!(gp.predict(&[1.0]).std > gp.predict(&[0.05]).std);
    }

    #[test]
    fn duplicate_rows_without_noise_are_ill_conditioned() {
        let features = vec![vec![0.2], vec![0.2]];
        let mut gp = GaussianProcess::new(0.3, 0.0);
        assert_eq!(
            gp.fit(&features, &[1.0, 1.0]),
            Err(SurrogateError::IllConditioned)
        );
    }
}
