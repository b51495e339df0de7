use nalgebra::{DMatrix, DVector};

/// `c0 + c1 x + c2 x^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub coefficients: [f64; 3],
}

impl Quadratic {
    pub fn evaluate(&self, x: f64) -> f64 {
        let [c0, c1, c2] = self.coefficients;
        c0 + x * (c1 + x * c2)
    }
}

/// Least-squares quadratic through `points`.
///
/// Returns `None` when fewer than three distinct abscissae are present or the
/// system cannot be solved.
pub fn fit_quadratic(points: &[(f64, f64)]) -> Option<Quadratic> {
    if distinct_abscissae(points) < 3 {
        return None;
    }
    let design = DMatrix::from_fn(points.len(), 3, |row, col| points[row].0.powi(col as i32));
    let targets = DVector::from_iterator(points.len(), points.iter().map(|p| p.1));
    let solution = design.svd(true, true).solve(&targets, 1e-12).ok()?;
    Some(Quadratic {
        coefficients: [solution[0], solution[1], solution[2]],
    })
}

pub fn distinct_abscissae(points: &[(f64, f64)]) -> usize {
    let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    xs.len()
}

pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn fit_recovers_exact_parabola() {
        let points: Vec<(f64, f64)> = [0.0, 0.5, 1.0, 1.5, 2.0]
            .iter()
            .map(|&x| (x, 2.0 - 3.0 * x + 1.5 * x * x))
            .collect();
        let fit = fit_quadratic(&points).unwrap();

        assert!(f64_approx_equal(fit.coefficients[0], 2.0));
        assert!(f64_approx_equal(fit.coefficients[1], -3.0));
        assert!(f64_approx_equal(fit.coefficients[2], 1.5));
        assert!(f64_approx_equal(fit.evaluate(1.0), 0.5));
    }

    #[test]
    fn fit_requires_three_distinct_abscissae() {
        let points = [(1.0, 0.0), (1.0, 1.0), (2.0, 3.0)];
        assert!(fit_quadratic(&points).is_none());
        assert_eq!(distinct_abscissae(&points), 2);
    }

    #[test]
    fn linspace_hits_both_ends() {
        let xs = linspace(1.0, 2.0, 5);
        assert_eq!(xs.len(), 5);
        assert_eq!(xs[0], 1.0);
        assert!(f64_approx_equal(xs[4], 2.0));
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
    }
}
