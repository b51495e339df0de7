use crate::core::models::sample::SampleSeries;
use crate::engine::config::{DistanceSearchConfig, NoCrossingPolicy, OptimumMethod};
use crate::engine::decision::{Decision, DecisionResult, TerminationReason};
use crate::engine::error::EngineError;
use crate::engine::utils::fitting::{distinct_abscissae, fit_quadratic, linspace};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Distance reported when the scan sees no samples at all.
pub const SENTINEL_DISTANCE: f64 = 3.0;
/// Energy reported alongside [`SENTINEL_DISTANCE`].
pub const SENTINEL_ENERGY: f64 = 10000.0;

const POLYNOMIAL_GRID_POINTS: usize = 100;
const POLYNOMIAL_MIN_SAMPLES: usize = 3;

/// Outcome of a standard sign-change scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossingScan {
    pub parameter: f64,
    pub value: f64,
    pub first_crossing: Option<f64>,
    pub second_crossing: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimumEstimate {
    /// The method that actually produced the estimate.
    pub method: OptimumMethod,
    pub parameter: f64,
    pub value: f64,
    /// Whether any sample reached negative (binding) energy.
    pub favorable: bool,
    pub derived_score: Option<f64>,
    pub should_terminate: bool,
}

/// Scans `(parameter, energy)` points in ascending parameter order.
///
/// Until an energy goes negative the lowest sample is the optimum. The first
/// negative energy is the first crossing and becomes the optimum. While
/// negative, each lower energy moves the optimum to the midpoint between the
/// first crossing and the new sample. Once the energy turns non-negative
/// again the value is frozen, and every later non-negative sample moves the
/// optimum to the midpoint of the first crossing and that sample. Without any
/// sample the sentinel pair is returned.
pub fn scan_crossings(points: &[(f64, f64)]) -> CrossingScan {
    let mut best = SENTINEL_ENERGY;
    let mut optimum = SENTINEL_DISTANCE;
    let mut first: Option<f64> = None;
    let mut second: Option<f64> = None;

    for &(parameter, energy) in points {
        match (first, second) {
            (None, _) if best >= 0.0 && energy < 0.0 => {
                first = Some(parameter);
                optimum = parameter;
                best = energy;
            }
            (None, _) if energy < best => {
                optimum = parameter;
                best = energy;
            }
            (Some(crossing), _) if best < 0.0 && energy >= 0.0 => {
                second = second.or(Some(parameter));
                optimum = (crossing + parameter) / 2.0;
            }
            (Some(crossing), None) if energy < best => {
                best = energy;
                optimum = (crossing + parameter) / 2.0;
            }
            _ => {}
        }
    }

    CrossingScan {
        parameter: optimum,
        value: best,
        first_crossing: first,
        second_crossing: second,
    }
}

/// Minimum of a least-squares parabola over the sampled parameter range.
pub fn polynomial_minimum(points: &[(f64, f64)]) -> Result<(f64, f64), EngineError> {
    let insufficient = || EngineError::InsufficientSamples {
        method: OptimumMethod::Polynomial.name(),
        found: distinct_abscissae(points),
        required: POLYNOMIAL_MIN_SAMPLES,
    };
    if points.len() < POLYNOMIAL_MIN_SAMPLES {
        return Err(insufficient());
    }
    let fit = fit_quadratic(points).ok_or_else(insufficient)?;
    let (low, high) = parameter_bounds(points).ok_or_else(insufficient)?;

    linspace(low, high, POLYNOMIAL_GRID_POINTS)
        .into_iter()
        .map(|x| (x, fit.evaluate(x)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(insufficient)
}

/// The literal lowest sample; the first one wins ties.
pub fn direct_minimum(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    points.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1))
}

fn parameter_bounds(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let low = points.iter().map(|p| p.0).min_by(f64::total_cmp)?;
    let high = points.iter().map(|p| p.0).max_by(f64::total_cmp)?;
    Some((low, high))
}

/// Locates the optimum distance of `series` and scores it.
///
/// `cell_volume` is the volume of the output cell that accompanies the
/// optimum; without it the derived score is the missing-geometry sentinel.
pub fn find_optimum(
    series: &SampleSeries,
    config: &DistanceSearchConfig,
    cell_volume: Option<f64>,
) -> Result<OptimumEstimate, EngineError> {
    let points = series.points();
    if points.is_empty() {
        return Err(EngineError::InsufficientSamples {
            method: config.method.name(),
            found: 0,
            required: 1,
        });
    }
    let minimum = || {
        direct_minimum(&points).ok_or_else(|| {
            EngineError::Internal("direct minimum of a non-empty series".to_string())
        })
    };

    let (method, parameter, value, favorable) = match config.method {
        OptimumMethod::Standard => {
            let scan = scan_crossings(&points);
            (
                OptimumMethod::Standard,
                scan.parameter,
                scan.value,
                scan.first_crossing.is_some(),
            )
        }
        OptimumMethod::Polynomial => match polynomial_minimum(&points) {
            Ok((x, y)) => (OptimumMethod::Polynomial, x, y, y < 0.0),
            Err(e) => {
                warn!(error = %e, "Polynomial fit unavailable; using the direct minimum.");
                let (x, y) = minimum()?;
                (OptimumMethod::DirectMinimum, x, y, y < 0.0)
            }
        },
        OptimumMethod::DirectMinimum => {
            let (x, y) = minimum()?;
            (OptimumMethod::DirectMinimum, x, y, y < 0.0)
        }
    };

    let derived_score = config
        .references
        .as_ref()
        .map(|refs| refs.derived_score(value, cell_volume));
    let should_terminate = derived_score.is_some_and(|s| s > config.termination_threshold);

    Ok(OptimumEstimate {
        method,
        parameter,
        value,
        favorable,
        derived_score,
        should_terminate,
    })
}

/// Decides the next step of a distance campaign from its sample series.
#[instrument(skip_all, name = "distance_search_task", fields(samples = series.len()))]
pub fn decide(
    series: &SampleSeries,
    config: &DistanceSearchConfig,
    cell_volume: Option<f64>,
) -> Result<Decision, EngineError> {
    if series.is_empty() {
        warn!("No samples available for the distance decision.");
        return Ok(Decision::terminate(TerminationReason::NoUsableSamples));
    }

    let estimate = find_optimum(series, config, cell_volume)?;
    info!(
        method = estimate.method.name(),
        parameter = estimate.parameter,
        value = estimate.value,
        score = ?estimate.derived_score,
        "Located optimum distance."
    );

    // Only the sign-change scan can miss a crossing; fitted minima go on to
    // the derived-score gate.
    if estimate.method == OptimumMethod::Standard
        && !estimate.favorable
        && config.no_crossing == NoCrossingPolicy::Terminate
    {
        return Ok(Decision::Terminate {
            result: Some(DecisionResult::Distance(estimate)),
            reason: TerminationReason::NoFavorableDistance,
        });
    }
    if estimate.should_terminate {
        return Ok(Decision::Terminate {
            result: Some(DecisionResult::Distance(estimate)),
            reason: TerminationReason::UnfavorableEnergetics,
        });
    }
    Ok(Decision::Continue {
        next_parameter: estimate.parameter,
        basis: Some(DecisionResult::Distance(estimate)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::CampaignId;
    use crate::core::models::sample::{ArtifactRef, Sample};
    use crate::engine::config::EnergyReferences;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn series(points: &[(f64, f64)]) -> SampleSeries {
        SampleSeries::from_samples(
            CampaignId::new("test"),
            points
                .iter()
                .map(|&(p, e)| Sample::new(p, e, ArtifactRef::new(format!("static-{p}")))),
        )
    }

    fn config(method: OptimumMethod) -> DistanceSearchConfig {
        DistanceSearchConfig {
            method,
            ..DistanceSearchConfig::default()
        }
    }

    #[test]
    fn scan_finds_both_crossings_and_takes_midpoint() {
        let scan = scan_crossings(&[(1.0, 2.0), (2.0, -1.0), (3.0, 1.0)]);
        assert_eq!(scan.first_crossing, Some(2.0));
        assert_eq!(scan.second_crossing, Some(3.0));
        assert!(f64_approx_equal(scan.parameter, 2.5));
        assert_eq!(scan.value, -1.0);
    }

    #[test]
    fn scan_moves_optimum_with_deepening_well() {
        let scan = scan_crossings(&[(0.5, 1.0), (1.0, -0.2), (1.5, -0.6), (2.0, -0.4)]);
        assert_eq!(scan.first_crossing, Some(1.0));
        assert_eq!(scan.second_crossing, None);
        assert!(f64_approx_equal(scan.parameter, 1.25));
        assert_eq!(scan.value, -0.6);
    }

    #[test]
    fn scan_freezes_value_after_second_crossing() {
        let scan = scan_crossings(&[(1.0, -1.0), (2.0, 0.5), (3.0, -5.0), (4.0, 2.0)]);
        assert_eq!(scan.second_crossing, Some(2.0));
        assert!(f64_approx_equal(scan.parameter, 2.5));
        assert_eq!(scan.value, -1.0);
    }

    #[test]
    fn later_positive_samples_keep_moving_optimum_past_second_crossing() {
        let scan = scan_crossings(&[(1.0, 2.0), (2.0, -1.0), (3.0, 1.0), (4.0, 2.0)]);
        assert_eq!(scan.first_crossing, Some(2.0));
        assert_eq!(scan.second_crossing, Some(3.0));
        assert!(f64_approx_equal(scan.parameter, 3.0));
        assert_eq!(scan.value, -1.0);
    }

    #[test]
    fn scan_without_negative_sample_tracks_lowest_sample() {
        let scan = scan_crossings(&[(0.5, 3.0), (1.0, 0.1), (1.5, 0.4)]);
        assert_eq!(scan.parameter, 1.0);
        assert_eq!(scan.value, 0.1);
        assert_eq!(scan.first_crossing, None);
    }

    #[test]
    fn scan_of_no_samples_returns_sentinel() {
        let scan = scan_crossings(&[]);
        assert_eq!(scan.parameter, SENTINEL_DISTANCE);
        assert_eq!(scan.value, SENTINEL_ENERGY);
        assert_eq!(scan.first_crossing, None);
    }

    #[test]
    fn scan_optimum_stays_inside_sampled_range() {
        let cases: [&[(f64, f64)]; 3] = [
            &[(0.5, 0.3), (1.0, -0.1), (1.5, -0.3), (2.0, 0.2)],
            &[(0.5, -0.3), (1.0, -0.5), (1.5, -0.2)],
            &[(0.5, 0.1), (1.0, -0.4)],
        ];
        for points in cases {
            let scan = scan_crossings(points);
            assert!(scan.parameter >= points[0].0);
            assert!(scan.parameter <= points[points.len() - 1].0);
        }
    }

    #[test]
    fn polynomial_locates_vertex_of_parabola() {
        let points: Vec<(f64, f64)> = [0.5, 1.0, 1.5, 2.0]
            .iter()
            .map(|&x| (x, (x - 1.3) * (x - 1.3) - 0.5))
            .collect();
        let (x, y) = polynomial_minimum(&points).unwrap();
        assert!((x - 1.3).abs() < 0.02);
        assert!((y + 0.5).abs() < 1e-3);
    }

    #[test]
    fn polynomial_with_two_samples_is_insufficient() {
        let err = polynomial_minimum(&[(1.0, 0.0), (2.0, -1.0)]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientSamples {
                found: 2,
                required: 3,
                ..
            }
        ));
    }

    #[test]
    fn polynomial_degrades_to_direct_minimum() {
        let estimate = find_optimum(
            &series(&[(1.0, -0.3), (2.0, -0.7)]),
            &config(OptimumMethod::Polynomial),
            None,
        )
        .unwrap();
        assert_eq!(estimate.method, OptimumMethod::DirectMinimum);
        assert_eq!(estimate.parameter, 2.0);
        assert_eq!(estimate.value, -0.7);
    }

    #[test]
    fn direct_minimum_prefers_first_of_equal_samples() {
        assert_eq!(
            direct_minimum(&[(1.0, -1.0), (2.0, -1.0), (3.0, 0.0)]),
            Some((1.0, -1.0))
        );
    }

    #[test]
    fn empty_series_terminates_without_usable_samples() {
        let decision = decide(&series(&[]), &config(OptimumMethod::Standard), None).unwrap();
        assert_eq!(
            decision,
            Decision::terminate(TerminationReason::NoUsableSamples)
        );
    }

    #[test]
    fn no_crossing_terminates_under_default_policy() {
        let decision = decide(
            &series(&[(0.5, 1.0), (1.0, 0.4)]),
            &config(OptimumMethod::Standard),
            None,
        )
        .unwrap();
        match decision {
            Decision::Terminate { reason, result } => {
                assert_eq!(reason, TerminationReason::NoFavorableDistance);
                assert!(result.is_some());
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn no_crossing_continues_at_lowest_sample_under_sentinel_policy() {
        let cfg = DistanceSearchConfig {
            no_crossing: NoCrossingPolicy::Sentinel,
            ..DistanceSearchConfig::default()
        };
        let points = [(0.5, 1.0), (1.0, 0.4)];
        let decision = decide(&series(&points), &cfg, None).unwrap();
        match decision {
            Decision::Continue {
                next_parameter,
                basis: Some(DecisionResult::Distance(estimate)),
            } => {
                assert_eq!(next_parameter, 1.0);
                assert_eq!(estimate.value, 0.4);
                assert!(!estimate.favorable);
                assert!(next_parameter >= points[0].0 && next_parameter <= points[1].0);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn fitted_methods_ignore_the_no_crossing_policy() {
        let points = [(0.5, 1.0), (1.0, 0.4), (1.5, 0.6)];
        for method in [OptimumMethod::DirectMinimum, OptimumMethod::Polynomial] {
            let decision = decide(&series(&points), &config(method), None).unwrap();
            match decision {
                Decision::Continue { next_parameter, .. } => {
                    assert!(next_parameter >= 0.5 && next_parameter <= 1.5);
                    if method == OptimumMethod::DirectMinimum {
                        assert_eq!(next_parameter, 1.0);
                    }
                }
                other => panic!("unexpected decision for {method:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn high_derived_score_terminates_as_unfavorable() {
        let cfg = DistanceSearchConfig {
            references: Some(EnergyReferences::new(-100.0, Some(10.0), -14.8)),
            ..DistanceSearchConfig::default()
        };
        let points = [(1.0, 0.5), (1.5, -110.0), (2.0, 0.3)];

        let decision = decide(&series(&points), &cfg, Some(10.0)).unwrap();
        match decision {
            Decision::Terminate {
                reason,
                result: Some(DecisionResult::Distance(estimate)),
            } => {
                assert_eq!(reason, TerminationReason::UnfavorableEnergetics);
                assert!(f64_approx_equal(estimate.derived_score.unwrap(), 4.8));
                assert!(estimate.should_terminate);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn missing_output_cell_scores_as_unfavorable() {
        let cfg = DistanceSearchConfig {
            references: Some(EnergyReferences::new(-100.0, None, -14.8)),
            ..DistanceSearchConfig::default()
        };
        let estimate = find_optimum(&series(&[(1.0, -120.0)]), &cfg, None).unwrap();
        assert_eq!(estimate.derived_score, Some(1000.0));
        assert!(estimate.should_terminate);
    }

    #[test]
    fn favorable_optimum_continues_at_its_distance() {
        let decision = decide(
            &series(&[(1.0, 2.0), (2.0, -1.0), (3.0, 1.0)]),
            &config(OptimumMethod::Standard),
            None,
        )
        .unwrap();
        match decision {
            Decision::Continue { next_parameter, .. } => {
                assert!(f64_approx_equal(next_parameter, 2.5))
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn identical_input_gives_bit_identical_decision() {
        let points = [(0.5, 0.9), (1.0, -0.2), (1.5, -0.35), (2.0, 0.1)];
        for method in [
            OptimumMethod::Standard,
            OptimumMethod::Polynomial,
            OptimumMethod::DirectMinimum,
        ] {
            let first = decide(&series(&points), &config(method), Some(12.0)).unwrap();
            let second = decide(&series(&points), &config(method), Some(12.0)).unwrap();
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }
}
