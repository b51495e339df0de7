use crate::core::models::completion::ConvergenceTrace;
use crate::engine::config::LossMetric;

const LAST_STEPS_WINDOW: usize = 5;

/// Reduces a convergence trace to the scalar the surrogate search minimizes.
///
/// Step counts are negated. `None` when the trace lacks the data the metric
/// needs.
pub fn evaluate(metric: LossMetric, trace: &ConvergenceTrace) -> Option<f64> {
    match metric {
        LossMetric::TotalElectronicSteps => {
            let first = trace.electronic_de.first()?;
            let last = trace.electronic_de.last()?;
            let total = last.len() + (trace.ionic_steps() - 1) * first.len();
            Some(-(total as f64))
        }
        LossMetric::LastFiveDe => {
            let last = trace.electronic_de.last()?;
            if last.is_empty() {
                return None;
            }
            let window = &last[last.len().saturating_sub(LAST_STEPS_WINDOW)..];
            Some(window.iter().sum::<f64>() / window.len() as f64)
        }
        LossMetric::IonicSteps => match trace.ionic_steps() {
            0 => None,
            n => Some(-(n as f64)),
        },
        LossMetric::IonicDe => trace.ionic_de,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace() -> ConvergenceTrace {
        ConvergenceTrace {
            electronic_de: vec![
                vec![1.0, 0.5, 0.1, 0.05],
                vec![0.2, 0.1, 0.05],
                vec![0.3, 0.2, 0.1, 0.05, 0.01, 0.001],
            ],
            ionic_de: Some(-0.002),
        }
    }

    #[test]
    fn total_electronic_steps_extrapolates_from_first_ionic_step() {
        assert_eq!(evaluate(LossMetric::TotalElectronicSteps, &trace()), Some(-14.0));
    }

    #[test]
    fn last_five_de_averages_tail_of_final_ionic_step() {
        let value = evaluate(LossMetric::LastFiveDe, &trace()).unwrap();
        assert!((value - 0.0722).abs() < 1e-12);
    }

    #[test]
    fn ionic_metrics_read_step_count_and_final_change() {
        assert_eq!(evaluate(LossMetric::IonicSteps, &trace()), Some(-3.0));
        assert_eq!(evaluate(LossMetric::IonicDe, &trace()), Some(-0.002));
    }

    #[test]
    fn empty_trace_has_no_loss() {
        let empty = ConvergenceTrace::default();
        for metric in [
            LossMetric::TotalElectronicSteps,
            LossMetric::LastFiveDe,
            LossMetric::IonicSteps,
            LossMetric::IonicDe,
        ] {
            assert_eq!(evaluate(metric, &empty), None);
        }
    }
}
