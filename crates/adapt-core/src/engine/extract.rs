use super::config::LossMetric;
use super::error::EngineError;
use super::tasks::loss;
use crate::core::models::completion::Completion;

/// Turns a successful completion into the scalar a strategy consumes.
pub trait SampleExtractor: Send + Sync {
    fn extract(&self, completion: &Completion) -> Result<f64, EngineError>;
}

/// Reads one named observable, such as the final energy.
#[derive(Debug, Clone)]
pub struct ObservableExtractor {
    name: String,
}

impl ObservableExtractor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SampleExtractor for ObservableExtractor {
    fn extract(&self, completion: &Completion) -> Result<f64, EngineError> {
        match completion.observables.get(&self.name) {
            Some(value) if value.is_finite() => Ok(*value),
            Some(value) => Err(EngineError::UpstreamArtifactUnavailable {
                work: completion.key.to_string(),
                reason: format!("observable '{}' is not finite ({})", self.name, value),
            }),
            None => Err(EngineError::UpstreamArtifactUnavailable {
                work: completion.key.to_string(),
                reason: format!("observable '{}' was not reported", self.name),
            }),
        }
    }
}

/// Computes a loss metric from the convergence trace of a completion.
#[derive(Debug, Clone)]
pub struct LossExtractor {
    metric: LossMetric,
}

impl LossExtractor {
    pub fn new(metric: LossMetric) -> Self {
        Self { metric }
    }
}

impl SampleExtractor for LossExtractor {
    fn extract(&self, completion: &Completion) -> Result<f64, EngineError> {
        let unavailable = |reason: &str| EngineError::UpstreamArtifactUnavailable {
            work: completion.key.to_string(),
            reason: reason.to_string(),
        };
        let trace = completion
            .trace
            .as_ref()
            .ok_or_else(|| unavailable("no convergence trace was reported"))?;
        loss::evaluate(self.metric, trace)
            .filter(|v| v.is_finite())
            .ok_or_else(|| unavailable("convergence trace lacks the data for the loss metric"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::completion::ConvergenceTrace;
    use crate::core::models::grid::GridPoint;
    use crate::core::models::task::WorkKey;

    #[test]
    fn observable_extractor_reads_named_value() {
        let completion =
            Completion::success(WorkKey::Distance { distance: 1.0 }).with_observable("energy", -3.2);
        let value = ObservableExtractor::new("energy").extract(&completion).unwrap();
        assert_eq!(value, -3.2);
    }

    #[test]
    fn missing_observable_is_an_unavailable_artifact() {
        let completion = Completion::success(WorkKey::Distance { distance: 1.0 });
        let err = ObservableExtractor::new("energy")
            .extract(&completion)
            .unwrap_err();
        assert!(matches!(err, EngineError::UpstreamArtifactUnavailable { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn loss_extractor_requires_a_trace() {
        let key = WorkKey::Grid {
            point: GridPoint::new(vec![0]),
        };
        let extractor = LossExtractor::new(LossMetric::IonicSteps);
        assert!(extractor.extract(&Completion::success(key.clone())).is_err());

        let with_trace = Completion::success(key).with_trace(ConvergenceTrace {
            electronic_de: vec![vec![0.1], vec![0.01]],
            ionic_de: None,
        });
        assert_eq!(extractor.extract(&with_trace).unwrap(), -2.0);
    }
}
