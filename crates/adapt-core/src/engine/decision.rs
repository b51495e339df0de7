use super::cache::CacheEntry;
use super::tasks::distance_search::OptimumEstimate;
use crate::core::models::grid::{GridPoint, ParameterSetting};
use crate::core::models::sample::Sample;
use crate::core::models::task::TaskSpec;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    NoUsableSamples,
    UnfavorableEnergetics,
    NoFavorableDistance,
    BudgetExhausted,
    GridExhausted,
    SearchStalled,
    DuplicateWork,
    Aborted,
    Completed,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::NoUsableSamples => "no usable samples",
            TerminationReason::UnfavorableEnergetics => "unfavorable energetics",
            TerminationReason::NoFavorableDistance => "no favorable distance found",
            TerminationReason::BudgetExhausted => "search budget exhausted",
            TerminationReason::GridExhausted => "parameter grid exhausted",
            TerminationReason::SearchStalled => "no new parameters to evaluate",
            TerminationReason::DuplicateWork => "duplicate work requested",
            TerminationReason::Aborted => "aborted",
            TerminationReason::Completed => "campaign complete",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TerminationReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Lowest loss found so far by the surrogate search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestEvaluation {
    pub point: GridPoint,
    pub settings: Vec<ParameterSetting>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DecisionResult {
    Distance(OptimumEstimate),
    Surrogate(BestEvaluation),
}

/// The outcome of one strategy invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum Decision {
    Terminate {
        result: Option<DecisionResult>,
        reason: TerminationReason,
    },
    Continue {
        next_parameter: f64,
        basis: Option<DecisionResult>,
    },
    Expand {
        subtasks: Vec<TaskSpec>,
    },
}

impl Decision {
    pub fn terminate(reason: TerminationReason) -> Self {
        Decision::Terminate {
            result: None,
            reason,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Decision::Terminate { .. } => "terminate",
            Decision::Continue { .. } => "continue",
            Decision::Expand { .. } => "expand",
        }
    }

    pub fn result(&self) -> Option<&DecisionResult> {
        match self {
            Decision::Terminate { result, .. } => result.as_ref(),
            Decision::Continue { basis, .. } => basis.as_ref(),
            Decision::Expand { .. } => None,
        }
    }
}

/// A decision together with the evidence it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionReport {
    pub decision: Decision,
    pub samples: Vec<Sample>,
    pub evaluations: Vec<CacheEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_reason_serializes_as_human_readable_text() {
        let decision = Decision::terminate(TerminationReason::NoUsableSamples);
        let json = serde_json::to_value(&decision).unwrap();

        assert_eq!(json["decision"], "terminate");
        assert_eq!(json["reason"], "no usable samples");
        assert!(json["result"].is_null());
    }

    #[test]
    fn expand_carries_no_result() {
        let decision = Decision::Expand { subtasks: vec![] };
        assert_eq!(decision.kind(), "expand");
        assert!(decision.result().is_none());
    }
}
