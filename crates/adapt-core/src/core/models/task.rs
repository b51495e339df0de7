use super::grid::{GridPoint, ParameterSetting};
use super::sample::ArtifactRef;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a unit of work does once the executor schedules it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskKind {
    /// Single-point evaluation with the probe held at `distance` from the site.
    DistanceProbe {
        index: usize,
        distance: f64,
        probe_position: Option<Point3<f64>>,
    },
    /// Re-enters the controller once the probes of a round have settled.
    DistanceAnalysis { round: usize },
    /// Full relaxation started from the estimated optimum distance.
    OptimumRelaxation {
        distance: f64,
        probe_position: Option<Point3<f64>>,
    },
    GridEvaluation {
        point: GridPoint,
        settings: Vec<ParameterSetting>,
    },
    /// Re-enters the surrogate search once its evaluation has settled.
    SurrogateContinuation { remaining_budget: usize },
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::DistanceProbe { .. } => "distance-probe",
            TaskKind::DistanceAnalysis { .. } => "distance-analysis",
            TaskKind::OptimumRelaxation { .. } => "optimum-relaxation",
            TaskKind::GridEvaluation { .. } => "grid-evaluation",
            TaskKind::SurrogateContinuation { .. } => "surrogate-continuation",
        }
    }
}

/// Identifies the outcome of one heavy evaluation so a completion can be
/// matched back to the work that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkKey {
    Distance { distance: f64 },
    Grid { point: GridPoint },
    Relaxation { distance: f64 },
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkKey::Distance { distance } => write!(f, "distance probe at {:.3}", distance),
            WorkKey::Grid { point } => write!(f, "grid point {}", point),
            WorkKey::Relaxation { distance } => write!(f, "relaxation from {:.3}", distance),
        }
    }
}

/// A unit of work to be attached to the running task graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub kind: TaskKind,
    pub parent_artifacts: Vec<ArtifactRef>,
    pub expected_outputs: Vec<String>,
    /// Positions of earlier specs in the same batch that must finish first.
    pub depends_on: Vec<usize>,
    /// The unit may start even when some of its dependencies failed.
    pub allow_failed_parents: bool,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent_artifacts: Vec::new(),
            expected_outputs: Vec::new(),
            depends_on: Vec::new(),
            allow_failed_parents: false,
        }
    }

    pub fn with_dependencies(mut self, depends_on: Vec<usize>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_parent_artifacts(mut self, artifacts: Vec<ArtifactRef>) -> Self {
        self.parent_artifacts = artifacts;
        self
    }

    pub fn expecting(mut self, outputs: &[&str]) -> Self {
        self.expected_outputs = outputs.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn allowing_failed_parents(mut self) -> Self {
        self.allow_failed_parents = true;
        self
    }

    /// Heavy units run an external simulation and report back a completion.
    pub fn is_heavy(&self) -> bool {
        self.work_key().is_some()
    }

    pub fn work_key(&self) -> Option<WorkKey> {
        match &self.kind {
            TaskKind::DistanceProbe { distance, .. } => Some(WorkKey::Distance {
                distance: *distance,
            }),
            TaskKind::OptimumRelaxation { distance, .. } => Some(WorkKey::Relaxation {
                distance: *distance,
            }),
            TaskKind::GridEvaluation { point, .. } => Some(WorkKey::Grid {
                point: point.clone(),
            }),
            TaskKind::DistanceAnalysis { .. } | TaskKind::SurrogateContinuation { .. } => None,
        }
    }

    pub fn grid_point(&self) -> Option<&GridPoint> {
        match &self.kind {
            TaskKind::GridEvaluation { point, .. } => Some(point),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_simulation_units_carry_work_keys() {
        let probe = TaskSpec::new(
            "probe",
            TaskKind::DistanceProbe {
                index: 0,
                distance: 1.5,
                probe_position: None,
            },
        );
        let analysis = TaskSpec::new("analysis", TaskKind::DistanceAnalysis { round: 0 });
        let grid = TaskSpec::new(
            "eval",
            TaskKind::GridEvaluation {
                point: GridPoint::new(vec![1, 0]),
                settings: vec![],
            },
        );

        assert_eq!(
            probe.work_key(),
            Some(WorkKey::Distance { distance: 1.5 })
        );
        assert!(!analysis.is_heavy());
        assert_eq!(grid.grid_point(), Some(&GridPoint::new(vec![1, 0])));
    }

    #[test]
    fn builder_methods_fill_optional_fields() {
        let spec = TaskSpec::new("cont", TaskKind::SurrogateContinuation { remaining_budget: 3 })
            .with_dependencies(vec![0])
            .expecting(&["loss"])
            .allowing_failed_parents();

        assert_eq!(spec.depends_on, vec![0]);
        assert_eq!(spec.expected_outputs, vec!["loss".to_string()]);
        assert!(spec.allow_failed_parents);
    }
}
