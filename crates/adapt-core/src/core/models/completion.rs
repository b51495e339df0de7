use super::sample::ArtifactRef;
use super::structure::StructureGeometry;
use super::task::WorkKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-step convergence history reported by a simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvergenceTrace {
    /// Energy change of each electronic step, grouped by ionic step.
    pub electronic_de: Vec<Vec<f64>>,
    /// Energy change of the final ionic step.
    pub ionic_de: Option<f64>,
}

impl ConvergenceTrace {
    pub fn ionic_steps(&self) -> usize {
        self.electronic_de.len()
    }
}

/// Notification that one heavy unit of work finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub key: WorkKey,
    pub succeeded: bool,
    #[serde(default)]
    pub observables: BTreeMap<String, f64>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactRef>,
    #[serde(default)]
    pub trace: Option<ConvergenceTrace>,
    #[serde(default)]
    pub geometry: Option<StructureGeometry>,
}

impl Completion {
    pub fn success(key: WorkKey) -> Self {
        Self {
            key,
            succeeded: true,
            observables: BTreeMap::new(),
            artifacts: Vec::new(),
            trace: None,
            geometry: None,
        }
    }

    pub fn failure(key: WorkKey) -> Self {
        Self {
            succeeded: false,
            ..Self::success(key)
        }
    }

    pub fn with_observable(mut self, name: &str, value: f64) -> Self {
        self.observables.insert(name.to_string(), value);
        self
    }

    pub fn with_artifact(mut self, artifact: ArtifactRef) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_trace(mut self, trace: ConvergenceTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_geometry(mut self, geometry: StructureGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn primary_artifact(&self) -> ArtifactRef {
        self.artifacts.first().cloned().unwrap_or_default()
    }
}
