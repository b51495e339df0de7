use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// The final geometry of a campaign: substrate atoms followed by the probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureGeometry {
    pub positions: Vec<Point3<f64>>,
    pub probe_ids: Vec<usize>,
    pub normal: Vector3<f64>,
    /// Lattice repeat distance, used as the neighbor search cutoff.
    pub lattice_repeat: f64,
    #[serde(default)]
    pub cell_volume: Option<f64>,
}

impl StructureGeometry {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_probe(&self, index: usize) -> bool {
        self.probe_ids.contains(&index)
    }

    /// Indices of every position that is not part of the probe.
    pub fn substrate_indices(&self) -> Vec<usize> {
        (0..self.positions.len())
            .filter(|i| !self.is_probe(*i))
            .collect()
    }
}
