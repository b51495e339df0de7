use super::GeometryError;
use crate::core::models::structure::StructureGeometry;
use crate::core::utils::geometry::{project_onto, unit_direction};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceLabel {
    Surface,
    Subsurface,
    ReferenceBoundary,
    Probe,
}

impl fmt::Display for SurfaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SurfaceLabel::Surface => "surface",
            SurfaceLabel::Subsurface => "subsurface",
            SurfaceLabel::ReferenceBoundary => "reference-boundary",
            SurfaceLabel::Probe => "probe",
        };
        f.write_str(s)
    }
}

/// Per-position labels of a whole structure, probes included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnnotation {
    pub labels: Vec<SurfaceLabel>,
}

impl StructureAnnotation {
    pub fn count(&self, label: SurfaceLabel) -> usize {
        self.labels.iter().filter(|l| **l == label).count()
    }
}

/// Labels each position by its projection onto `normal`.
///
/// Positions within `height_threshold` of the highest projection are
/// [`SurfaceLabel::Surface`]; remaining positions within `height_threshold`
/// of the lowest projection are [`SurfaceLabel::ReferenceBoundary`]; the rest
/// are [`SurfaceLabel::Subsurface`]. A position that satisfies both bounds is
/// labelled surface.
pub fn classify_boundary(
    positions: &[Point3<f64>],
    normal: &Vector3<f64>,
    height_threshold: f64,
) -> Result<Vec<SurfaceLabel>, GeometryError> {
    if positions.len() < 2 {
        return Err(GeometryError::InsufficientGeometry(positions.len()));
    }
    let axis = unit_direction(normal).ok_or(GeometryError::DegenerateNormal)?;
    let heights = project_onto(positions, &axis);

    let top = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bottom = heights.iter().copied().fold(f64::INFINITY, f64::min);

    Ok(heights
        .into_iter()
        .map(|h| {
            if h - top >= -height_threshold {
                SurfaceLabel::Surface
            } else if h - bottom <= height_threshold {
                SurfaceLabel::ReferenceBoundary
            } else {
                SurfaceLabel::Subsurface
            }
        })
        .collect())
}

/// Labels the substrate with [`classify_boundary`] and marks probe positions.
pub fn annotate_structure(
    geometry: &StructureGeometry,
    height_threshold: f64,
) -> Result<StructureAnnotation, GeometryError> {
    let substrate = geometry.substrate_indices();
    let substrate_positions: Vec<Point3<f64>> =
        substrate.iter().map(|&i| geometry.positions[i]).collect();
    let substrate_labels =
        classify_boundary(&substrate_positions, &geometry.normal, height_threshold)?;

    let mut labels = vec![SurfaceLabel::Probe; geometry.positions.len()];
    for (index, label) in substrate.into_iter().zip(substrate_labels) {
        labels[index] = label;
    }
    Ok(StructureAnnotation { labels })
}
