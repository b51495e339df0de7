use super::GeometryError;
use crate::core::utils::geometry::{point_plane_distance, triangle_height, unit_direction};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const SECOND_NEIGHBOR_RATIO: f64 = 1.2;
const THIRD_NEIGHBOR_RATIO: f64 = 1.4;
const ONTOP_ALIGNMENT: f64 = 0.95;
const RADIUS_PADDING: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteType {
    Ontop,
    Bridge,
    Hollow,
    Other,
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteType::Ontop => "ontop",
            SiteType::Bridge => "bridge",
            SiteType::Hollow => "hollow",
            SiteType::Other => "other",
        };
        f.write_str(s)
    }
}

/// A probe position's non-probe neighbor and their separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub probe: usize,
    pub neighbor: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportPoint {
    pub index: usize,
    pub position: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDistances {
    /// Probe distance to each of the three nearest neighbors, ascending.
    pub to_neighbors: [f64; 3],
    /// Height of the probe over its support, when the site type defines one.
    pub to_surface: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteClassification {
    pub probe: usize,
    pub site_type: SiteType,
    pub support: Vec<SupportPoint>,
    pub distances: SiteDistances,
}

fn check_index(positions: &[Point3<f64>], index: usize) -> Result<(), GeometryError> {
    if index >= positions.len() {
        return Err(GeometryError::IndexOutOfRange {
            index,
            len: positions.len(),
        });
    }
    Ok(())
}

/// Neighbors of `probe` within `cutoff`, excluding `excluded`, ordered by
/// distance and then index.
fn neighbors_within(
    positions: &[Point3<f64>],
    probe: usize,
    excluded: &HashSet<usize>,
    cutoff: f64,
) -> Vec<NeighborRecord> {
    let points: Vec<[f64; 3]> = positions.iter().map(|p| [p.x, p.y, p.z]).collect();
    let kdtree: KdTree<f64, 3> = (&points).into();
    let origin = positions[probe];
    // Padded so points sitting exactly on the cutoff survive the radius query.
    let radius_sq = cutoff * cutoff * (1.0 + RADIUS_PADDING) + RADIUS_PADDING;

    let mut found: Vec<NeighborRecord> = kdtree
        .within_unsorted::<SquaredEuclidean>(&points[probe], radius_sq)
        .into_iter()
        .map(|hit| hit.item as usize)
        .filter(|idx| *idx != probe && !excluded.contains(idx))
        .map(|idx| NeighborRecord {
            probe,
            neighbor: idx,
            distance: (positions[idx] - origin).norm(),
        })
        .filter(|record| record.distance <= cutoff)
        .collect();
    found.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.neighbor.cmp(&b.neighbor))
    });
    found
}

/// Classifies the site occupied by `probe` from its three nearest neighbors.
///
/// Positions listed in `candidate_ids` (the probe molecule itself) never count
/// as neighbors. With neighbor distances `d1 <= d2 <= d3`:
///
/// - `d2 < 1.2 d1` and `d3 > 1.4 d1` is a bridge over `{n1, n2}`, with the
///   probe height measured to the `n1`-`n2` line.
/// - `d2 < 1.2 d1` and `d3 <= 1.4 d1` is a hollow over `{n1, n2, n3}`, with
///   the height measured to their plane.
/// - otherwise, a probe whose direction from `n1` aligns with `normal`
///   (cosine above 0.95) sits ontop of `n1`.
/// - anything else is reported as other, with distances only.
///
/// # Errors
///
/// Returns [`GeometryError::InsufficientNeighbors`] when fewer than three
/// neighbors lie within `cutoff`, and [`GeometryError::DegenerateSupport`]
/// when the support points of a bridge or hollow site coincide or are colinear.
pub fn classify_adsorption_site(
    positions: &[Point3<f64>],
    probe: usize,
    candidate_ids: &[usize],
    normal: &Vector3<f64>,
    cutoff: f64,
) -> Result<SiteClassification, GeometryError> {
    check_index(positions, probe)?;
    let axis = unit_direction(normal).ok_or(GeometryError::DegenerateNormal)?;

    let excluded: HashSet<usize> = candidate_ids.iter().copied().collect();
    let neighbors = neighbors_within(positions, probe, &excluded, cutoff);
    if neighbors.len() < 3 {
        return Err(GeometryError::InsufficientNeighbors {
            probe,
            found: neighbors.len(),
            cutoff,
        });
    }

    let [n1, n2, n3] = [neighbors[0], neighbors[1], neighbors[2]];
    let (d1, d2, d3) = (n1.distance, n2.distance, n3.distance);
    let probe_position = positions[probe];
    let support_of = |records: &[NeighborRecord]| -> Vec<SupportPoint> {
        records
            .iter()
            .map(|r| SupportPoint {
                index: r.neighbor,
                position: positions[r.neighbor],
            })
            .collect()
    };

    let (site_type, support, to_surface) = if d2 < SECOND_NEIGHBOR_RATIO * d1 {
        if d3 > THIRD_NEIGHBOR_RATIO * d1 {
            let base = (positions[n1.neighbor] - positions[n2.neighbor]).norm();
            let height =
                triangle_height(d1, d2, base).ok_or(GeometryError::DegenerateSupport {
                    site: SiteType::Bridge,
                })?;
            (SiteType::Bridge, support_of(&[n1, n2]), Some(height))
        } else {
            let height = point_plane_distance(
                &probe_position,
                &positions[n1.neighbor],
                &positions[n2.neighbor],
                &positions[n3.neighbor],
            )
            .ok_or(GeometryError::DegenerateSupport {
                site: SiteType::Hollow,
            })?;
            (SiteType::Hollow, support_of(&[n1, n2, n3]), Some(height))
        }
    } else {
        let alignment = unit_direction(&(probe_position - positions[n1.neighbor]))
            .map(|direction| axis.dot(&direction.into_inner()))
            .unwrap_or(0.0);
        if alignment > ONTOP_ALIGNMENT {
            (SiteType::Ontop, support_of(&[n1]), Some(d1))
        } else {
            (SiteType::Other, support_of(&[n1, n2, n3]), None)
        }
    };

    Ok(SiteClassification {
        probe,
        site_type,
        support,
        distances: SiteDistances {
            to_neighbors: [d1, d2, d3],
            to_surface,
        },
    })
}

/// The closest non-probe neighbor within `cutoff` of every probe position.
pub fn nearest_surface_neighbors(
    positions: &[Point3<f64>],
    probe_ids: &[usize],
    cutoff: f64,
) -> Result<Vec<NeighborRecord>, GeometryError> {
    if probe_ids.is_empty() {
        return Err(GeometryError::NoProbes);
    }
    let excluded: HashSet<usize> = probe_ids.iter().copied().collect();
    probe_ids
        .iter()
        .map(|&probe| {
            check_index(positions, probe)?;
            neighbors_within(positions, probe, &excluded, cutoff)
                .first()
                .copied()
                .ok_or(GeometryError::InsufficientNeighbors {
                    probe,
                    found: 0,
                    cutoff,
                })
        })
        .collect()
}

/// The probe position bound most tightly to the substrate.
pub fn adsorption_anchor(records: &[NeighborRecord]) -> Option<NeighborRecord> {
    records
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance).then(a.probe.cmp(&b.probe)))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::rotation_to_align;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // Probe at the origin; axis-aligned neighbors keep the distances exact.
    fn probe_with_neighbors_at(distances: [f64; 3]) -> Vec<Point3<f64>> {
        vec![
            Point3::origin(),
            Point3::new(0.0, 0.0, -distances[0]),
            Point3::new(distances[1], 0.0, 0.0),
            Point3::new(0.0, distances[2], 0.0),
        ]
    }

    #[test]
    fn close_pair_with_distant_third_neighbor_is_bridge() {
        let positions = probe_with_neighbors_at([1.0, 1.1, 1.6]);
        let site = classify_adsorption_site(&positions, 0, &[], &Vector3::z(), 3.0).unwrap();

        assert_eq!(site.site_type, SiteType::Bridge);
        let support: Vec<usize> = site.support.iter().map(|s| s.index).collect();
        assert_eq!(support, vec![1, 2]);
        assert!(site.distances.to_surface.unwrap() > 0.0);
    }

    #[test]
    fn three_close_neighbors_form_hollow() {
        let positions = probe_with_neighbors_at([1.0, 1.1, 1.3]);
        let site = classify_adsorption_site(&positions, 0, &[], &Vector3::z(), 3.0).unwrap();

        assert_eq!(site.site_type, SiteType::Hollow);
        assert_eq!(site.support.len(), 3);
    }

    #[test]
    fn third_neighbor_exactly_at_ratio_is_hollow() {
        let positions = probe_with_neighbors_at([1.0, 1.1, 1.4]);
        let site = classify_adsorption_site(&positions, 0, &[], &Vector3::z(), 3.0).unwrap();
        assert_eq!(site.site_type, SiteType::Hollow);
    }

    #[test]
    fn second_neighbor_exactly_at_ratio_falls_through_to_ontop_check() {
        let positions = probe_with_neighbors_at([1.0, 1.2, 1.6]);
        let site = classify_adsorption_site(&positions, 0, &[], &Vector3::z(), 3.0).unwrap();
        assert_eq!(site.site_type, SiteType::Ontop);

        let tilted = classify_adsorption_site(&positions, 0, &[], &Vector3::x(), 3.0).unwrap();
        assert_eq!(tilted.site_type, SiteType::Other);
        assert_eq!(tilted.distances.to_surface, None);
    }

    #[test]
    fn neighbor_directly_below_along_normal_is_ontop() {
        let positions = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.6, 0.0, 0.0),
            Point3::new(0.0, 1.7, 0.0),
        ];
        let site = classify_adsorption_site(&positions, 0, &[], &Vector3::z(), 3.0).unwrap();

        assert_eq!(site.site_type, SiteType::Ontop);
        assert_eq!(site.support.len(), 1);
        assert_eq!(site.support[0].index, 1);
        assert!(f64_approx_equal(site.distances.to_surface.unwrap(), 1.0));
    }

    #[test]
    fn probe_molecule_atoms_are_not_neighbors() {
        let mut positions = probe_with_neighbors_at([1.0, 1.1, 1.3]);
        positions.push(Point3::new(0.0, 0.0, 0.5));
        let site = classify_adsorption_site(&positions, 0, &[0, 4], &Vector3::z(), 3.0).unwrap();
        assert!(site.support.iter().all(|s| s.index != 4));
    }

    #[test]
    fn fewer_than_three_neighbors_in_cutoff_is_an_error() {
        let positions = probe_with_neighbors_at([1.0, 1.1, 5.0]);
        let err = classify_adsorption_site(&positions, 0, &[], &Vector3::z(), 3.0).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::InsufficientNeighbors { found: 2, .. }
        ));
    }

    #[test]
    fn classification_is_invariant_under_common_rotation() {
        let positions = probe_with_neighbors_at([1.0, 1.1, 1.6]);
        let normal = Vector3::z();
        let before = classify_adsorption_site(&positions, 0, &[], &normal, 3.0).unwrap();

        let rotation =
            rotation_to_align(&normal, &Vector3::new(0.3, -0.9, 0.2).normalize()).unwrap();
        let rotated: Vec<Point3<f64>> = positions
            .iter()
            .map(|p| rotation.transform_point(p))
            .collect();
        let after =
            classify_adsorption_site(&rotated, 0, &[], &(rotation * normal), 3.0).unwrap();

        assert_eq!(before.site_type, after.site_type);
        let before_support: Vec<usize> = before.support.iter().map(|s| s.index).collect();
        let after_support: Vec<usize> = after.support.iter().map(|s| s.index).collect();
        assert_eq!(before_support, after_support);
        assert!(f64_approx_equal(
            before.distances.to_surface.unwrap(),
            after.distances.to_surface.unwrap()
        ));
    }

    #[test]
    fn nearest_surface_neighbors_skip_other_probe_positions() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.9),
            Point3::new(0.0, 0.0, 3.0),
        ];
        let records = nearest_surface_neighbors(&positions, &[2, 3], 4.0).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].neighbor, 0);
        assert!(f64_approx_equal(records[0].distance, 1.9));
        assert_eq!(records[1].neighbor, 0);

        let anchor = adsorption_anchor(&records).unwrap();
        assert_eq!(anchor.probe, 2);
    }

    #[test]
    fn neighbor_search_keeps_points_on_the_cutoff_and_breaks_ties_by_index() {
        let positions = vec![
            Point3::origin(),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 2.5),
            Point3::new(0.0, 0.0, -1.0),
        ];
        let excluded: HashSet<usize> = [4].into_iter().collect();

        let found = neighbors_within(&positions, 0, &excluded, 2.5);

        let order: Vec<usize> = found.iter().map(|r| r.neighbor).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(f64_approx_equal(found[2].distance, 2.5));
        assert!(neighbors_within(&positions, 0, &excluded, 1.9).is_empty());
    }

    #[test]
    fn nearest_surface_neighbors_require_probes() {
        let positions = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(
            nearest_surface_neighbors(&positions, &[], 2.0),
            Err(GeometryError::NoProbes)
        );
    }
}
