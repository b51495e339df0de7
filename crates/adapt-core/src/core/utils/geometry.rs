use nalgebra::{Point3, Rotation3, Unit, Vector3};

const DEGENERACY_EPSILON: f64 = 1e-10;

pub fn unit_direction(vector: &Vector3<f64>) -> Option<Unit<Vector3<f64>>> {
    Unit::try_new(*vector, DEGENERACY_EPSILON)
}

pub fn rotation_to_align(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Rotation3<f64>> {
    Rotation3::rotation_between(from, to)
}

pub fn displace_along(
    origin: &Point3<f64>,
    direction: &Unit<Vector3<f64>>,
    distance: f64,
) -> Point3<f64> {
    origin + direction.into_inner() * distance
}

/// Signed height of every position along `axis`.
pub fn project_onto(positions: &[Point3<f64>], axis: &Unit<Vector3<f64>>) -> Vec<f64> {
    positions.iter().map(|p| axis.dot(&p.coords)).collect()
}

/// Height of the apex over the base of a triangle given its three side
/// lengths, via Heron's formula. `None` for a vanishing base.
pub fn triangle_height(side_a: f64, side_b: f64, base: f64) -> Option<f64> {
    if base < DEGENERACY_EPSILON {
        return None;
    }
    let s = (side_a + side_b + base) / 2.0;
    let area_sq = s * (s - side_a) * (s - side_b) * (s - base);
    let area = area_sq.max(0.0).sqrt();
    Some(2.0 * area / base)
}

/// Distance from `point` to the plane through `a`, `b` and `c`.
/// `None` when the three points are colinear.
pub fn point_plane_distance(
    point: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<f64> {
    let normal = (b - a).cross(&(c - a));
    let norm = normal.norm();
    if norm < DEGENERACY_EPSILON {
        return None;
    }
    Some((normal.dot(&(point - a)) / norm).abs())
}
