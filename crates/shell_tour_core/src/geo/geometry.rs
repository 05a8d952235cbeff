use nalgebra::{Point3, Vector3};

pub type Point = Point3<f64>;

/// Length of the polyline through `points`.
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| nalgebra::distance(&w[0], &w[1]))
        .sum()
}

/// Unit direction from `from` to `to`, or `None` when both coincide.
pub fn direction(from: &Point, to: &Point) -> Option<Vector3<f64>> {
    let offset = to - from;
    let norm = offset.norm();
    if norm <= f64::EPSILON {
        None
    } else {
        Some(offset / norm)
    }
}

/// Angle between two non-zero vectors, clamped against rounding.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

/// Spherical interpolation between two directions; falls back to a
/// normalised lerp for (anti)parallel inputs.
pub fn slerp_direction(a: &Vector3<f64>, b: &Vector3<f64>, t: f64) -> Vector3<f64> {
    let angle = angle_between(a, b);
    let sin = angle.sin();
    if sin.abs() < 1e-9 {
        let mixed = a * (1.0 - t) + b * t;
        let norm = mixed.norm();
        return if norm <= f64::EPSILON { *a } else { mixed / norm };
    }
    let wa = ((1.0 - t) * angle).sin() / sin;
    let wb = (t * angle).sin() / sin;
    a * wa + b * wb
}
