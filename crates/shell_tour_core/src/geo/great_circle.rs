use serde::{Deserialize, Serialize};

use crate::geometry::{Point, angle_between};

/// Travel estimate around a sphere centre: radial difference plus the arc
/// swept at the smaller of the two radii.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GreatCircleMetric {
    pub center: Point,
}

impl GreatCircleMetric {
    pub fn new(center: Point) -> Self {
        Self { center }
    }

    pub fn measure(&self, a: &Point, b: &Point) -> f64 {
        let va = a - self.center;
        let vb = b - self.center;
        let ra = va.norm();
        let rb = vb.norm();
        (ra - rb).abs() + angle_between(&va, &vb) * ra.min(rb)
    }
}
