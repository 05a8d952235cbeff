use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// A full state of the robot in its configuration space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: Vec<f64>,
}

impl Configuration {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn from_point(point: &Point) -> Self {
        Self::new(vec![point.x, point.y, point.z])
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance over all coordinates.
    pub fn distance(&self, other: &Self) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        Self::new(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a + (b - a) * t)
                .collect(),
        )
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.dimension() == other.dimension() && self.distance(other) <= tolerance
    }
}
