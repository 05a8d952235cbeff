use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{Error, Result, geometry::Point, great_circle::GreatCircleMetric};

/// Cheap travel estimate between goal points, used for ordering only.
pub trait DistanceHeuristic: Send + Sync {
    fn first_distance(&self, from: &Point, target: &Point) -> f64;

    /// Symmetric in its arguments.
    fn between_distance(&self, a: &Point, b: &Point) -> f64;

    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EuclideanHeuristic;

impl DistanceHeuristic for EuclideanHeuristic {
    fn first_distance(&self, from: &Point, target: &Point) -> f64 {
        nalgebra::distance(from, target)
    }

    fn between_distance(&self, a: &Point, b: &Point) -> f64 {
        nalgebra::distance(a, b)
    }

    fn name(&self) -> &'static str {
        "Euclidean"
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GreatCircleHeuristic {
    pub metric: GreatCircleMetric,
}

impl GreatCircleHeuristic {
    pub fn new(center: Point) -> Self {
        Self {
            metric: GreatCircleMetric::new(center),
        }
    }
}

impl DistanceHeuristic for GreatCircleHeuristic {
    fn first_distance(&self, from: &Point, target: &Point) -> f64 {
        self.metric.measure(from, target)
    }

    fn between_distance(&self, a: &Point, b: &Point) -> f64 {
        self.metric.measure(a, b)
    }

    fn name(&self) -> &'static str {
        "GreatCircle"
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HeuristicKind {
    #[default]
    Euclidean,
    GreatCircle,
}

impl HeuristicKind {
    /// `center` anchors the great-circle metric; unused for Euclidean.
    pub fn build(self, center: Point) -> Box<dyn DistanceHeuristic> {
        match self {
            Self::Euclidean => Box::new(EuclideanHeuristic),
            Self::GreatCircle => Box::new(GreatCircleHeuristic::new(center)),
        }
    }
}

impl FromStr for HeuristicKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "greatcircle" | "great-circle" | "great_circle" => Ok(Self::GreatCircle),
            other => Err(Error::invalid_input(format!(
                "unknown heuristic: {other} (expected euclidean|greatcircle)"
            ))),
        }
    }
}

impl Display for HeuristicKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Euclidean => write!(f, "euclidean"),
            Self::GreatCircle => write!(f, "greatcircle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{DistanceHeuristic, EuclideanHeuristic, GreatCircleHeuristic, HeuristicKind};
    use crate::geometry::Point;

    fn point(v: [f64; 3]) -> Point {
        Point::new(v[0], v[1], v[2])
    }

    #[test]
    fn heuristic_kind_parses_aliases() {
        assert_eq!("Euclidean".parse::<HeuristicKind>().ok(), Some(HeuristicKind::Euclidean));
        assert_eq!(
            "great-circle".parse::<HeuristicKind>().ok(),
            Some(HeuristicKind::GreatCircle)
        );
        let err = "manhattan".parse::<HeuristicKind>().expect_err("unknown");
        assert!(err.to_string().contains("unknown heuristic: manhattan"));
    }

    #[test]
    fn built_heuristics_report_their_names() {
        assert_eq!(HeuristicKind::Euclidean.build(Point::origin()).name(), "Euclidean");
        assert_eq!(
            HeuristicKind::GreatCircle.build(Point::origin()).name(),
            "GreatCircle"
        );
    }

    proptest! {
        #[test]
        fn between_distance_is_symmetric(
            a in proptest::array::uniform3(-20.0f64..20.0),
            b in proptest::array::uniform3(-20.0f64..20.0),
        ) {
            let heuristics: [Box<dyn DistanceHeuristic>; 2] = [
                Box::new(EuclideanHeuristic),
                Box::new(GreatCircleHeuristic::new(Point::new(1.0, 2.0, 3.0))),
            ];
            for heuristic in &heuristics {
                let ab = heuristic.between_distance(&point(a), &point(b));
                let ba = heuristic.between_distance(&point(b), &point(a));
                prop_assert!(ab >= 0.0);
                prop_assert!((ab - ba).abs() < 1e-9);
            }
        }

        #[test]
        fn euclidean_satisfies_triangle_inequality(
            a in proptest::array::uniform3(-20.0f64..20.0),
            b in proptest::array::uniform3(-20.0f64..20.0),
            c in proptest::array::uniform3(-20.0f64..20.0),
        ) {
            let h = EuclideanHeuristic;
            let (a, b, c) = (point(a), point(b), point(c));
            prop_assert!(
                h.between_distance(&a, &c)
                    <= h.between_distance(&a, &b) + h.between_distance(&b, &c) + 1e-9
            );
        }
    }
}
