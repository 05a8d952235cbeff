use std::{
    f64::consts::TAU,
    fmt::{Display, Formatter},
    fs::File,
    io::BufReader,
    path::Path,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Target, geometry::Point};

const PROCEDURAL_TRUNK_HEIGHT: f64 = 1.5;
const PROCEDURAL_TRUNK_RADIUS: f64 = 0.15;
const PROCEDURAL_CANOPY_CENTER_Z: f64 = 2.2;
const PROCEDURAL_CANOPY_RADIUS: f64 = 0.9;
const PROCEDURAL_LEAF_CLUMPS: usize = 14;
const PROCEDURAL_TARGET_CLEARANCE: f64 = 0.12;
const START_SAMPLE_ATTEMPTS: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Point,
    pub radius: f64,
}

impl Obstacle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: &Point, margin: f64) -> bool {
        nalgebra::distance(&self.center, point) < self.radius + margin
    }

    /// Whether the segment `a..b` passes within `margin` of the sphere.
    pub fn blocks_segment(&self, a: &Point, b: &Point, margin: f64) -> bool {
        let ab = b - a;
        let len_sq = ab.norm_squared();
        let t = if len_sq <= f64::EPSILON {
            0.0
        } else {
            ((self.center - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
        };
        let closest = a + ab * t;
        nalgebra::distance(&closest, &self.center) < self.radius + margin
    }
}

/// Axis-aligned workspace box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn contains(&self, point: &Point) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    pub fn sample(&self, rng: &mut StdRng) -> Point {
        Point::new(
            rng.random_range(self.min.x..=self.max.x),
            rng.random_range(self.min.y..=self.max.y),
            rng.random_range(self.min.z..=self.max.z),
        )
    }
}

/// Static planning scene: workspace bounds, spherical obstacles and targets.
///
/// Loaded once and shared read-only between workers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    pub targets: Vec<Target>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::invalid_input(format!("failed to open scene {}: {e}", path.display()))
        })?;
        let scene: Self = serde_json::from_reader(BufReader::new(file))?;
        scene.validate()?;
        log::debug!("scene.load: {scene} path={}", path.display());
        Ok(scene)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_data("scene name must not be empty"));
        }
        if !(0..3).all(|axis| self.bounds.min[axis] < self.bounds.max[axis]) {
            return Err(Error::invalid_data(format!(
                "scene {} has empty bounds",
                self.name
            )));
        }
        if let Some(bad) = self.obstacles.iter().position(|o| !(o.radius > 0.0)) {
            return Err(Error::invalid_data(format!(
                "scene {} obstacle {bad} has non-positive radius",
                self.name
            )));
        }
        if self.targets.is_empty() {
            return Err(Error::invalid_data(format!(
                "scene {} has no targets",
                self.name
            )));
        }
        Ok(())
    }

    /// Seeded tree-like scene: a trunk of stacked spheres, leaf clumps
    /// around the canopy centre and targets scattered on the canopy rim.
    pub fn procedural(name: &str, seed: u64, target_count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let canopy_center = Point::new(0.0, 0.0, PROCEDURAL_CANOPY_CENTER_Z);

        let mut obstacles = Vec::new();
        let trunk_steps = (PROCEDURAL_TRUNK_HEIGHT / PROCEDURAL_TRUNK_RADIUS).ceil() as usize;
        for step in 0..=trunk_steps {
            let z = PROCEDURAL_TRUNK_HEIGHT * step as f64 / trunk_steps as f64;
            obstacles.push(Obstacle::new(
                Point::new(0.0, 0.0, z),
                PROCEDURAL_TRUNK_RADIUS,
            ));
        }
        for _ in 0..PROCEDURAL_LEAF_CLUMPS {
            let offset = random_unit(&mut rng) * rng.random_range(0.0..0.55);
            obstacles.push(Obstacle::new(
                canopy_center + offset,
                rng.random_range(0.18..0.32),
            ));
        }

        let mut targets = Vec::with_capacity(target_count);
        let mut attempts = 0usize;
        while targets.len() < target_count && attempts < target_count * 64 + 64 {
            attempts += 1;
            let distance = rng.random_range(0.8..1.05) * PROCEDURAL_CANOPY_RADIUS;
            let position = canopy_center + random_unit(&mut rng) * distance;
            if obstacles
                .iter()
                .any(|o| o.contains(&position, PROCEDURAL_TARGET_CLEARANCE))
            {
                continue;
            }
            targets.push(Target::new(targets.len(), position));
        }

        Self {
            name: name.to_string(),
            bounds: Bounds {
                min: Point::new(-3.0, -3.0, 0.0),
                max: Point::new(3.0, 3.0, 5.0),
            },
            obstacles,
            targets,
        }
    }

    pub fn is_free(&self, point: &Point, margin: f64) -> bool {
        self.bounds.contains(point) && !self.obstacles.iter().any(|o| o.contains(point, margin))
    }

    /// Straight end-effector motion check; the bounds are convex so the
    /// endpoints decide containment.
    pub fn segment_is_free(&self, a: &Point, b: &Point, margin: f64) -> bool {
        self.bounds.contains(a)
            && self.bounds.contains(b)
            && !self.obstacles.iter().any(|o| o.blocks_segment(a, b, margin))
    }

    /// Centre of the obstacles and targets, used to anchor shells and metrics.
    pub fn focus(&self) -> Point {
        let points: Vec<Point> = self
            .obstacles
            .iter()
            .map(|o| o.center)
            .chain(self.targets.iter().map(|t| t.position))
            .collect();
        if points.is_empty() {
            return nalgebra::center(&self.bounds.min, &self.bounds.max);
        }
        let sum = points
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Point::from(sum / points.len() as f64)
    }

    /// Seeded free start position on a ring around the scene focus.
    pub fn start_position(&self, rng: &mut StdRng, margin: f64) -> Result<Point> {
        let focus = self.focus();
        let half_extent = (self.bounds.max - self.bounds.min).xy().amin() / 2.0;
        for _ in 0..START_SAMPLE_ATTEMPTS {
            let angle = rng.random_range(0.0..TAU);
            let ring = rng.random_range(0.7..0.9) * half_extent;
            let point = Point::new(
                focus.x + ring * angle.cos(),
                focus.y + ring * angle.sin(),
                rng.random_range(self.bounds.min.z..=self.bounds.max.z),
            );
            if self.is_free(&point, margin) {
                return Ok(point);
            }
        }
        Err(Error::invalid_data(format!(
            "scene {}: no free start position after {START_SAMPLE_ATTEMPTS} attempts",
            self.name
        )))
    }
}

impl Display for Scene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "name={} obstacles={} targets={}",
            self.name,
            self.obstacles.len(),
            self.targets.len()
        )
    }
}

pub(crate) fn random_unit(rng: &mut StdRng) -> nalgebra::Vector3<f64> {
    loop {
        let v = nalgebra::Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let norm = v.norm();
        if norm > 1e-6 && norm <= 1.0 {
            return v / norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rand::{SeedableRng, rngs::StdRng};

    use super::{Bounds, Obstacle, Scene};
    use crate::{Target, geometry::Point};

    fn open_box() -> Scene {
        Scene {
            name: "box".to_string(),
            bounds: Bounds {
                min: Point::new(-5.0, -5.0, -5.0),
                max: Point::new(5.0, 5.0, 5.0),
            },
            obstacles: vec![Obstacle::new(Point::origin(), 1.0)],
            targets: vec![Target::new(0, Point::new(2.0, 0.0, 0.0))],
        }
    }

    #[test]
    fn segment_through_obstacle_is_blocked() {
        let scene = open_box();
        let a = Point::new(-3.0, 0.0, 0.0);
        let b = Point::new(3.0, 0.0, 0.0);
        assert!(!scene.segment_is_free(&a, &b, 0.0));
        assert!(scene.segment_is_free(&a, &Point::new(-3.0, 3.0, 0.0), 0.0));
        assert!(!scene.segment_is_free(&a, &Point::new(6.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn procedural_scene_is_deterministic_and_targets_are_free() {
        let a = Scene::procedural("tree", 11, 12);
        let b = Scene::procedural("tree", 11, 12);
        assert_eq!(a, b);
        assert_eq!(a.targets.len(), 12);
        assert!(a.validate().is_ok());
        for target in &a.targets {
            assert!(a.is_free(&target.position, 0.1), "{target}");
        }
        assert_ne!(a, Scene::procedural("tree", 12, 12));
    }

    #[test]
    fn start_position_is_free() {
        let scene = Scene::procedural("tree", 3, 4);
        let mut rng = StdRng::seed_from_u64(9);
        let start = scene.start_position(&mut rng, 0.05).expect("start");
        assert!(scene.is_free(&start, 0.05));
    }

    #[test]
    fn load_reads_json_scene() {
        let scene = open_box();
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(serde_json::to_string(&scene).expect("json").as_bytes())
            .expect("write");

        let loaded = Scene::load(file.path()).expect("load");
        assert_eq!(loaded, scene);
    }

    #[test]
    fn validate_rejects_scene_without_targets() {
        let scene = Scene {
            targets: Vec::new(),
            ..open_box()
        };
        let err = scene.validate().expect_err("no targets");
        assert!(err.to_string().contains("has no targets"));
    }
}
