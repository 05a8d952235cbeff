//! Enclosing shell used as a cheap transit layer and cost predictor.

use nalgebra::Vector3;
use serde_json::{Value, json};

use crate::{
    Configuration, Result, SpaceInformation,
    geometry::{Point, angle_between, direction, slerp_direction},
    great_circle::GreatCircleMetric,
    world::scene::Scene,
};

const DEFAULT_ARC_RESOLUTION: f64 = 0.1;
const SHELL_STATE_PUSH_STEPS: usize = 8;
const SHELL_STATE_PUSH_FACTOR: f64 = 0.05;

pub trait Shell: Send + Sync {
    /// A valid state whose end-effector sits on the shell facing `target`.
    fn state_on_shell(&self, si: &dyn SpaceInformation, target: &Point) -> Option<Configuration>;

    /// States along the shell from `from` to `to`, both included, with every
    /// consecutive motion checked. `None` when the arc is blocked.
    fn path_on_shell(
        &self,
        si: &dyn SpaceInformation,
        from: &Configuration,
        to: &Configuration,
    ) -> Option<Vec<Configuration>>;

    /// Estimated travel from an arbitrary state to `target`.
    fn predict_length_from_state(
        &self,
        si: &dyn SpaceInformation,
        state: &Configuration,
        target: &Point,
    ) -> f64;

    /// Estimated travel between two targets via the shell.
    fn predict_length_between(&self, a: &Point, b: &Point) -> f64;

    /// Point on the shell closest to `point`.
    fn project(&self, point: &Point) -> Point;

    fn parameters(&self) -> Value;
}

/// Builds the shell for a scene once per planning call.
pub trait ShellBuilder: Send + Sync {
    fn build(&self, scene: &Scene) -> Result<Box<dyn Shell>>;

    fn parameters(&self) -> Value;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SphereShell {
    center: Point,
    radius: f64,
    arc_resolution: f64,
}

impl SphereShell {
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            center,
            radius,
            arc_resolution: DEFAULT_ARC_RESOLUTION,
        }
    }

    pub fn with_arc_resolution(mut self, arc_resolution: f64) -> Self {
        self.arc_resolution = arc_resolution;
        self
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn outward(&self, point: &Point) -> Vector3<f64> {
        direction(&self.center, point).unwrap_or_else(Vector3::z)
    }

    /// Radial distance between `point` and the shell surface.
    fn depth(&self, point: &Point) -> f64 {
        (nalgebra::distance(&self.center, point) - self.radius).abs()
    }

    fn metric(&self) -> GreatCircleMetric {
        GreatCircleMetric::new(self.center)
    }
}

impl Shell for SphereShell {
    fn state_on_shell(&self, si: &dyn SpaceInformation, target: &Point) -> Option<Configuration> {
        let outward = self.outward(target);
        (0..SHELL_STATE_PUSH_STEPS).find_map(|step| {
            let radius = self.radius * (1.0 + SHELL_STATE_PUSH_FACTOR * step as f64);
            si.configuration_for_end_effector(&(self.center + outward * radius))
        })
    }

    fn path_on_shell(
        &self,
        si: &dyn SpaceInformation,
        from: &Configuration,
        to: &Configuration,
    ) -> Option<Vec<Configuration>> {
        let a = si.end_effector(from) - self.center;
        let b = si.end_effector(to) - self.center;
        let (ra, rb) = (a.norm(), b.norm());
        let arc = angle_between(&a, &b) * ra.max(rb);
        let steps = ((arc / self.arc_resolution).ceil() as usize).max(1);

        // Arc points without a valid configuration are skipped; the motion
        // checks below decide whether the gap they leave is passable.
        let (da, db) = (self.outward(&(self.center + a)), self.outward(&(self.center + b)));
        let mut states = Vec::with_capacity(steps + 1);
        states.push(from.clone());
        for step in 1..steps {
            let t = step as f64 / steps as f64;
            let point = self.center + slerp_direction(&da, &db, t) * (ra + (rb - ra) * t);
            if let Some(state) = si.configuration_for_end_effector(&point) {
                states.push(state);
            }
        }
        states.push(to.clone());

        if let Some(blocked) = states
            .windows(2)
            .position(|pair| !si.check_motion(&pair[0], &pair[1]))
        {
            log::trace!("shell.arc: blocked step={blocked} states={}", states.len());
            return None;
        }
        Some(states)
    }

    fn predict_length_from_state(
        &self,
        si: &dyn SpaceInformation,
        state: &Configuration,
        target: &Point,
    ) -> f64 {
        self.metric()
            .measure(&si.end_effector(state), &self.project(target))
            + self.depth(target)
    }

    fn predict_length_between(&self, a: &Point, b: &Point) -> f64 {
        self.metric().measure(&self.project(a), &self.project(b)) + self.depth(a) + self.depth(b)
    }

    fn project(&self, point: &Point) -> Point {
        self.center + self.outward(point) * self.radius
    }

    fn parameters(&self) -> Value {
        json!({
            "kind": "sphere",
            "center": [self.center.x, self.center.y, self.center.z],
            "radius": self.radius,
            "arc_resolution": self.arc_resolution,
        })
    }
}

/// Smallest sphere around the scene focus that encloses every obstacle and
/// target, grown by `padding`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnclosingSphereBuilder {
    pub padding: f64,
}

impl EnclosingSphereBuilder {
    pub fn new(padding: f64) -> Self {
        Self { padding }
    }
}

impl ShellBuilder for EnclosingSphereBuilder {
    fn build(&self, scene: &Scene) -> Result<Box<dyn Shell>> {
        let center = scene.focus();
        let obstacle_reach = scene
            .obstacles
            .iter()
            .map(|o| nalgebra::distance(&center, &o.center) + o.radius);
        let target_reach = scene
            .targets
            .iter()
            .map(|t| nalgebra::distance(&center, &t.position));
        let radius = obstacle_reach.chain(target_reach).fold(0.0, f64::max) + self.padding;
        log::debug!(
            "shell.build: scene={} center=({:.3},{:.3},{:.3}) radius={radius:.3}",
            scene.name,
            center.x,
            center.y,
            center.z
        );
        Ok(Box::new(SphereShell::new(center, radius)))
    }

    fn parameters(&self) -> Value {
        json!({ "kind": "enclosing_sphere", "padding": self.padding })
    }
}

#[cfg(test)]
mod tests {
    use std::{f64::consts::PI, sync::Arc};

    use super::{EnclosingSphereBuilder, Shell, ShellBuilder, SphereShell};
    use crate::{
        Configuration, SpaceInformation, Target,
        geometry::Point,
        world::{
            scene::{Bounds, Obstacle, Scene},
            sphere_world::SphereWorld,
        },
    };

    fn scene() -> Scene {
        Scene {
            name: "ball".to_string(),
            bounds: Bounds {
                min: Point::new(-10.0, -10.0, -10.0),
                max: Point::new(10.0, 10.0, 10.0),
            },
            obstacles: vec![Obstacle::new(Point::origin(), 1.0)],
            targets: vec![
                Target::new(0, Point::new(1.5, 0.0, 0.0)),
                Target::new(1, Point::new(-1.5, 0.0, 0.0)),
            ],
        }
    }

    #[test]
    fn enclosing_sphere_covers_scene_with_padding() {
        let shell = EnclosingSphereBuilder::new(0.5)
            .build(&scene())
            .expect("shell");
        let p = shell.project(&Point::new(0.0, 0.0, 0.2));
        assert!((nalgebra::distance(&p, &Point::origin()) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn state_on_shell_faces_target() {
        let world = SphereWorld::new(Arc::new(scene()), 0.05);
        let shell = SphereShell::new(Point::origin(), 2.0);
        let state = shell
            .state_on_shell(&world, &Point::new(1.5, 0.0, 0.0))
            .expect("shell state");
        assert_eq!(state, Configuration::new(vec![2.0, 0.0, 0.0]));
    }

    #[test]
    fn path_on_shell_keeps_endpoints_and_radius() {
        let world = SphereWorld::new(Arc::new(scene()), 0.05);
        let shell = SphereShell::new(Point::origin(), 2.0).with_arc_resolution(0.2);
        let from = Configuration::new(vec![2.0, 0.0, 0.0]);
        let to = Configuration::new(vec![0.0, 2.0, 0.0]);
        let path = shell.path_on_shell(&world, &from, &to).expect("free arc");
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert!(path.len() > 10);
        for state in &path {
            let r = nalgebra::distance(&world.end_effector(state), &Point::origin());
            assert!((r - 2.0).abs() < 1e-9);
        }
        for pair in path.windows(2) {
            assert!(world.check_motion(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn path_on_shell_through_an_obstacle_is_blocked() {
        let mut scene = scene();
        scene
            .obstacles
            .push(Obstacle::new(Point::new(2.0_f64.sqrt(), 2.0_f64.sqrt(), 0.0), 0.3));
        let world = SphereWorld::new(Arc::new(scene), 0.05);
        let shell = SphereShell::new(Point::origin(), 2.0).with_arc_resolution(0.2);
        let from = Configuration::new(vec![2.0, 0.0, 0.0]);
        let to = Configuration::new(vec![0.0, 2.0, 0.0]);
        assert!(shell.path_on_shell(&world, &from, &to).is_none());

        let around = Configuration::new(vec![0.0, -2.0, 0.0]);
        assert!(shell.path_on_shell(&world, &from, &around).is_some());
    }

    #[test]
    fn predictions_follow_the_shell() {
        let world = SphereWorld::new(Arc::new(scene()), 0.05);
        let shell = SphereShell::new(Point::origin(), 2.0);
        let a = Point::new(1.5, 0.0, 0.0);
        let b = Point::new(-1.5, 0.0, 0.0);
        let between = shell.predict_length_between(&a, &b);
        assert!((between - (2.0 * PI + 1.0)).abs() < 1e-9);
        assert!((between - shell.predict_length_between(&b, &a)).abs() < 1e-12);

        let on_shell = Configuration::new(vec![2.0, 0.0, 0.0]);
        let from_state = shell.predict_length_from_state(&world, &on_shell, &a);
        assert!((from_state - 0.5).abs() < 1e-9);
    }
}
