use std::sync::Arc;

use rand::{Rng, rngs::StdRng};

use crate::{
    Configuration, SpaceInformation,
    geometry::Point,
    world::scene::{Scene, random_unit},
};

const NEAR_TARGET_ATTEMPTS: usize = 32;

/// Free-flying end-effector: the configuration is its xyz position.
///
/// Validity is clearance from the scene's spherical obstacles inside its
/// bounds. The scene is shared read-only; every task builds its own world.
#[derive(Clone, Debug)]
pub struct SphereWorld {
    scene: Arc<Scene>,
    clearance: f64,
}

impl SphereWorld {
    pub fn new(scene: Arc<Scene>, clearance: f64) -> Self {
        Self { scene, clearance }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    fn point(state: &Configuration) -> Point {
        let v = state.values();
        Point::new(v[0], v[1], v[2])
    }
}

impl SpaceInformation for SphereWorld {
    fn dimension(&self) -> usize {
        3
    }

    fn end_effector(&self, state: &Configuration) -> Point {
        Self::point(state)
    }

    fn is_valid(&self, state: &Configuration) -> bool {
        state.dimension() == 3 && self.scene.is_free(&Self::point(state), self.clearance)
    }

    fn check_motion(&self, from: &Configuration, to: &Configuration) -> bool {
        from.dimension() == 3
            && to.dimension() == 3
            && self
                .scene
                .segment_is_free(&Self::point(from), &Self::point(to), self.clearance)
    }

    fn sample_uniform(&self, rng: &mut StdRng) -> Configuration {
        Configuration::from_point(&self.scene.bounds.sample(rng))
    }

    fn sample_near_target(
        &self,
        target: &Point,
        radius: f64,
        rng: &mut StdRng,
    ) -> Option<Configuration> {
        (0..NEAR_TARGET_ATTEMPTS).find_map(|_| {
            let distance = radius * rng.random::<f64>().cbrt() * 0.999;
            let point = target + random_unit(rng) * distance;
            let state = Configuration::from_point(&point);
            self.is_valid(&state).then_some(state)
        })
    }

    fn configuration_for_end_effector(&self, point: &Point) -> Option<Configuration> {
        let state = Configuration::from_point(point);
        self.is_valid(&state).then_some(state)
    }
}
