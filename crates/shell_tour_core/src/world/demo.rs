use std::{sync::Arc, time::Duration};

use crate::{
    PointToPointPlanner, Result,
    ordering::tsp::CheapestArcRouting,
    planners::{ContextFactory, PlanningContext},
    world::{scene::Scene, sphere_world::SphereWorld, straight_line::StraightLineOracle},
};

/// Wires the demo world: sphere-obstacle validity, straight-line oracle and
/// in-process routing, all fresh per task.
#[derive(Clone, Debug)]
pub struct DemoContextFactory {
    pub clearance: f64,
    pub goal_radius: f64,
    pub ptp_budget: Duration,
}

impl DemoContextFactory {
    pub fn new(clearance: f64, goal_radius: f64, ptp_budget: Duration) -> Self {
        Self {
            clearance,
            goal_radius,
            ptp_budget,
        }
    }
}

impl ContextFactory for DemoContextFactory {
    fn context(&self, scene: &Arc<Scene>, seed: u64) -> Result<PlanningContext> {
        Ok(PlanningContext {
            si: Box::new(SphereWorld::new(Arc::clone(scene), self.clearance)),
            ptp: PointToPointPlanner::new(
                Box::new(StraightLineOracle::new(seed)),
                self.goal_radius,
                self.ptp_budget,
            ),
            routing: Box::new(CheapestArcRouting::default()),
        })
    }
}
