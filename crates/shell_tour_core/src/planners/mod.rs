//! Multi-goal planning strategies behind one interface.

pub mod config;
pub mod knn;
pub mod ordered;
pub mod prm;
pub mod random_order;
pub mod shell_path;

mod chain;

use std::sync::Arc;

use serde_json::Value;

use crate::{
    Configuration, PlanResult, PointToPointPlanner, Result, SpaceInformation, Target,
    Termination, ordering::tsp::RoutingSolver, world::scene::Scene,
};

/// Mutable planning state owned by exactly one task.
pub struct PlanningContext {
    pub si: Box<dyn SpaceInformation>,
    pub ptp: PointToPointPlanner,
    pub routing: Box<dyn RoutingSolver>,
}

/// Builds a fresh [`PlanningContext`] for every task.
pub trait ContextFactory: Send + Sync {
    fn context(&self, scene: &Arc<Scene>, seed: u64) -> Result<PlanningContext>;
}

pub trait MultiGoalPlanner: Send {
    /// Plans one tour from `start` over `targets`. Segment tags index into
    /// `targets`. Infeasible targets and timeouts degrade the result; only
    /// integrity violations are returned as errors.
    fn plan(
        &mut self,
        ctx: &mut PlanningContext,
        start: &Configuration,
        targets: &[Target],
        scene: &Scene,
        termination: &Termination,
    ) -> Result<PlanResult>;

    fn name(&self) -> String;

    fn parameters(&self) -> Value;
}
