use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde_json::{Value, json};

use crate::{
    Configuration, PlanResult, Result, Target, Termination,
    planners::{MultiGoalPlanner, PlanningContext, chain::plan_chain},
    world::scene::Scene,
};

/// Visits targets in a seeded random order. Baseline for the ordering
/// heuristics.
pub struct RandomOrderPlanner {
    seed: u64,
}

impl RandomOrderPlanner {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl MultiGoalPlanner for RandomOrderPlanner {
    fn plan(
        &mut self,
        ctx: &mut PlanningContext,
        start: &Configuration,
        targets: &[Target],
        _scene: &Scene,
        termination: &Termination,
    ) -> Result<PlanResult> {
        let mut order: Vec<usize> = (0..targets.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(self.seed));
        plan_chain(ctx, start, targets, &order, false, termination)
    }

    fn name(&self) -> String {
        "Random".to_string()
    }

    fn parameters(&self) -> Value {
        json!({ "seed": self.seed })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::RandomOrderPlanner;
    use crate::{
        Configuration, PlanResult, Target, Termination,
        geometry::Point,
        planners::{ContextFactory, MultiGoalPlanner},
        world::{
            demo::DemoContextFactory,
            scene::{Bounds, Scene},
        },
    };

    fn run(seed: u64) -> PlanResult {
        let scene = Arc::new(Scene {
            name: "grid".to_string(),
            bounds: Bounds {
                min: Point::new(-5.0, -5.0, -5.0),
                max: Point::new(5.0, 5.0, 5.0),
            },
            obstacles: Vec::new(),
            targets: (0..6)
                .map(|i| Target::new(i, Point::new(i as f64 * 0.5, 1.0, 0.0)))
                .collect(),
        });
        let factory = DemoContextFactory::new(0.05, 0.1, Duration::from_millis(100));
        let mut ctx = factory.context(&scene, 3).expect("context");
        RandomOrderPlanner::new(seed)
            .plan(
                &mut ctx,
                &Configuration::new(vec![0.0, 0.0, 0.0]),
                &scene.targets,
                &scene,
                &Termination::never(),
            )
            .expect("plan")
    }

    fn order(result: &PlanResult) -> Vec<usize> {
        result.segments().iter().filter_map(|s| s.target()).collect()
    }

    #[test]
    fn same_seed_gives_same_order() {
        let a = run(11);
        let b = run(11);
        assert_eq!(order(&a), order(&b));
        assert_eq!(a.goals_visited(), 6);
        assert!(a.is_connected(1e-9));
    }

    #[test]
    fn order_is_a_permutation() {
        let mut visited = order(&run(5));
        visited.sort_unstable();
        assert_eq!(visited, (0..6).collect::<Vec<_>>());
    }
}
