use serde_json::{Value, json};

use crate::{
    Configuration, PlanResult, Result, Target, Termination,
    model::target::positions,
    ordering::{heuristics::HeuristicKind, strategy::OrderingStrategyKind},
    planners::{MultiGoalPlanner, PlanningContext, chain::plan_chain},
    world::scene::Scene,
};

/// Fixes the visiting order up front from a distance heuristic between
/// end-effector positions, then chains point-to-point plans through it.
pub struct OrderedPlanner {
    strategy: OrderingStrategyKind,
    heuristic: HeuristicKind,
    optimize_segments: bool,
}

impl OrderedPlanner {
    pub fn new(
        strategy: OrderingStrategyKind,
        heuristic: HeuristicKind,
        optimize_segments: bool,
    ) -> Self {
        Self {
            strategy,
            heuristic,
            optimize_segments,
        }
    }
}

impl MultiGoalPlanner for OrderedPlanner {
    fn plan(
        &mut self,
        ctx: &mut PlanningContext,
        start: &Configuration,
        targets: &[Target],
        scene: &Scene,
        termination: &Termination,
    ) -> Result<PlanResult> {
        let heuristic = self.heuristic.build(scene.focus());
        let from = ctx.si.end_effector(start);
        let points = positions(targets);

        let order = match self.strategy.order(
            &from,
            &points,
            heuristic.as_ref(),
            ctx.routing.as_ref(),
            termination,
        ) {
            Ok(order) => order,
            Err(err) if err.is_cancelled() => {
                log::debug!("ordered.plan: stopped while ordering targets={}", targets.len());
                return Ok(PlanResult::empty());
            }
            Err(err) => return Err(err),
        };
        log::debug!(
            "ordered.plan: order strategy={} heuristic={} targets={}",
            self.strategy,
            heuristic.name(),
            order.len()
        );

        plan_chain(ctx, start, targets, &order, self.optimize_segments, termination)
    }

    fn name(&self) -> String {
        format!("Ordered-{}-{}", self.strategy, self.heuristic)
    }

    fn parameters(&self) -> Value {
        json!({
            "strategy": self.strategy.to_string(),
            "heuristic": self.heuristic.to_string(),
            "optimize_segments": self.optimize_segments,
        })
    }
}
