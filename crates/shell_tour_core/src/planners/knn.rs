use std::time::Duration;

use kiddo::{KdTree, SquaredEuclidean};
use serde_json::{Value, json};

use crate::{
    Configuration, PathSegment, PlanResult, Result, Target, Termination,
    geometry::Point,
    planners::{MultiGoalPlanner, PlanningContext},
    world::scene::Scene,
};

/// Greedy nearest-neighbour tour: from the current end-effector position
/// plan to the `k` nearest unvisited targets and keep the shortest path.
///
/// With `union` set the `k` candidates are offered as one union goal and
/// whichever target the oracle reaches first is taken.
pub struct KnnPlanner {
    k: usize,
    union: bool,
}

impl KnnPlanner {
    pub fn new(k: usize, union: bool) -> Self {
        Self { k: k.max(1), union }
    }

    fn plan_each(
        &self,
        ctx: &mut PlanningContext,
        current: &Configuration,
        targets: &[Target],
        candidates: &[usize],
        budget: Duration,
        termination: &Termination,
    ) -> Result<Option<(usize, PathSegment)>> {
        let per_candidate = budget / candidates.len().max(1) as u32;
        let mut best: Option<(usize, PathSegment)> = None;
        for &candidate in candidates {
            let Some(segment) = ctx.ptp.plan_to_target(
                ctx.si.as_ref(),
                current,
                &targets[candidate].position,
                per_candidate,
                termination,
            )?
            else {
                continue;
            };
            if best
                .as_ref()
                .is_none_or(|(_, kept)| segment.length() < kept.length())
            {
                best = Some((candidate, segment.with_target(Some(candidate))));
            }
        }
        Ok(best)
    }

    fn plan_union(
        &self,
        ctx: &mut PlanningContext,
        current: &Configuration,
        targets: &[Target],
        candidates: &[usize],
        budget: Duration,
        termination: &Termination,
    ) -> Result<Option<(usize, PathSegment)>> {
        let positions: Vec<Point> = candidates.iter().map(|&c| targets[c].position).collect();
        Ok(ctx
            .ptp
            .plan_to_targets(ctx.si.as_ref(), current, &positions, budget, termination)?
            .map(|reached| {
                let target = candidates[reached.target_index];
                (target, reached.segment.with_target(Some(target)))
            }))
    }
}

fn coords(point: &Point) -> [f64; 3] {
    [point.x, point.y, point.z]
}

impl MultiGoalPlanner for KnnPlanner {
    fn plan(
        &mut self,
        ctx: &mut PlanningContext,
        start: &Configuration,
        targets: &[Target],
        _scene: &Scene,
        termination: &Termination,
    ) -> Result<PlanResult> {
        let mut unvisited: KdTree<f64, 3> = KdTree::new();
        for (idx, target) in targets.iter().enumerate() {
            unvisited.add(&coords(&target.position), idx as u64);
        }

        let budget = ctx.ptp.default_budget();
        let mut remaining = targets.len();
        let mut current = start.clone();
        let mut result = PlanResult::empty();

        while remaining > 0 {
            if termination.should_stop() {
                log::debug!("knn.plan: stopped remaining={remaining}");
                break;
            }

            let here = ctx.si.end_effector(&current);
            let candidates: Vec<usize> = unvisited
                .nearest_n::<SquaredEuclidean>(&coords(&here), self.k)
                .into_iter()
                .map(|nn| nn.item as usize)
                .collect();
            let Some(&nearest) = candidates.first() else {
                break;
            };

            let best = if self.union {
                self.plan_union(ctx, &current, targets, &candidates, budget, termination)?
            } else {
                self.plan_each(ctx, &current, targets, &candidates, budget, termination)?
            };

            let dropped = match best {
                Some((reached, segment)) => {
                    current = segment.last().clone();
                    result.push(segment);
                    reached
                }
                None => {
                    log::debug!("knn.plan: unreachable target={}", targets[nearest]);
                    nearest
                }
            };
            unvisited.remove(&coords(&targets[dropped].position), dropped as u64);
            remaining -= 1;
        }

        Ok(result)
    }

    fn name(&self) -> String {
        if self.union {
            format!("U-{}-NN", self.k)
        } else {
            format!("{}-NN", self.k)
        }
    }

    fn parameters(&self) -> Value {
        json!({ "k": self.k, "union": self.union })
    }
}
