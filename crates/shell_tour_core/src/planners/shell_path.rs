use serde_json::{Value, json};

use crate::{
    Configuration, PathSegment, PlanResult, Result, Target, Termination,
    optimize::{optimize_exit, optimize_segment},
    ordering::tsp::tsp_open_end,
    planners::{MultiGoalPlanner, PlanningContext},
    shell::{Shell, ShellBuilder},
    world::scene::Scene,
};

/// Path from a shell state to one target.
#[derive(Clone, Debug)]
struct Approach {
    target: usize,
    segment: PathSegment,
}

/// Plans one approach per target from the shell, orders the approaches with
/// shell-predicted costs and stitches them with retreat/shell-move/approach
/// transits.
pub struct ShellPathPlanner {
    shell_builder: Box<dyn ShellBuilder>,
    optimize_approaches: bool,
    optimize_segments: bool,
}

impl ShellPathPlanner {
    pub fn new(
        shell_builder: Box<dyn ShellBuilder>,
        optimize_approaches: bool,
        optimize_segments: bool,
    ) -> Self {
        Self {
            shell_builder,
            optimize_approaches,
            optimize_segments,
        }
    }

    /// `None` when stopped before every target was tried.
    fn plan_approaches(
        &self,
        ctx: &mut PlanningContext,
        shell: &dyn Shell,
        targets: &[Target],
        termination: &Termination,
    ) -> Result<Option<Vec<Approach>>> {
        let budget = ctx.ptp.default_budget();
        let mut approaches = Vec::with_capacity(targets.len());

        for (target_idx, target) in targets.iter().enumerate() {
            if termination.should_stop() {
                log::debug!(
                    "shell.approaches: stopped planned={} of={}",
                    approaches.len(),
                    targets.len()
                );
                return Ok(None);
            }

            let si = ctx.si.as_ref();
            let Some(shell_state) = shell.state_on_shell(si, &target.position) else {
                log::debug!("shell.approaches: no shell state target={target}");
                continue;
            };
            let Some(segment) =
                ctx.ptp
                    .plan_to_target(si, &shell_state, &target.position, budget, termination)?
            else {
                log::debug!("shell.approaches: unreachable target={target}");
                continue;
            };

            let mut segment = segment.with_target(Some(target_idx));
            if self.optimize_approaches {
                segment = optimize_exit(si, shell, segment, ctx.ptp.objective(), termination);
            }
            approaches.push(Approach {
                target: target_idx,
                segment,
            });
        }

        log::debug!(
            "shell.approaches: done planned={} dropped={}",
            approaches.len(),
            targets.len() - approaches.len()
        );
        Ok(Some(approaches))
    }

    fn order_approaches(
        &self,
        ctx: &PlanningContext,
        shell: &dyn Shell,
        start: &Configuration,
        targets: &[Target],
        approaches: &[Approach],
        termination: &Termination,
    ) -> Result<Vec<usize>> {
        let si = ctx.si.as_ref();
        let position = |i: usize| &targets[approaches[i].target].position;
        tsp_open_end(
            ctx.routing.as_ref(),
            approaches.len(),
            |i| shell.predict_length_from_state(si, start, position(i)),
            |i, j| shell.predict_length_between(position(i), position(j)),
            termination,
        )
    }

    /// Retreat from `from` to the shell, move along the shell, approach `to`.
    ///
    /// A blocked shell arc is replaced by a point-to-point plan between the
    /// two shell states; `None` when that fails as well.
    fn transit(
        &self,
        ctx: &mut PlanningContext,
        shell: &dyn Shell,
        from: &Approach,
        to: &Approach,
        termination: &Termination,
    ) -> Result<Option<PathSegment>> {
        let (exit, entry) = (from.segment.first(), to.segment.first());
        let mut segment = from.segment.reversed();
        match shell.path_on_shell(ctx.si.as_ref(), exit, entry) {
            Some(arc) => segment.extend_states(&arc),
            None => {
                let budget = ctx.ptp.default_budget();
                let Some(detour) =
                    ctx.ptp
                        .plan_to_state(ctx.si.as_ref(), exit, entry, budget, termination)?
                else {
                    return Ok(None);
                };
                log::debug!("shell.transit: arc blocked, detour states={}", detour.state_count());
                segment.append(&detour);
            }
        }
        segment.append(&to.segment);
        if self.optimize_segments {
            segment =
                optimize_segment(ctx.si.as_ref(), segment, ctx.ptp.objective(), termination);
        }
        Ok(Some(segment))
    }
}

impl MultiGoalPlanner for ShellPathPlanner {
    fn plan(
        &mut self,
        ctx: &mut PlanningContext,
        start: &Configuration,
        targets: &[Target],
        scene: &Scene,
        termination: &Termination,
    ) -> Result<PlanResult> {
        let shell = self.shell_builder.build(scene)?;

        let Some(approaches) = self.plan_approaches(ctx, shell.as_ref(), targets, termination)?
        else {
            return Ok(PlanResult::empty());
        };
        if approaches.is_empty() {
            log::debug!("shell.plan: no reachable targets of={}", targets.len());
            return Ok(PlanResult::empty());
        }

        let ordering = match self.order_approaches(
            ctx,
            shell.as_ref(),
            start,
            targets,
            &approaches,
            termination,
        ) {
            Ok(ordering) => ordering,
            Err(err) if err.is_cancelled() => {
                log::debug!("shell.order: stopped approaches={}", approaches.len());
                return Ok(PlanResult::empty());
            }
            Err(err) => return Err(err),
        };

        let first = &approaches[ordering[0]];
        let budget = ctx.ptp.default_budget();
        let Some(mut first_leg) = ctx.ptp.plan_to_state(
            ctx.si.as_ref(),
            start,
            first.segment.first(),
            budget,
            termination,
        )?
        else {
            log::debug!(
                "shell.first_leg: unreachable target={}",
                targets[first.target]
            );
            return Ok(PlanResult::empty());
        };
        first_leg.append(&first.segment);
        if self.optimize_segments {
            first_leg =
                optimize_segment(ctx.si.as_ref(), first_leg, ctx.ptp.objective(), termination);
        }

        let mut result = PlanResult::empty();
        result.push(first_leg);

        for pair in ordering.windows(2) {
            if termination.should_stop() {
                log::debug!(
                    "shell.assemble: stopped segments={} of={}",
                    result.segments().len(),
                    ordering.len()
                );
                break;
            }
            let Some(segment) = self.transit(
                ctx,
                shell.as_ref(),
                &approaches[pair[0]],
                &approaches[pair[1]],
                termination,
            )?
            else {
                log::debug!(
                    "shell.assemble: no transit target={} segments={}",
                    targets[approaches[pair[1]].target],
                    result.segments().len()
                );
                break;
            };
            result.push(segment);
        }

        log::debug!(
            "shell.plan: done segments={} visited={} length={:.4}",
            result.segments().len(),
            result.goals_visited(),
            result.length()
        );
        Ok(result)
    }

    fn name(&self) -> String {
        "ShellPathPlanner".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "apply_shellstate_optimization": self.optimize_approaches,
            "optimize_segments": self.optimize_segments,
            "shell": self.shell_builder.parameters(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::{Value, json};

    use super::ShellPathPlanner;
    use crate::{
        Configuration, Result, Target, Termination,
        geometry::Point,
        planners::{ContextFactory, MultiGoalPlanner},
        shell::{EnclosingSphereBuilder, Shell, ShellBuilder, SphereShell},
        world::{
            demo::DemoContextFactory,
            scene::{Bounds, Obstacle, Scene},
        },
    };

    fn scene(obstacles: Vec<Obstacle>, targets: Vec<Point>) -> Arc<Scene> {
        Arc::new(Scene {
            name: "shell-test".to_string(),
            bounds: Bounds {
                min: Point::new(-10.0, -10.0, -10.0),
                max: Point::new(10.0, 10.0, 10.0),
            },
            obstacles,
            targets: targets
                .into_iter()
                .enumerate()
                .map(|(id, p)| Target::new(id, p))
                .collect(),
        })
    }

    fn planner() -> ShellPathPlanner {
        ShellPathPlanner::new(Box::new(EnclosingSphereBuilder::new(0.5)), true, true)
    }

    fn plan(scene: &Arc<Scene>, start: [f64; 3]) -> crate::PlanResult {
        let factory = DemoContextFactory::new(0.05, 0.1, Duration::from_millis(500));
        let mut ctx = factory.context(scene, 7).expect("context");
        planner()
            .plan(
                &mut ctx,
                &Configuration::new(start.to_vec()),
                &scene.targets,
                scene,
                &Termination::never(),
            )
            .expect("plan")
    }

    #[test]
    fn no_feasible_goal_gives_zero_segments() {
        let scene = scene(
            vec![Obstacle::new(Point::origin(), 1.0)],
            vec![Point::new(0.2, 0.0, 0.0), Point::new(0.0, -0.3, 0.0)],
        );
        let result = plan(&scene, [4.0, 0.0, 0.0]);
        assert!(result.segments().is_empty());
        assert_eq!(result.goals_visited(), 0);
    }

    #[test]
    fn single_feasible_goal_gives_one_segment_ending_there() {
        let scene = scene(
            vec![Obstacle::new(Point::origin(), 1.0)],
            vec![Point::new(0.2, 0.0, 0.0), Point::new(0.0, 1.4, 0.0)],
        );
        let result = plan(&scene, [4.0, 0.0, 0.0]);
        assert_eq!(result.segments().len(), 1);
        let segment = &result.segments()[0];
        assert_eq!(segment.target(), Some(1));
        assert_eq!(segment.first(), &Configuration::new(vec![4.0, 0.0, 0.0]));
        let end = Point::new(
            segment.last().values()[0],
            segment.last().values()[1],
            segment.last().values()[2],
        );
        assert!(nalgebra::distance(&end, &Point::new(0.0, 1.4, 0.0)) < 0.1);
    }

    #[test]
    fn unreachable_target_is_skipped_and_rest_are_visited() {
        let scene = scene(
            vec![Obstacle::new(Point::origin(), 1.0)],
            vec![
                Point::new(1.3, 0.0, 0.0),
                Point::new(0.0, 1.3, 0.0),
                Point::origin(),
                Point::new(-1.3, 0.0, 0.0),
                Point::new(0.0, -1.3, 0.0),
            ],
        );
        let result = plan(&scene, [4.0, 0.0, 0.0]);
        assert_eq!(result.goals_visited(), 4);
        assert_eq!(result.segments().len(), 4);
        assert!(result.is_connected(1e-9));

        let mut visited: Vec<usize> = result.segments().iter().filter_map(|s| s.target()).collect();
        assert_eq!(visited[0], 0);
        visited.sort_unstable();
        assert_eq!(visited, vec![0, 1, 3, 4]);
    }

    #[test]
    fn single_target_in_free_space_is_reached_straight() {
        let scene = scene(Vec::new(), vec![Point::new(1.0, 0.0, 0.0)]);
        let result = plan(&scene, [0.0, 0.0, 0.0]);
        assert_eq!(result.segments().len(), 1);
        assert!((result.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stopped_planner_returns_empty_result() {
        let scene = scene(Vec::new(), vec![Point::new(1.0, 0.0, 0.0)]);
        let factory = DemoContextFactory::new(0.05, 0.1, Duration::from_millis(500));
        let mut ctx = factory.context(&scene, 7).expect("context");
        let termination = Termination::never();
        termination.cancel();
        let result = planner()
            .plan(
                &mut ctx,
                &Configuration::new(vec![0.0, 0.0, 0.0]),
                &scene.targets,
                &scene,
                &termination,
            )
            .expect("plan");
        assert!(result.is_empty());
    }

    /// Always builds the same sphere, whatever the scene holds.
    struct FixedSphere(SphereShell);

    impl ShellBuilder for FixedSphere {
        fn build(&self, _scene: &Scene) -> Result<Box<dyn Shell>> {
            Ok(Box::new(self.0.clone()))
        }

        fn parameters(&self) -> Value {
            json!({ "kind": "fixed" })
        }
    }

    #[test]
    fn blocked_shell_arc_is_replaced_by_a_checked_detour() {
        let blocker = Point::new(2.0_f64.sqrt(), 2.0_f64.sqrt(), 0.0);
        let scene = scene(
            vec![Obstacle::new(Point::origin(), 1.0), Obstacle::new(blocker, 0.3)],
            vec![Point::new(1.3, 0.0, 0.0), Point::new(0.0, 1.3, 0.0)],
        );
        let factory = DemoContextFactory::new(0.05, 0.1, Duration::from_millis(500));
        let mut ctx = factory.context(&scene, 7).expect("context");
        let shell = SphereShell::new(Point::origin(), 2.0).with_arc_resolution(0.1);
        let mut planner = ShellPathPlanner::new(Box::new(FixedSphere(shell)), false, false);

        let result = planner
            .plan(
                &mut ctx,
                &Configuration::new(vec![4.0, 0.0, 0.0]),
                &scene.targets,
                &scene,
                &Termination::never(),
            )
            .expect("plan");

        assert_eq!(result.goals_visited(), 2);
        assert!(result.is_connected(1e-9));
        for segment in result.segments() {
            for pair in segment.states().windows(2) {
                assert!(ctx.si.check_motion(&pair[0], &pair[1]));
            }
        }
    }
}
