use std::{
    slice,
    sync::Arc,
    time::{Duration, Instant},
};

use serde_json::{Value, json};

use crate::{
    Configuration, Error, Goal, OptimizationObjective, PathLengthObjective, PathSegment,
    ProblemDefinition, Result, SpaceInformation, Termination,
    geometry::Point,
    ptp::oracle::{PathPlanningOracle, PlannerStatus},
};

/// Tolerance of a state-to-state query's goal region.
pub const STATE_GOAL_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug)]
pub struct PointToPointResult {
    /// Path tagged with `target_index`.
    pub segment: PathSegment,
    /// Index into the offered candidate list of the target that was reached.
    pub target_index: usize,
    pub length: f64,
    pub elapsed: Duration,
}

/// Runs the wrapped oracle with a deadline and accepts exact solutions only.
pub struct PointToPointPlanner {
    oracle: Box<dyn PathPlanningOracle>,
    objective: Arc<dyn OptimizationObjective>,
    goal_radius: f64,
    default_budget: Duration,
}

impl PointToPointPlanner {
    pub fn new(
        oracle: Box<dyn PathPlanningOracle>,
        goal_radius: f64,
        default_budget: Duration,
    ) -> Self {
        Self {
            oracle,
            objective: Arc::new(PathLengthObjective),
            goal_radius,
            default_budget,
        }
    }

    pub fn with_objective(mut self, objective: Arc<dyn OptimizationObjective>) -> Self {
        self.objective = objective;
        self
    }

    /// Objective handed to the oracle with every query; planners optimise
    /// stitched segments against the same one.
    pub fn objective(&self) -> &dyn OptimizationObjective {
        self.objective.as_ref()
    }

    pub fn goal_radius(&self) -> f64 {
        self.goal_radius
    }

    pub fn default_budget(&self) -> Duration {
        self.default_budget
    }

    /// Plans from `from` into the union of the targets' goal regions.
    ///
    /// Returns `Ok(None)` on timeout, cancellation or a non-exact status.
    /// The reached target is the first candidate, in list order, whose
    /// centre lies within the goal radius of the final end-effector position;
    /// an exact solution that matches none is an invariant violation.
    pub fn plan_to_targets(
        &mut self,
        si: &dyn SpaceInformation,
        from: &Configuration,
        targets: &[Point],
        budget: Duration,
        parent: &Termination,
    ) -> Result<Option<PointToPointResult>> {
        if targets.is_empty() {
            return Err(Error::invalid_input("point-to-point query without targets"));
        }
        if parent.should_stop() {
            return Ok(None);
        }

        let started = Instant::now();
        let problem = self.problem(from, Goal::near_any(targets, self.goal_radius));
        let Some(states) = self.solve_exact(si, &problem, budget, parent, targets.len()) else {
            return Ok(None);
        };

        let end = si.end_effector(&states[states.len() - 1]);
        let Some(target_index) = targets
            .iter()
            .position(|target| nalgebra::distance(target, &end) < self.goal_radius)
        else {
            return Err(Error::invariant(format!(
                "oracle {} reported an exact solution ending at ({:.4},{:.4},{:.4}) \
                 outside radius {} of all {} candidates",
                self.oracle.name(),
                end.x,
                end.y,
                end.z,
                self.goal_radius,
                targets.len()
            )));
        };

        let segment = PathSegment::new(Some(target_index), states)?;
        Ok(Some(PointToPointResult {
            length: segment.length(),
            segment,
            target_index,
            elapsed: started.elapsed(),
        }))
    }

    /// Single-target query; the returned segment carries no target tag.
    pub fn plan_to_target(
        &mut self,
        si: &dyn SpaceInformation,
        from: &Configuration,
        target: &Point,
        budget: Duration,
        parent: &Termination,
    ) -> Result<Option<PathSegment>> {
        Ok(self
            .plan_to_targets(si, from, slice::from_ref(target), budget, parent)?
            .map(|result| result.segment.with_target(None)))
    }

    /// Plans between two states; the segment ends exactly at `to`.
    pub fn plan_to_state(
        &mut self,
        si: &dyn SpaceInformation,
        from: &Configuration,
        to: &Configuration,
        budget: Duration,
        parent: &Termination,
    ) -> Result<Option<PathSegment>> {
        if parent.should_stop() {
            return Ok(None);
        }

        let goal = Goal::State {
            state: to.clone(),
            tolerance: STATE_GOAL_TOLERANCE,
        };
        let problem = self.problem(from, goal);
        let Some(mut states) = self.solve_exact(si, &problem, budget, parent, 1) else {
            return Ok(None);
        };

        let last = states.len() - 1;
        if !problem.goal.is_satisfied(si, &states[last]) {
            return Err(Error::invariant(format!(
                "oracle {} reported an exact solution that misses the goal state",
                self.oracle.name()
            )));
        }
        states[last] = to.clone();
        PathSegment::new(None, states).map(Some)
    }

    pub fn parameters(&self) -> Value {
        json!({
            "oracle": self.oracle.parameters(),
            "goal_radius": self.goal_radius,
            "time_budget_s": self.default_budget.as_secs_f64(),
        })
    }

    fn problem(&self, from: &Configuration, goal: Goal) -> ProblemDefinition {
        ProblemDefinition::new(from.clone(), goal).with_objective(Arc::clone(&self.objective))
    }

    fn solve_exact(
        &mut self,
        si: &dyn SpaceInformation,
        problem: &ProblemDefinition,
        budget: Duration,
        parent: &Termination,
        candidates: usize,
    ) -> Option<Vec<Configuration>> {
        let budget = parent.clip(budget);
        let termination = parent.child(budget);
        let started = Instant::now();
        let status = self.oracle.solve(si, problem, &termination);
        let states = match status {
            PlannerStatus::ExactSolution => self
                .oracle
                .solution_path()
                .filter(|path| !path.is_empty())
                .map(<[Configuration]>::to_vec),
            PlannerStatus::ApproximateSolution | PlannerStatus::NoSolution => None,
        };
        self.oracle.clear_query();

        log::trace!(
            "ptp.solve: oracle={} status={status} candidates={candidates} states={} \
             budget={:.3} secs={:.3}",
            self.oracle.name(),
            states.as_ref().map_or(0, Vec::len),
            budget.as_secs_f64(),
            started.elapsed().as_secs_f64()
        );
        states
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use serde_json::{Value, json};

    use super::PointToPointPlanner;
    use crate::{
        Configuration, Error, OptimizationObjective, PathLengthObjective, ProblemDefinition,
        SpaceInformation, Target, Termination,
        geometry::Point,
        ptp::oracle::{PathPlanningOracle, PlannerStatus},
        world::{
            scene::{Bounds, Scene},
            sphere_world::SphereWorld,
            straight_line::StraightLineOracle,
        },
    };

    /// Replays a fixed status and path, counting solve/clear calls.
    struct ScriptedOracle {
        status: PlannerStatus,
        path: Vec<Configuration>,
        solution: Option<Vec<Configuration>>,
        solves: Arc<AtomicUsize>,
        clears: Arc<AtomicUsize>,
    }

    impl PathPlanningOracle for ScriptedOracle {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn solve(
            &mut self,
            _si: &dyn SpaceInformation,
            _problem: &ProblemDefinition,
            _termination: &Termination,
        ) -> PlannerStatus {
            self.solves.fetch_add(1, Ordering::SeqCst);
            self.solution = Some(self.path.clone());
            self.status
        }

        fn solution_path(&self) -> Option<&[Configuration]> {
            self.solution.as_deref()
        }

        fn clear_query(&mut self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.solution = None;
        }

        fn parameters(&self) -> Value {
            json!({ "name": "Scripted" })
        }
    }

    struct Harness {
        planner: PointToPointPlanner,
        solves: Arc<AtomicUsize>,
        clears: Arc<AtomicUsize>,
    }

    fn scripted(status: PlannerStatus, end: [f64; 3]) -> Harness {
        let solves = Arc::new(AtomicUsize::new(0));
        let clears = Arc::new(AtomicUsize::new(0));
        let oracle = ScriptedOracle {
            status,
            path: vec![
                Configuration::new(vec![0.0, 0.0, 0.0]),
                Configuration::new(end.to_vec()),
            ],
            solution: None,
            solves: Arc::clone(&solves),
            clears: Arc::clone(&clears),
        };
        Harness {
            planner: PointToPointPlanner::new(Box::new(oracle), 0.1, Duration::from_secs(1)),
            solves,
            clears,
        }
    }

    fn open_world() -> SphereWorld {
        let scene = Scene {
            name: "open".to_string(),
            bounds: Bounds {
                min: Point::new(-10.0, -10.0, -10.0),
                max: Point::new(10.0, 10.0, 10.0),
            },
            obstacles: Vec::new(),
            targets: vec![Target::new(0, Point::new(1.0, 0.0, 0.0))],
        };
        SphereWorld::new(Arc::new(scene), 0.0)
    }

    fn origin() -> Configuration {
        Configuration::new(vec![0.0, 0.0, 0.0])
    }

    #[test]
    fn approximate_solution_is_rejected_and_query_cleared() {
        let mut h = scripted(PlannerStatus::ApproximateSolution, [1.0, 0.0, 0.0]);
        let result = h
            .planner
            .plan_to_targets(
                &open_world(),
                &origin(),
                &[Point::new(1.0, 0.0, 0.0)],
                Duration::from_secs(1),
                &Termination::never(),
            )
            .expect("no error");
        assert!(result.is_none());
        assert_eq!(h.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exact_solution_matches_first_candidate_in_list_order() {
        let mut h = scripted(PlannerStatus::ExactSolution, [1.0, 0.0, 0.0]);
        let targets = [
            Point::new(5.0, 0.0, 0.0),
            Point::new(1.05, 0.0, 0.0),
            Point::new(0.98, 0.0, 0.0),
        ];
        let result = h
            .planner
            .plan_to_targets(
                &open_world(),
                &origin(),
                &targets,
                Duration::from_secs(1),
                &Termination::never(),
            )
            .expect("no error")
            .expect("exact");
        assert_eq!(result.target_index, 1);
        assert_eq!(result.segment.target(), Some(1));
        assert!((result.length - 1.0).abs() < 1e-12);
        assert_eq!(h.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exact_solution_without_match_is_an_invariant_violation() {
        let mut h = scripted(PlannerStatus::ExactSolution, [3.0, 0.0, 0.0]);
        let err = h
            .planner
            .plan_to_targets(
                &open_world(),
                &origin(),
                &[Point::new(1.0, 0.0, 0.0)],
                Duration::from_secs(1),
                &Termination::never(),
            )
            .expect_err("must fail loudly");
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(err.is_fatal());
        assert_eq!(h.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_parent_skips_the_oracle() {
        let mut h = scripted(PlannerStatus::ExactSolution, [1.0, 0.0, 0.0]);
        let termination = Termination::never();
        termination.cancel();
        let result = h
            .planner
            .plan_to_target(
                &open_world(),
                &origin(),
                &Point::new(1.0, 0.0, 0.0),
                Duration::from_secs(1),
                &termination,
            )
            .expect("no error");
        assert!(result.is_none());
        assert_eq!(h.solves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn repeated_queries_do_not_leak_solutions() {
        let world = open_world();
        let mut planner =
            PointToPointPlanner::new(Box::new(StraightLineOracle::new(3)), 0.1, Duration::from_secs(1));
        let first = planner
            .plan_to_target(
                &world,
                &origin(),
                &Point::new(1.0, 0.0, 0.0),
                Duration::from_secs(1),
                &Termination::never(),
            )
            .expect("no error")
            .expect("exact");
        assert_eq!(first.target(), None);
        assert_eq!(first.last(), &Configuration::new(vec![1.0, 0.0, 0.0]));

        let unreachable = planner
            .plan_to_target(
                &world,
                &origin(),
                &Point::new(50.0, 0.0, 0.0),
                Duration::from_secs(1),
                &Termination::never(),
            )
            .expect("no error");
        assert!(unreachable.is_none());
    }

    #[test]
    fn plan_to_state_ends_exactly_at_goal_state() {
        let world = open_world();
        let mut planner =
            PointToPointPlanner::new(Box::new(StraightLineOracle::new(3)), 0.1, Duration::from_secs(1));
        let goal = Configuration::new(vec![0.0, 2.0, 1.0]);
        let segment = planner
            .plan_to_state(&world, &origin(), &goal, Duration::from_secs(1), &Termination::never())
            .expect("no error")
            .expect("exact");
        assert_eq!(segment.first(), &origin());
        assert_eq!(segment.last(), &goal);
    }

    /// Charges twice the path length.
    #[derive(Debug)]
    struct DoubleLength;

    impl OptimizationObjective for DoubleLength {
        fn path_cost(&self, si: &dyn SpaceInformation, states: &[Configuration]) -> f64 {
            2.0 * PathLengthObjective.path_cost(si, states)
        }
    }

    /// Records what each query handed to the oracle and then gives up.
    #[derive(Default)]
    struct RecordingOracle {
        costs: Arc<Mutex<Vec<f64>>>,
        remaining: Arc<Mutex<Vec<Option<Duration>>>>,
    }

    impl PathPlanningOracle for RecordingOracle {
        fn name(&self) -> &str {
            "Recording"
        }

        fn solve(
            &mut self,
            si: &dyn SpaceInformation,
            problem: &ProblemDefinition,
            termination: &Termination,
        ) -> PlannerStatus {
            let unit = [problem.start.clone(), Configuration::new(vec![1.0, 0.0, 0.0])];
            let cost = problem.objective().path_cost(si, &unit);
            self.costs.lock().expect("costs").push(cost);
            self.remaining.lock().expect("remaining").push(termination.remaining());
            PlannerStatus::NoSolution
        }

        fn solution_path(&self) -> Option<&[Configuration]> {
            None
        }

        fn clear_query(&mut self) {}

        fn parameters(&self) -> Value {
            json!({ "name": "Recording" })
        }
    }

    #[test]
    fn queries_carry_the_planner_objective_and_clipped_budget() {
        let oracle = RecordingOracle::default();
        let costs = Arc::clone(&oracle.costs);
        let remaining = Arc::clone(&oracle.remaining);
        let mut planner =
            PointToPointPlanner::new(Box::new(oracle), 0.1, Duration::from_secs(60))
                .with_objective(Arc::new(DoubleLength));
        let world = open_world();
        let unit = [origin(), Configuration::new(vec![1.0, 0.0, 0.0])];
        assert!((planner.objective().path_cost(&world, &unit) - 2.0).abs() < 1e-12);

        let parent = Termination::after(Duration::from_millis(200));
        let none = planner
            .plan_to_target(
                &world,
                &origin(),
                &Point::new(1.0, 0.0, 0.0),
                Duration::from_secs(60),
                &parent,
            )
            .expect("no error");
        assert!(none.is_none());
        planner
            .plan_to_state(
                &world,
                &origin(),
                &Configuration::new(vec![0.0, 1.0, 0.0]),
                Duration::from_secs(60),
                &parent,
            )
            .expect("no error");

        assert_eq!(*costs.lock().expect("costs"), vec![2.0, 2.0]);
        for left in remaining.lock().expect("remaining").iter() {
            assert!(left.expect("deadline") <= Duration::from_millis(200));
        }
    }
}
