use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use crate::{
    Configuration, ProblemDefinition, SpaceInformation, Termination,
    ptp::oracle::{PathPlanningOracle, PlannerStatus},
};

const DEFAULT_GOAL_SAMPLES: usize = 8;
const DEFAULT_DETOUR_ATTEMPTS: usize = 4_000;

/// Deterministic point-to-point oracle for the demo world.
///
/// Tries a direct motion to every goal candidate (region anchors first, then
/// seeded goal samples, cheapest first under the query's objective), then
/// seeded single- and double-waypoint detours until the attempts or the
/// deadline run out.
#[derive(Debug)]
pub struct StraightLineOracle {
    seed: u64,
    rng: StdRng,
    goal_samples: usize,
    detour_attempts: usize,
    solution: Option<Vec<Configuration>>,
}

impl StraightLineOracle {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            goal_samples: DEFAULT_GOAL_SAMPLES,
            detour_attempts: DEFAULT_DETOUR_ATTEMPTS,
            solution: None,
        }
    }

    pub fn with_goal_samples(mut self, goal_samples: usize) -> Self {
        self.goal_samples = goal_samples;
        self
    }

    pub fn with_detour_attempts(mut self, detour_attempts: usize) -> Self {
        self.detour_attempts = detour_attempts;
        self
    }

    fn goal_candidates(
        &mut self,
        si: &dyn SpaceInformation,
        problem: &ProblemDefinition,
        termination: &Termination,
    ) -> Vec<Configuration> {
        let mut candidates: Vec<Configuration> = problem
            .goal
            .anchors(si)
            .iter()
            .filter_map(|anchor| si.configuration_for_end_effector(anchor))
            .filter(|state| problem.goal.is_satisfied(si, state))
            .collect();

        let objective = problem.objective();
        let mut samples = Vec::with_capacity(self.goal_samples);
        for _ in 0..self.goal_samples {
            if termination.should_stop() {
                break;
            }
            if let Some(state) = problem.goal.sample(si, &mut self.rng) {
                let cost = objective.path_cost(si, &[problem.start.clone(), state.clone()]);
                samples.push((cost, state));
            }
        }
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        candidates.extend(samples.into_iter().map(|(_, state)| state));
        candidates
    }

    fn detour_waypoint(
        &mut self,
        si: &dyn SpaceInformation,
        from: &Configuration,
        to: &Configuration,
    ) -> Configuration {
        if self.rng.random_bool(0.5) {
            return si.sample_uniform(&mut self.rng);
        }
        let mid = from.interpolate(to, 0.5);
        let spread = si.distance(from, to).max(0.5);
        Configuration::new(
            mid.values()
                .iter()
                .map(|v| v + self.rng.random_range(-spread..spread))
                .collect(),
        )
    }

    fn search_detour(
        &mut self,
        si: &dyn SpaceInformation,
        start: &Configuration,
        goals: &[Configuration],
        termination: &Termination,
    ) -> Option<Vec<Configuration>> {
        for attempt in 0..self.detour_attempts {
            if termination.should_stop() {
                log::trace!("straight_line.detour: stopped attempts={attempt}");
                return None;
            }
            let goal = &goals[attempt % goals.len()];
            let first = self.detour_waypoint(si, start, goal);
            if !si.is_valid(&first) || !si.check_motion(start, &first) {
                continue;
            }
            if si.check_motion(&first, goal) {
                return Some(vec![start.clone(), first, goal.clone()]);
            }
            let second = self.detour_waypoint(si, &first, goal);
            if si.is_valid(&second)
                && si.check_motion(&first, &second)
                && si.check_motion(&second, goal)
            {
                return Some(vec![start.clone(), first, second, goal.clone()]);
            }
        }
        None
    }
}

impl PathPlanningOracle for StraightLineOracle {
    fn name(&self) -> &str {
        "StraightLine"
    }

    fn solve(
        &mut self,
        si: &dyn SpaceInformation,
        problem: &ProblemDefinition,
        termination: &Termination,
    ) -> PlannerStatus {
        self.solution = None;
        if !si.is_valid(&problem.start) {
            return PlannerStatus::NoSolution;
        }

        let goals = self.goal_candidates(si, problem, termination);
        if goals.is_empty() {
            return PlannerStatus::NoSolution;
        }

        if let Some(goal) = goals.iter().find(|g| si.check_motion(&problem.start, g)) {
            self.solution = Some(vec![problem.start.clone(), goal.clone()]);
            return PlannerStatus::ExactSolution;
        }

        match self.search_detour(si, &problem.start, &goals, termination) {
            Some(path) => {
                self.solution = Some(path);
                PlannerStatus::ExactSolution
            }
            None => {
                self.solution = Some(vec![problem.start.clone()]);
                PlannerStatus::ApproximateSolution
            }
        }
    }

    fn solution_path(&self) -> Option<&[Configuration]> {
        self.solution.as_deref()
    }

    fn clear_query(&mut self) {
        self.solution = None;
    }

    fn parameters(&self) -> Value {
        json!({
            "name": self.name(),
            "seed": self.seed,
            "goal_samples": self.goal_samples,
            "detour_attempts": self.detour_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::StraightLineOracle;
    use crate::{
        Configuration, Goal, ProblemDefinition, SpaceInformation, Target, Termination,
        geometry::Point,
        ptp::oracle::{PathPlanningOracle, PlannerStatus},
        world::{
            scene::{Bounds, Obstacle, Scene},
            sphere_world::SphereWorld,
        },
    };

    fn world() -> SphereWorld {
        let scene = Scene {
            name: "wall".to_string(),
            bounds: Bounds {
                min: Point::new(-5.0, -5.0, -5.0),
                max: Point::new(5.0, 5.0, 5.0),
            },
            obstacles: vec![Obstacle::new(Point::origin(), 1.0)],
            targets: vec![Target::new(0, Point::new(2.0, 0.0, 0.0))],
        };
        SphereWorld::new(Arc::new(scene), 0.05)
    }

    #[test]
    fn free_line_is_solved_directly() {
        let world = world();
        let mut oracle = StraightLineOracle::new(1);
        let problem = ProblemDefinition::new(
            Configuration::new(vec![2.0, 2.0, 0.0]),
            Goal::near(Point::new(2.0, 0.0, 0.0), 0.05),
        );
        let status = oracle.solve(&world, &problem, &Termination::never());
        assert_eq!(status, PlannerStatus::ExactSolution);
        let path = oracle.solution_path().expect("path");
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], Configuration::new(vec![2.0, 0.0, 0.0]));

        oracle.clear_query();
        assert!(oracle.solution_path().is_none());
    }

    #[test]
    fn blocked_line_is_solved_with_valid_detour() {
        let world = world();
        let mut oracle = StraightLineOracle::new(5);
        let problem = ProblemDefinition::new(
            Configuration::new(vec![-2.0, 0.0, 0.0]),
            Goal::near(Point::new(2.0, 0.0, 0.0), 0.05),
        );
        let status = oracle.solve(&world, &problem, &Termination::never());
        assert_eq!(status, PlannerStatus::ExactSolution);
        let path = oracle.solution_path().expect("path").to_vec();
        assert!(path.len() >= 3);
        for pair in path.windows(2) {
            assert!(world.check_motion(&pair[0], &pair[1]));
        }
        assert!(problem.goal.is_satisfied(&world, &path[path.len() - 1]));
    }

    #[test]
    fn unreachable_goal_has_no_solution() {
        let world = world();
        let mut oracle = StraightLineOracle::new(1);
        let problem = ProblemDefinition::new(
            Configuration::new(vec![2.0, 2.0, 0.0]),
            Goal::near(Point::origin(), 0.05),
        );
        assert_eq!(
            oracle.solve(&world, &problem, &Termination::never()),
            PlannerStatus::NoSolution
        );
        assert!(oracle.solution_path().is_none());
    }

    #[test]
    fn expired_deadline_yields_approximate_when_line_is_blocked() {
        let world = world();
        let mut oracle = StraightLineOracle::new(1).with_goal_samples(0);
        let problem = ProblemDefinition::new(
            Configuration::new(vec![-2.0, 0.0, 0.0]),
            Goal::near(Point::new(2.0, 0.0, 0.0), 0.05),
        );
        let status = oracle.solve(&world, &problem, &Termination::after(std::time::Duration::ZERO));
        assert_eq!(status, PlannerStatus::ApproximateSolution);
    }
}
