//! Configuration-space seam between the planners and the robot/scene model.

use std::{fmt::Debug, sync::Arc};

use rand::{Rng, rngs::StdRng};

use crate::{Configuration, geometry::Point};

/// Per-task view of the configuration space and its validity checker.
///
/// Instances hold mutable planning state and are built fresh for every
/// task; they are `Send` so a worker can own one, never shared.
pub trait SpaceInformation: Send {
    fn dimension(&self) -> usize;

    /// End-effector position for `state`.
    fn end_effector(&self, state: &Configuration) -> Point;

    fn is_valid(&self, state: &Configuration) -> bool;

    /// Whether the straight motion between two states is collision free.
    fn check_motion(&self, from: &Configuration, to: &Configuration) -> bool;

    fn distance(&self, a: &Configuration, b: &Configuration) -> f64 {
        a.distance(b)
    }

    fn sample_uniform(&self, rng: &mut StdRng) -> Configuration;

    /// A valid state whose end-effector lies within `radius` of `target`.
    fn sample_near_target(
        &self,
        target: &Point,
        radius: f64,
        rng: &mut StdRng,
    ) -> Option<Configuration>;

    /// A valid state that puts the end-effector at `point`.
    fn configuration_for_end_effector(&self, point: &Point) -> Option<Configuration>;
}

/// Goal region over the configuration space.
#[derive(Clone, Debug, PartialEq)]
pub enum Goal {
    EndEffectorNear { target: Point, radius: f64 },
    State { state: Configuration, tolerance: f64 },
    /// Satisfied when any member is.
    Union(Vec<Goal>),
}

impl Goal {
    pub fn near(target: Point, radius: f64) -> Self {
        Self::EndEffectorNear { target, radius }
    }

    /// A single region for one target, a union for several.
    pub fn near_any(targets: &[Point], radius: f64) -> Self {
        match targets {
            [single] => Self::near(*single, radius),
            many => Self::Union(many.iter().map(|t| Self::near(*t, radius)).collect()),
        }
    }

    /// Distance from `state` to the region; zero inside it.
    pub fn distance(&self, si: &dyn SpaceInformation, state: &Configuration) -> f64 {
        match self {
            Self::EndEffectorNear { target, radius } => {
                (nalgebra::distance(&si.end_effector(state), target) - radius).max(0.0)
            }
            Self::State {
                state: goal,
                tolerance,
            } => (si.distance(state, goal) - tolerance).max(0.0),
            Self::Union(members) => members
                .iter()
                .map(|m| m.distance(si, state))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn is_satisfied(&self, si: &dyn SpaceInformation, state: &Configuration) -> bool {
        match self {
            Self::EndEffectorNear { target, radius } => {
                nalgebra::distance(&si.end_effector(state), target) < *radius
            }
            Self::State {
                state: goal,
                tolerance,
            } => si.distance(state, goal) <= *tolerance,
            Self::Union(members) => members.iter().any(|m| m.is_satisfied(si, state)),
        }
    }

    /// Draws a valid state inside the region. Union members are tried in a
    /// random rotation so every member gets sampled.
    pub fn sample(&self, si: &dyn SpaceInformation, rng: &mut StdRng) -> Option<Configuration> {
        match self {
            Self::EndEffectorNear { target, radius } => {
                si.sample_near_target(target, *radius, rng)
            }
            Self::State { state, .. } => si.is_valid(state).then(|| state.clone()),
            Self::Union(members) => {
                if members.is_empty() {
                    return None;
                }
                let offset = rng.random_range(0..members.len());
                (0..members.len())
                    .map(|i| &members[(offset + i) % members.len()])
                    .find_map(|m| m.sample(si, rng))
            }
        }
    }

    /// End-effector anchors of the region, used for straight-line seeding.
    pub fn anchors(&self, si: &dyn SpaceInformation) -> Vec<Point> {
        match self {
            Self::EndEffectorNear { target, .. } => vec![*target],
            Self::State { state, .. } => vec![si.end_effector(state)],
            Self::Union(members) => members.iter().flat_map(|m| m.anchors(si)).collect(),
        }
    }
}

/// Cost of a state sequence.
pub trait OptimizationObjective: Debug + Send + Sync {
    fn path_cost(&self, si: &dyn SpaceInformation, states: &[Configuration]) -> f64;
}

/// Plain configuration-space path length.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathLengthObjective;

impl OptimizationObjective for PathLengthObjective {
    fn path_cost(&self, si: &dyn SpaceInformation, states: &[Configuration]) -> f64 {
        states.windows(2).map(|w| si.distance(&w[0], &w[1])).sum()
    }
}

/// One point-to-point query: start state, goal region and the objective the
/// oracle minimises.
#[derive(Clone, Debug)]
pub struct ProblemDefinition {
    pub start: Configuration,
    pub goal: Goal,
    objective: Arc<dyn OptimizationObjective>,
}

impl ProblemDefinition {
    /// Query minimising [`PathLengthObjective`].
    pub fn new(start: Configuration, goal: Goal) -> Self {
        Self {
            start,
            goal,
            objective: Arc::new(PathLengthObjective),
        }
    }

    pub fn with_objective(mut self, objective: Arc<dyn OptimizationObjective>) -> Self {
        self.objective = objective;
        self
    }

    pub fn objective(&self) -> &dyn OptimizationObjective {
        self.objective.as_ref()
    }
}
