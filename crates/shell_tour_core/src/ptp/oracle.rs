use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::{Configuration, ProblemDefinition, SpaceInformation, Termination};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlannerStatus {
    /// The returned path ends inside the goal region.
    ExactSolution,
    /// The path only gets as close as the planner could; it may end anywhere.
    ApproximateSolution,
    NoSolution,
}

impl Display for PlannerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactSolution => write!(f, "exact"),
            Self::ApproximateSolution => write!(f, "approximate"),
            Self::NoSolution => write!(f, "none"),
        }
    }
}

/// Single-query path planner treated as a black box.
///
/// `solve` runs until an exact solution is found or `termination` stops it.
/// The solution stays available through `solution_path` until
/// `clear_query` is called.
pub trait PathPlanningOracle: Send {
    fn name(&self) -> &str;

    fn solve(
        &mut self,
        si: &dyn SpaceInformation,
        problem: &ProblemDefinition,
        termination: &Termination,
    ) -> PlannerStatus;

    fn solution_path(&self) -> Option<&[Configuration]>;

    fn clear_query(&mut self);

    fn parameters(&self) -> Value;
}
