//! Multi-goal tour planning for an end-effector that must visit a set of
//! 3D targets, built around a simplified enclosing shell.
//!
//! Approaches are planned once per target from the shell, ordered with an
//! open-path routing problem over shell-predicted costs and stitched with
//! retreat/shell-move/approach transits. Baseline planners (k-NN, random,
//! heuristic-ordered, multi-goal PRM) share the same interface, and an
//! experiment runner compares them over seeded task lists with resumable
//! checkpoints.

mod error;
mod geo;
mod io;
pub mod experiment;
pub mod logging;
pub mod model;
pub mod optimize;
pub mod ordering;
pub mod planners;
pub mod ptp;
pub mod shell;
pub mod shutdown;
pub mod space;
pub mod termination;
pub mod world;

pub(crate) use geo::{geometry, great_circle};

pub use error::{Error, Result};
pub use geo::{geometry::Point, great_circle::GreatCircleMetric};
pub use io::options::{ExperimentOptions, LogFormat, LogLevel};
pub use model::{
    configuration::Configuration,
    path::{PathSegment, PlanResult},
    target::Target,
};
pub use ptp::planner::PointToPointPlanner;
pub use space::{
    Goal, OptimizationObjective, PathLengthObjective, ProblemDefinition, SpaceInformation,
};
pub use termination::Termination;
