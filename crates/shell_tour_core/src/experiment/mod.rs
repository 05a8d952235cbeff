//! Experiment orchestration: seeded task lists, a worker pool and resumable
//! result checkpoints.

pub mod results;
pub mod runner;
pub mod tasks;
