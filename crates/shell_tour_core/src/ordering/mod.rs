pub mod heuristics;
pub mod matrix;
pub mod strategy;
pub mod tsp;
