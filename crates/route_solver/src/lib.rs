//! `route_solver` solves single-vehicle routing problems over explicit
//! integer cost matrices, with a fixed start node and a fixed end node.
//!
//! It is intended for callers that want to:
//! - build a square cost matrix in Rust,
//! - mark groups of nodes where visiting exactly one member is enough,
//! - get back the visiting order as a `Vec<usize>` of node ids.
//!
//! # Quickstart
//!
//! ```
//! use route_solver::{
//!     parameters::SearchParameters,
//!     problem::RoutingProblem,
//!     solver::RouteSolver,
//! };
//!
//! fn main() -> route_solver::RouteResult<()> {
//!     // Nodes 0..=2 are items, 3 is the start and 4 the free end.
//!     let problem = RoutingProblem::from_matrix(
//!         vec![
//!             vec![0, 5, 9, 1, 0],
//!             vec![5, 0, 4, 6, 0],
//!             vec![9, 4, 0, 10, 0],
//!             vec![1, 6, 10, 0, 0],
//!             vec![0, 0, 0, 0, 0],
//!         ],
//!         3,
//!         4,
//!     )?;
//!
//!     let route = RouteSolver::new(problem, SearchParameters::default())?.run()?;
//!     assert_eq!(route.interior(), &[0, 1, 2]);
//!     Ok(())
//! }
//! ```

pub mod parameters;
pub mod problem;
pub mod route;
pub mod solver;

mod construction;
mod error;
mod local_search;

pub use error::{RouteError, RouteResult};
