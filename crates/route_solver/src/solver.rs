use std::time::Instant;

use crate::{
    RouteError, RouteResult, construction, local_search,
    parameters::SearchParameters,
    problem::RoutingProblem,
    route::Route,
};

/// In-process solver: cheapest-arc construction followed by local search.
#[derive(Debug)]
pub struct RouteSolver {
    problem: RoutingProblem,
    params: SearchParameters,
}

impl RouteSolver {
    pub fn new(problem: RoutingProblem, params: SearchParameters) -> RouteResult<Self> {
        let required = problem.required_visits();
        if required > problem.dimension() - 2 {
            return Err(RouteError::invalid_data(format!(
                "problem requires {required} visits but has {} interior nodes",
                problem.dimension() - 2
            )));
        }
        Ok(Self { problem, params })
    }

    pub fn problem(&self) -> &RoutingProblem {
        &self.problem
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn run(&self) -> RouteResult<Route> {
        self.run_until(|| false, || false)
    }

    /// Solves the problem, polling for stop requests between steps.
    ///
    /// Construction polls `should_stop`, `cancelled` and the configured time
    /// limit, and fails with [`RouteError::Cancelled`] when any of them fires.
    /// Local search is bounded by `improvement_passes` and polls `cancelled`
    /// only, returning the best route so far. Without cancellation, equal
    /// inputs that get past construction produce the same route.
    pub fn run_until(
        &self,
        should_stop: impl Fn() -> bool,
        cancelled: impl Fn() -> bool,
    ) -> RouteResult<Route> {
        let started = Instant::now();
        let deadline = self.params.time_limit.map(|limit| started + limit);
        let stop = || {
            should_stop() || cancelled() || deadline.is_some_and(|at| Instant::now() >= at)
        };

        let mut nodes =
            construction::initial_route(&self.problem, self.params.first_solution_strategy, &stop)?;
        let initial_cost = self.problem.route_cost(&nodes);

        let moves = local_search::improve(
            &self.problem,
            &mut nodes,
            self.params.improvement_passes,
            &cancelled,
        );
        let cost = self.problem.route_cost(&nodes);

        log::debug!(
            "route_solver.search: {} initial_cost={} cost={} moves={} secs={:.3}",
            self.problem,
            initial_cost,
            cost,
            moves,
            started.elapsed().as_secs_f64()
        );

        Ok(Route::new(nodes, cost))
    }
}
