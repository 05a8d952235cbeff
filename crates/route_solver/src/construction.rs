use crate::{
    RouteError, RouteResult, parameters::FirstSolutionStrategy, problem::RoutingProblem,
};

/// Builds a feasible start..end route with the requested strategy.
///
/// `should_stop` is polled once per appended node; stopping before the route
/// is complete yields [`RouteError::Cancelled`].
pub(crate) fn initial_route(
    problem: &RoutingProblem,
    strategy: FirstSolutionStrategy,
    should_stop: &dyn Fn() -> bool,
) -> RouteResult<Vec<usize>> {
    let groups = problem.group_table();
    let mut group_done = vec![false; problem.disjunctions().len()];
    let mut visited = vec![false; problem.dimension()];
    visited[problem.start()] = true;
    visited[problem.end()] = true;

    let required = problem.required_visits();
    let mut route = Vec::with_capacity(required + 2);
    route.push(problem.start());

    while route.len() <= required {
        if should_stop() {
            return Err(RouteError::Cancelled);
        }

        let last = route[route.len() - 1];
        let candidates = (0..problem.dimension()).filter(|&node| {
            !visited[node] && groups[node].is_none_or(|group| !group_done[group])
        });

        let next = match strategy {
            FirstSolutionStrategy::PathCheapestArc => {
                let mut best: Option<(usize, i64)> = None;
                for node in candidates {
                    let cost = problem.cost(last, node);
                    if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                        best = Some((node, cost));
                    }
                }
                best.map(|(node, _)| node)
            }
            FirstSolutionStrategy::Sequential => candidates.min(),
        };

        let Some(next) = next else {
            return Err(RouteError::invalid_data(format!(
                "ran out of candidates after {} of {required} visits",
                route.len() - 1
            )));
        };

        visited[next] = true;
        if let Some(group) = groups[next] {
            group_done[group] = true;
        }
        route.push(next);
    }

    route.push(problem.end());
    Ok(route)
}
