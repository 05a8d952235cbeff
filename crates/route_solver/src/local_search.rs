use crate::problem::RoutingProblem;

/// First-improvement local search over the interior of `route`.
///
/// The first and last entries of `route` are pinned. Each pass runs 2-opt,
/// relocate and same-group swap moves; the search ends after `max_passes`,
/// after a pass without improvement, or once `should_stop` returns true.
/// Returns the number of applied moves.
pub(crate) fn improve(
    problem: &RoutingProblem,
    route: &mut Vec<usize>,
    max_passes: usize,
    should_stop: &dyn Fn() -> bool,
) -> usize {
    if route.len() < 4 && problem.disjunctions().is_empty() {
        return 0;
    }

    let groups = problem.group_table();
    let mut applied = 0usize;
    for _ in 0..max_passes {
        if should_stop() {
            break;
        }
        let mut moves = two_opt_pass(problem, route, should_stop);
        moves += relocate_pass(problem, route, should_stop);
        moves += group_swap_pass(problem, route, &groups);
        applied += moves;
        if moves == 0 {
            break;
        }
    }
    applied
}

fn two_opt_pass(
    problem: &RoutingProblem,
    route: &mut [usize],
    should_stop: &dyn Fn() -> bool,
) -> usize {
    let last = route.len() - 1;
    let mut moves = 0usize;
    let mut i = 1usize;
    while i + 1 < last {
        if should_stop() {
            break;
        }
        let before = route[i - 1];
        // Forward and backward cost of the segment route[i..=j].
        let mut forward = 0i64;
        let mut backward = 0i64;
        let mut improved = false;
        for j in (i + 1)..last {
            forward += problem.cost(route[j - 1], route[j]);
            backward += problem.cost(route[j], route[j - 1]);
            let after = route[j + 1];
            let old = problem.cost(before, route[i]) + forward + problem.cost(route[j], after);
            let new = problem.cost(before, route[j]) + backward + problem.cost(route[i], after);
            if new < old {
                route[i..=j].reverse();
                moves += 1;
                improved = true;
                break;
            }
        }
        if !improved {
            i += 1;
        }
    }
    moves
}

fn relocate_pass(
    problem: &RoutingProblem,
    route: &mut Vec<usize>,
    should_stop: &dyn Fn() -> bool,
) -> usize {
    let mut moves = 0usize;
    let mut from = 1usize;
    while from + 1 < route.len() {
        if should_stop() {
            break;
        }
        let last = route.len() - 1;
        let node = route[from];
        let prev = route[from - 1];
        let next = route[from + 1];
        let removal_gain =
            problem.cost(prev, node) + problem.cost(node, next) - problem.cost(prev, next);

        let mut best: Option<(usize, i64)> = None;
        for k in 0..last {
            // Edges touching `node` are not insertion points.
            if k + 1 == from || k == from {
                continue;
            }
            let a = route[k];
            let b = route[k + 1];
            let delta = problem.cost(a, node) + problem.cost(node, b) - problem.cost(a, b)
                - removal_gain;
            if delta < 0 && best.is_none_or(|(_, best_delta)| delta < best_delta) {
                best = Some((k, delta));
            }
        }

        match best {
            Some((k, _)) => {
                route.remove(from);
                let insert_at = if k < from { k + 1 } else { k };
                route.insert(insert_at, node);
                moves += 1;
            }
            None => from += 1,
        }
    }
    moves
}

fn group_swap_pass(
    problem: &RoutingProblem,
    route: &mut [usize],
    groups: &[Option<usize>],
) -> usize {
    let disjunctions = problem.disjunctions();
    let mut moves = 0usize;
    for pos in 1..route.len().saturating_sub(1) {
        let node = route[pos];
        let Some(group) = groups[node] else {
            continue;
        };
        let prev = route[pos - 1];
        let next = route[pos + 1];
        let current = problem.cost(prev, node) + problem.cost(node, next);

        let mut best: Option<(usize, i64)> = None;
        for &alt in &disjunctions[group].nodes {
            if alt == node {
                continue;
            }
            let cost = problem.cost(prev, alt) + problem.cost(alt, next);
            if cost < current && best.is_none_or(|(_, best_cost)| cost < best_cost) {
                best = Some((alt, cost));
            }
        }
        if let Some((alt, _)) = best {
            route[pos] = alt;
            moves += 1;
        }
    }
    moves
}
