use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{
    Error, Result, Termination,
    geometry::Point,
    ordering::{
        heuristics::DistanceHeuristic,
        tsp::{RoutingSolver, tsp_open_end},
    },
};

/// How a target order is derived from a distance heuristic.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OrderingStrategyKind {
    /// Nearest unvisited target next.
    Greedy,
    /// Open-path routing over the heuristic costs.
    #[default]
    Routing,
}

impl OrderingStrategyKind {
    pub fn order(
        self,
        from: &Point,
        targets: &[Point],
        heuristic: &dyn DistanceHeuristic,
        routing: &dyn RoutingSolver,
        termination: &Termination,
    ) -> Result<Vec<usize>> {
        match self {
            Self::Greedy => greedy_order(from, targets, heuristic, termination),
            Self::Routing => tsp_open_end(
                routing,
                targets.len(),
                |i| heuristic.first_distance(from, &targets[i]),
                |i, j| heuristic.between_distance(&targets[i], &targets[j]),
                termination,
            ),
        }
    }
}

impl FromStr for OrderingStrategyKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "routing" | "tsp" => Ok(Self::Routing),
            other => Err(Error::invalid_input(format!(
                "unknown ordering strategy: {other} (expected greedy|routing)"
            ))),
        }
    }
}

impl Display for OrderingStrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greedy => write!(f, "greedy"),
            Self::Routing => write!(f, "routing"),
        }
    }
}

fn greedy_order(
    from: &Point,
    targets: &[Point],
    heuristic: &dyn DistanceHeuristic,
    termination: &Termination,
) -> Result<Vec<usize>> {
    let mut visited = vec![false; targets.len()];
    let mut order = Vec::with_capacity(targets.len());
    let mut current: Option<usize> = None;

    while order.len() < targets.len() {
        termination.check()?;
        let mut best: Option<(usize, f64)> = None;
        for (idx, target) in targets.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let cost = match current {
                None => heuristic.first_distance(from, target),
                Some(prev) => heuristic.between_distance(&targets[prev], target),
            };
            if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                best = Some((idx, cost));
            }
        }
        let Some((next, _)) = best else {
            break;
        };
        visited[next] = true;
        order.push(next);
        current = Some(next);
    }
    Ok(order)
}

/// Heuristic length of visiting `targets` in `order` starting from `from`.
pub fn ordering_heuristic_cost(
    from: &Point,
    order: &[usize],
    targets: &[Point],
    heuristic: &dyn DistanceHeuristic,
) -> f64 {
    let Some(&first) = order.first() else {
        return 0.0;
    };
    heuristic.first_distance(from, &targets[first])
        + order
            .windows(2)
            .map(|w| heuristic.between_distance(&targets[w[0]], &targets[w[1]]))
            .sum::<f64>()
}
