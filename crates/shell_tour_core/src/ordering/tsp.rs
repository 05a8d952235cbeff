use route_solver::{
    parameters::SearchParameters, problem::RoutingProblem, solver::RouteSolver,
};
use serde_json::{Value, json};

use crate::{Error, Result, Termination, ordering::matrix::DistanceMatrix};

/// Vehicle-routing backend: solves a single-vehicle problem and returns the
/// full node sequence from the start node to the end node.
pub trait RoutingSolver: Send {
    fn solve(&self, problem: RoutingProblem, termination: &Termination) -> Result<Vec<usize>>;

    fn name(&self) -> &str;

    fn parameters(&self) -> Value {
        json!({ "name": self.name() })
    }
}

/// In-process path-cheapest-arc construction plus local search.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheapestArcRouting {
    params: SearchParameters,
}

impl CheapestArcRouting {
    pub fn new(params: SearchParameters) -> Self {
        Self { params }
    }
}

impl RoutingSolver for CheapestArcRouting {
    fn solve(&self, problem: RoutingProblem, termination: &Termination) -> Result<Vec<usize>> {
        let route = RouteSolver::new(problem, self.params)?
            .run_until(|| termination.should_stop(), || termination.is_cancelled())?;
        Ok(route.nodes().to_vec())
    }

    fn name(&self) -> &str {
        "CheapestArcRouting"
    }

    fn parameters(&self) -> Value {
        json!({
            "name": self.name(),
            "first_solution_strategy": self.params.first_solution_strategy.to_string(),
            "improvement_passes": self.params.improvement_passes,
        })
    }
}

/// Open-path ordering of `items` items: fixed virtual start, free end.
///
/// Returns every item index exactly once.
pub fn tsp_open_end(
    solver: &dyn RoutingSolver,
    items: usize,
    from_start: impl Fn(usize) -> f64,
    between: impl Fn(usize, usize) -> f64,
    termination: &Termination,
) -> Result<Vec<usize>> {
    if items == 0 {
        return Ok(Vec::new());
    }
    let matrix = DistanceMatrix::build(items, from_start, between, termination)?;
    let (start, end) = (matrix.start_node(), matrix.end_node());
    let problem = RoutingProblem::from_matrix(matrix.into_rows(), start, end)?;
    solve_and_strip(solver, problem, items, termination)
}

/// Grouped open-path ordering: `groups` partitions `0..items` and exactly one
/// member of each group is visited. Returns one item per group.
pub fn tsp_open_end_grouped(
    solver: &dyn RoutingSolver,
    groups: &[Vec<usize>],
    from_start: impl Fn(usize) -> f64,
    between: impl Fn(usize, usize) -> f64,
    termination: &Termination,
) -> Result<Vec<usize>> {
    let items: usize = groups.iter().map(Vec::len).sum();
    validate_partition(groups, items)?;
    if items == 0 {
        return Ok(Vec::new());
    }

    let matrix = DistanceMatrix::build(items, from_start, between, termination)?;
    let (start, end) = (matrix.start_node(), matrix.end_node());
    let mut problem = RoutingProblem::from_matrix(matrix.into_rows(), start, end)?;
    for group in groups.iter().filter(|g| g.len() >= 2) {
        problem = problem.with_disjunction(group.clone())?;
    }
    solve_and_strip(solver, problem, items, termination)
}

fn solve_and_strip(
    solver: &dyn RoutingSolver,
    problem: RoutingProblem,
    items: usize,
    termination: &Termination,
) -> Result<Vec<usize>> {
    log::debug!("ordering.solve: solver={} {problem}", solver.name());
    let route = solver.solve(problem, termination)?;
    let order: Vec<usize> = route.into_iter().filter(|&node| node < items).collect();
    log::trace!("ordering.solve: done visited={}", order.len());
    Ok(order)
}

fn validate_partition(groups: &[Vec<usize>], items: usize) -> Result<()> {
    let mut seen = vec![false; items];
    for (group_idx, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(Error::invalid_input(format!("ordering group {group_idx} is empty")));
        }
        for &item in group {
            if item >= items || seen[item] {
                return Err(Error::invalid_input(format!(
                    "ordering groups must partition 0..{items}; item {item} in group {group_idx} \
                     is out of range or repeated"
                )));
            }
            seen[item] = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{CheapestArcRouting, tsp_open_end, tsp_open_end_grouped};
    use crate::{Termination, geometry::Point};

    fn line(xs: &[f64]) -> Vec<Point> {
        xs.iter().map(|&x| Point::new(x, 0.0, 0.0)).collect()
    }

    fn order_points(points: &[Point], from: Point) -> Vec<usize> {
        tsp_open_end(
            &CheapestArcRouting::default(),
            points.len(),
            |i| nalgebra::distance(&from, &points[i]),
            |i, j| nalgebra::distance(&points[i], &points[j]),
            &Termination::never(),
        )
        .expect("order")
    }

    #[test]
    fn empty_problem_orders_nothing() {
        assert!(order_points(&[], Point::origin()).is_empty());
    }

    #[test]
    fn points_on_a_line_are_swept_outward() {
        let points = line(&[3.0, 1.0, 4.0, 2.0]);
        assert_eq!(order_points(&points, Point::origin()), vec![1, 3, 0, 2]);
    }

    #[test]
    fn open_end_does_not_return_to_start() {
        // Start in the middle: the cheapest open path finishes on the far side.
        let points = line(&[-1.0, 10.0, 11.0, -2.0]);
        let order = order_points(&points, Point::origin());
        assert_eq!(order, vec![0, 3, 1, 2]);
    }

    #[test]
    fn grouped_variant_visits_one_member_per_group() {
        let points = line(&[5.0, 1.0, 9.0, 2.0, 7.0]);
        let groups = vec![vec![0, 1], vec![2, 3], vec![4]];
        let order = tsp_open_end_grouped(
            &CheapestArcRouting::default(),
            &groups,
            |i| points[i].x.abs(),
            |i, j| (points[i].x - points[j].x).abs(),
            &Termination::never(),
        )
        .expect("order");
        assert_eq!(order, vec![1, 3, 4]);
    }

    #[test]
    fn grouped_variant_rejects_overlapping_groups() {
        let err = tsp_open_end_grouped(
            &CheapestArcRouting::default(),
            &[vec![0, 1], vec![1]],
            |_| 1.0,
            |_, _| 1.0,
            &Termination::never(),
        )
        .expect_err("overlap");
        assert!(err.to_string().contains("partition"));
    }

    #[test]
    fn cancellation_surfaces_as_cancelled() {
        let termination = Termination::never();
        termination.cancel();
        let err = tsp_open_end(
            &CheapestArcRouting::default(),
            3,
            |_| 1.0,
            |_, _| 1.0,
            &termination,
        )
        .expect_err("cancelled");
        assert!(err.is_cancelled());
    }

    proptest! {
        #[test]
        fn order_is_a_permutation(
            coords in proptest::collection::vec(proptest::array::uniform3(-5.0f64..5.0), 0..20)
        ) {
            let points: Vec<Point> = coords.iter().map(|c| Point::new(c[0], c[1], c[2])).collect();
            let mut order = order_points(&points, Point::new(6.0, 0.0, 0.0));
            order.sort_unstable();
            prop_assert_eq!(order, (0..points.len()).collect::<Vec<_>>());
        }

        #[test]
        fn order_is_deterministic(
            coords in proptest::collection::vec(proptest::array::uniform3(-5.0f64..5.0), 1..16)
        ) {
            let points: Vec<Point> = coords.iter().map(|c| Point::new(c[0], c[1], c[2])).collect();
            let first = order_points(&points, Point::origin());
            let second = order_points(&points, Point::origin());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn grouped_order_picks_one_per_group(
            coords in proptest::collection::vec(proptest::array::uniform3(-5.0f64..5.0), 2..18),
            group_size in 1usize..4,
        ) {
            let points: Vec<Point> = coords.iter().map(|c| Point::new(c[0], c[1], c[2])).collect();
            let groups: Vec<Vec<usize>> = (0..points.len())
                .collect::<Vec<_>>()
                .chunks(group_size)
                .map(<[usize]>::to_vec)
                .collect();
            let order = tsp_open_end_grouped(
                &CheapestArcRouting::default(),
                &groups,
                |i| nalgebra::distance(&Point::origin(), &points[i]),
                |i, j| nalgebra::distance(&points[i], &points[j]),
                &Termination::never(),
            )
            .expect("order");
            prop_assert_eq!(order.len(), groups.len());
            for group in &groups {
                prop_assert_eq!(order.iter().filter(|i| group.contains(i)).count(), 1);
            }
        }
    }
}
