use std::fmt::{Display, Formatter};

use crate::{RouteError, RouteResult};

/// A "visit exactly one of" constraint over a set of nodes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Disjunction {
    pub nodes: Vec<usize>,
}

/// Single-vehicle routing problem over an explicit square cost matrix.
///
/// The vehicle leaves `start`, visits every node that is not covered by a
/// disjunction plus exactly one member of every disjunction, and finishes at
/// `end`. Costs are stored row-major; `cost(i, j)` is the arc cost `i -> j`.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingProblem {
    dimension: usize,
    costs: Vec<i64>,
    start: usize,
    end: usize,
    disjunctions: Vec<Disjunction>,
}

impl RoutingProblem {
    pub fn from_matrix(rows: Vec<Vec<i64>>, start: usize, end: usize) -> RouteResult<Self> {
        let dimension = rows.len();
        if dimension < 2 {
            return Err(RouteError::invalid_input(format!(
                "cost matrix needs at least 2 nodes, got {dimension}"
            )));
        }
        if start >= dimension || end >= dimension {
            return Err(RouteError::invalid_input(format!(
                "start={start} end={end} out of bounds for dimension {dimension}"
            )));
        }
        if start == end {
            return Err(RouteError::invalid_input(
                "start and end must be distinct nodes",
            ));
        }

        let limit = arc_cost_limit(dimension);
        let mut costs = Vec::with_capacity(dimension * dimension);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(RouteError::invalid_input(format!(
                    "row {idx} has {} columns, expected {dimension}",
                    row.len()
                )));
            }
            if let Some(col) = row.iter().position(|cost| cost.unsigned_abs() > limit as u64) {
                return Err(RouteError::invalid_data(format!(
                    "arc {idx}->{col} costs {}, beyond the limit {limit} for dimension {dimension}",
                    row[col]
                )));
            }
            costs.extend(row);
        }

        Ok(Self {
            dimension,
            costs,
            start,
            end,
            disjunctions: Vec::new(),
        })
    }

    /// Registers a group of nodes of which exactly one must be visited.
    pub fn with_disjunction(mut self, nodes: Vec<usize>) -> RouteResult<Self> {
        if nodes.is_empty() {
            return Err(RouteError::invalid_input("disjunction must not be empty"));
        }
        for &node in &nodes {
            if node >= self.dimension {
                return Err(RouteError::invalid_input(format!(
                    "disjunction node {node} out of bounds for dimension {}",
                    self.dimension
                )));
            }
            if node == self.start || node == self.end {
                return Err(RouteError::invalid_input(format!(
                    "disjunction node {node} is the start or end node"
                )));
            }
            if self.disjunction_of(node).is_some() {
                return Err(RouteError::invalid_input(format!(
                    "node {node} already belongs to a disjunction"
                )));
            }
        }
        let mut sorted = nodes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != nodes.len() {
            return Err(RouteError::invalid_input(
                "disjunction contains duplicate nodes",
            ));
        }

        self.disjunctions.push(Disjunction { nodes });
        Ok(self)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }

    #[inline]
    pub fn cost(&self, from: usize, to: usize) -> i64 {
        self.costs[from * self.dimension + to]
    }

    pub fn disjunction_of(&self, node: usize) -> Option<usize> {
        self.disjunctions
            .iter()
            .position(|d| d.nodes.contains(&node))
    }

    /// Per-node disjunction index, `None` for start, end and mandatory nodes.
    pub(crate) fn group_table(&self) -> Vec<Option<usize>> {
        let mut table = vec![None; self.dimension];
        for (group, disjunction) in self.disjunctions.iter().enumerate() {
            for &node in &disjunction.nodes {
                table[node] = Some(group);
            }
        }
        table
    }

    /// Number of interior nodes a feasible route visits.
    pub fn required_visits(&self) -> usize {
        let grouped: usize = self.disjunctions.iter().map(|d| d.nodes.len()).sum();
        (self.dimension - 2 - grouped) + self.disjunctions.len()
    }

    pub fn route_cost(&self, nodes: &[usize]) -> i64 {
        nodes
            .windows(2)
            .fold(0i64, |total, w| total.saturating_add(self.cost(w[0], w[1])))
    }
}

/// Largest arc cost magnitude accepted for a matrix of `dimension` nodes.
///
/// Route costs and local-search move deltas sum at most `dimension + 8` arcs,
/// so every such sum stays inside `i64`.
pub fn arc_cost_limit(dimension: usize) -> i64 {
    i64::MAX / (dimension as i64 + 8)
}

impl Display for RoutingProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dimension={} start={} end={} disjunctions={}",
            self.dimension,
            self.start,
            self.end,
            self.disjunctions.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RoutingProblem;
    use crate::RouteError;

    fn square(n: usize) -> Vec<Vec<i64>> {
        (0..n)
            .map(|i| (0..n).map(|j| (i as i64 - j as i64).abs()).collect())
            .collect()
    }

    #[test]
    fn from_matrix_rejects_ragged_rows() {
        let mut rows = square(4);
        rows[2].pop();
        let err = RoutingProblem::from_matrix(rows, 2, 3).expect_err("ragged should fail");
        assert!(err.to_string().contains("row 2 has 3 columns"));
    }

    #[test]
    fn from_matrix_rejects_costs_that_could_overflow_a_route() {
        let mut rows = square(4);
        rows[1][3] = i64::MAX;
        let err = RoutingProblem::from_matrix(rows, 2, 3).expect_err("huge arc");
        assert!(matches!(err, RouteError::InvalidData(_)));
        assert!(err.to_string().contains("arc 1->3"));

        let mut rows = square(4);
        rows[0][1] = super::arc_cost_limit(4);
        let problem = RoutingProblem::from_matrix(rows, 2, 3).expect("at the limit");
        assert_eq!(problem.route_cost(&[2, 0, 1, 3]), super::arc_cost_limit(4) + 4);
    }

    #[test]
    fn from_matrix_rejects_same_start_and_end() {
        let err = RoutingProblem::from_matrix(square(3), 1, 1).expect_err("start == end");
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn cost_reads_row_major() {
        let problem = RoutingProblem::from_matrix(square(4), 2, 3).expect("problem");
        assert_eq!(problem.cost(0, 3), 3);
        assert_eq!(problem.cost(3, 1), 2);
        assert_eq!(problem.route_cost(&[2, 0, 1, 3]), 2 + 1 + 2);
    }

    #[test]
    fn disjunctions_must_be_disjoint_and_interior() {
        let problem = RoutingProblem::from_matrix(square(6), 4, 5)
            .expect("problem")
            .with_disjunction(vec![0, 1])
            .expect("first group");

        assert!(problem.clone().with_disjunction(vec![1, 2]).is_err());
        assert!(problem.clone().with_disjunction(vec![4]).is_err());
        assert!(problem.clone().with_disjunction(vec![2, 2]).is_err());
        assert!(problem.clone().with_disjunction(vec![9]).is_err());

        let problem = problem.with_disjunction(vec![2, 3]).expect("second group");
        assert_eq!(problem.disjunction_of(3), Some(1));
        assert_eq!(problem.required_visits(), 2);
    }
}
