use std::fmt::{Display, Formatter};

/// A solved route: start node, visited interior nodes, end node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    nodes: Vec<usize>,
    cost: i64,
}

impl Route {
    pub(crate) fn new(nodes: Vec<usize>, cost: i64) -> Self {
        Self { nodes, cost }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// The visited nodes without the start and end node.
    pub fn interior(&self) -> &[usize] {
        if self.nodes.len() < 2 {
            return &[];
        }
        &self.nodes[1..self.nodes.len() - 1]
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "nodes={} cost={}", self.nodes.len(), self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::Route;

    #[test]
    fn interior_strips_start_and_end() {
        let route = Route::new(vec![5, 2, 0, 1, 6], 12);
        assert_eq!(route.interior(), &[2, 0, 1]);
        assert_eq!(route.cost(), 12);
    }

    #[test]
    fn empty_interior_for_direct_route() {
        let route = Route::new(vec![0, 1], 0);
        assert!(route.interior().is_empty());
        assert_eq!(route.to_string(), "nodes=2 cost=0");
    }
}
