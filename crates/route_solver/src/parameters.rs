use std::{
    fmt::{Display, Formatter},
    time::Duration,
};

const DEFAULT_IMPROVEMENT_PASSES: usize = 32;

/// How the initial route is built.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FirstSolutionStrategy {
    /// Repeatedly extend the route from its last node with the cheapest arc
    /// to a node that is still required.
    #[default]
    PathCheapestArc,
    /// Visit required nodes in index order (first member of each group).
    Sequential,
}

impl Display for FirstSolutionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathCheapestArc => write!(f, "PATH_CHEAPEST_ARC"),
            Self::Sequential => write!(f, "SEQUENTIAL"),
        }
    }
}

/// Search configuration for [`crate::solver::RouteSolver`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchParameters {
    pub first_solution_strategy: FirstSolutionStrategy,
    /// Upper bound on local-search passes; `0` keeps the first solution.
    pub improvement_passes: usize,
    /// Wall-clock limit on building the first solution.
    pub time_limit: Option<Duration>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            first_solution_strategy: FirstSolutionStrategy::PathCheapestArc,
            improvement_passes: DEFAULT_IMPROVEMENT_PASSES,
            time_limit: None,
        }
    }
}

impl SearchParameters {
    pub fn with_first_solution_strategy(mut self, strategy: FirstSolutionStrategy) -> Self {
        self.first_solution_strategy = strategy;
        self
    }

    pub fn with_improvement_passes(mut self, passes: usize) -> Self {
        self.improvement_passes = passes;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

impl Display for SearchParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "first_solution_strategy={} improvement_passes={}",
            self.first_solution_strategy, self.improvement_passes
        )?;
        match self.time_limit {
            Some(limit) => write!(f, " time_limit_s={:.3}", limit.as_secs_f64()),
            None => write!(f, " time_limit_s=none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{FirstSolutionStrategy, SearchParameters};

    #[test]
    fn defaults_use_path_cheapest_arc() {
        let params = SearchParameters::default();
        assert_eq!(
            params.first_solution_strategy,
            FirstSolutionStrategy::PathCheapestArc
        );
        assert!(params.time_limit.is_none());
    }

    #[test]
    fn display_lists_every_field() {
        let params = SearchParameters::default()
            .with_improvement_passes(3)
            .with_time_limit(Duration::from_millis(1500));
        assert_eq!(
            params.to_string(),
            "first_solution_strategy=PATH_CHEAPEST_ARC improvement_passes=3 time_limit_s=1.500"
        );
    }
}
