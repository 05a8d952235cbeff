use crate::{Error, Result, Termination};

/// Fixed-point scale applied to real-valued costs before routing.
pub const COST_SCALE: f64 = 1000.0;

/// Truncating fixed-point conversion; saturates on overflow and maps NaN to 0.
#[inline]
pub fn scale_cost(cost: f64) -> i64 {
    (cost * COST_SCALE) as i64
}

/// Integer cost matrix over `n` items plus a synthetic start node (index `n`)
/// and a synthetic free end node (index `n + 1`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistanceMatrix {
    items: usize,
    rows: Vec<Vec<i64>>,
}

impl DistanceMatrix {
    /// Builds the symmetric matrix, checking `termination` once per item row.
    ///
    /// The end node costs zero to and from every node, so the route may
    /// finish after any item. A NaN or infinite cost is an invariant
    /// violation.
    pub fn build(
        items: usize,
        from_start: impl Fn(usize) -> f64,
        between: impl Fn(usize, usize) -> f64,
        termination: &Termination,
    ) -> Result<Self> {
        let size = items + 2;
        let mut rows = vec![vec![0i64; size]; size];
        for i in 0..items {
            termination.check()?;
            for j in (i + 1)..items {
                let cost = finite_cost(between(i, j), || format!("between {i} and {j}"))?;
                rows[i][j] = cost;
                rows[j][i] = cost;
            }
            let start_cost = finite_cost(from_start(i), || format!("from start to {i}"))?;
            rows[items][i] = start_cost;
            rows[i][items] = start_cost;
        }
        Ok(Self { items, rows })
    }

    pub fn items(&self) -> usize {
        self.items
    }

    pub fn dimension(&self) -> usize {
        self.items + 2
    }

    pub fn start_node(&self) -> usize {
        self.items
    }

    pub fn end_node(&self) -> usize {
        self.items + 1
    }

    pub fn cost(&self, from: usize, to: usize) -> i64 {
        self.rows[from][to]
    }

    pub fn into_rows(self) -> Vec<Vec<i64>> {
        self.rows
    }
}

fn finite_cost(cost: f64, arc: impl FnOnce() -> String) -> Result<i64> {
    if cost.is_finite() {
        Ok(scale_cost(cost))
    } else {
        Err(Error::invariant(format!("ordering cost {} is {cost}", arc())))
    }
}
