use std::collections::BTreeSet;

use crate::{Configuration, Error, Result};

/// Joint tolerance under which consecutive states are treated as the same.
pub const STATE_EPSILON: f64 = 1e-9;

/// Non-empty state sequence produced by one planning call, optionally tagged
/// with the index of the target it ends at.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSegment {
    target: Option<usize>,
    states: Vec<Configuration>,
}

impl PathSegment {
    pub fn new(target: Option<usize>, states: Vec<Configuration>) -> Result<Self> {
        if states.is_empty() {
            return Err(Error::invalid_data("path segment must hold at least one state"));
        }
        Ok(Self { target, states })
    }

    pub fn single(state: Configuration) -> Self {
        Self {
            target: None,
            states: vec![state],
        }
    }

    pub fn with_target(mut self, target: Option<usize>) -> Self {
        self.target = target;
        self
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn states(&self) -> &[Configuration] {
        &self.states
    }

    pub fn into_states(self) -> Vec<Configuration> {
        self.states
    }

    pub fn first(&self) -> &Configuration {
        &self.states[0]
    }

    pub fn last(&self) -> &Configuration {
        &self.states[self.states.len() - 1]
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn length(&self) -> f64 {
        self.states.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    /// Same states in reverse order, without a target tag.
    pub fn reversed(&self) -> Self {
        let mut states = self.states.clone();
        states.reverse();
        Self {
            target: None,
            states,
        }
    }

    /// Appends `states`, dropping a leading state that duplicates our last one.
    pub fn extend_states(&mut self, states: &[Configuration]) {
        let skip = usize::from(
            states
                .first()
                .is_some_and(|first| first.approx_eq(self.last(), STATE_EPSILON)),
        );
        self.states.extend(states.iter().skip(skip).cloned());
    }

    /// Appends `other`; the tag of the joined segment is `other`'s tag.
    pub fn append(&mut self, other: &PathSegment) {
        self.extend_states(&other.states);
        self.target = other.target;
    }
}

/// A full tour as a list of connected segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanResult {
    segments: Vec<PathSegment>,
}

impl PlanResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last_state(&self) -> Option<&Configuration> {
        self.segments.last().map(PathSegment::last)
    }

    pub fn length(&self) -> f64 {
        self.segments.iter().map(PathSegment::length).sum()
    }

    /// Number of distinct targets the tour ends a segment at.
    pub fn goals_visited(&self) -> usize {
        self.segments
            .iter()
            .filter_map(PathSegment::target)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Whether each segment starts where the previous one ended.
    pub fn is_connected(&self, tolerance: f64) -> bool {
        self.segments
            .windows(2)
            .all(|w| w[0].last().approx_eq(w[1].first(), tolerance))
    }
}
