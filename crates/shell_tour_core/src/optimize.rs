//! Local path optimisation that only needs the validity checker.

use crate::{
    Configuration, OptimizationObjective, PathSegment, SpaceInformation, Termination,
    shell::Shell,
};

/// Greedy shortcutting: from each kept state, jump to the farthest later
/// state that a valid straight motion reaches. Endpoints are kept and the
/// Euclidean length never grows. Stops early (keeping the rest unchanged)
/// once `termination` fires.
pub fn shortcut(
    si: &dyn SpaceInformation,
    states: &[Configuration],
    termination: &Termination,
) -> Vec<Configuration> {
    if states.len() <= 2 {
        return states.to_vec();
    }

    let last = states.len() - 1;
    let mut out = vec![states[0].clone()];
    let mut i = 0usize;
    while i < last {
        if termination.should_stop() {
            out.extend_from_slice(&states[i + 1..]);
            return out;
        }
        let next = ((i + 2)..=last)
            .rev()
            .find(|&j| si.check_motion(&states[i], &states[j]))
            .unwrap_or(i + 1);
        out.push(states[next].clone());
        i = next;
    }
    out
}

/// Shortcuts `segment` and keeps the result only if `objective` prefers it.
pub fn optimize_segment(
    si: &dyn SpaceInformation,
    segment: PathSegment,
    objective: &dyn OptimizationObjective,
    termination: &Termination,
) -> PathSegment {
    let target = segment.target();
    let before = objective.path_cost(si, segment.states());
    let states = shortcut(si, segment.states(), termination);
    let after = objective.path_cost(si, &states);
    if after > before {
        return segment;
    }
    log::trace!(
        "optimize.segment: states={}->{} cost={before:.4}->{after:.4}",
        segment.state_count(),
        states.len()
    );
    match PathSegment::new(target, states) {
        Ok(optimized) => optimized,
        Err(_) => segment,
    }
}

/// Moves the shell end of an approach to where the approach leaves the shell
/// most directly.
///
/// Later approach states are projected onto the shell, from the goal end
/// backwards; the first projection that connects with a valid straight
/// motion shorter than the original prefix becomes the new first state.
/// The result is then shortcut.
pub fn optimize_exit(
    si: &dyn SpaceInformation,
    shell: &dyn Shell,
    approach: PathSegment,
    objective: &dyn OptimizationObjective,
    termination: &Termination,
) -> PathSegment {
    let target = approach.target();
    let states = approach.states();
    let mut best: Option<Vec<Configuration>> = None;

    for idx in (1..states.len()).rev() {
        if termination.should_stop() {
            break;
        }
        let projected = shell.project(&si.end_effector(&states[idx]));
        let Some(exit) = si.configuration_for_end_effector(&projected) else {
            continue;
        };
        let prefix = objective.path_cost(si, &states[..=idx]);
        if si.distance(&exit, &states[idx]) < prefix && si.check_motion(&exit, &states[idx]) {
            let mut rerouted = Vec::with_capacity(states.len() - idx + 1);
            rerouted.push(exit);
            rerouted.extend_from_slice(&states[idx..]);
            best = Some(rerouted);
            break;
        }
    }

    let reanchored = match best.map(|states| PathSegment::new(target, states)) {
        Some(Ok(segment)) => segment,
        _ => approach,
    };
    optimize_segment(si, reanchored, objective, termination)
}
