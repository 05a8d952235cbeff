use crate::{
    Configuration, PlanResult, Result, Target, Termination,
    optimize::optimize_segment, planners::PlanningContext,
};

/// Chains point-to-point plans through `order`, each leg starting where the
/// previous one ended. Unreachable targets are skipped; a stop request
/// returns the chain built so far.
pub(crate) fn plan_chain(
    ctx: &mut PlanningContext,
    start: &Configuration,
    targets: &[Target],
    order: &[usize],
    optimize_segments: bool,
    termination: &Termination,
) -> Result<PlanResult> {
    let mut result = PlanResult::empty();
    let mut current = start.clone();
    let budget = ctx.ptp.default_budget();

    for &target_idx in order {
        if termination.should_stop() {
            log::debug!(
                "chain.plan: stopped visited={} of={}",
                result.goals_visited(),
                order.len()
            );
            break;
        }
        let Some(segment) = ctx.ptp.plan_to_target(
            ctx.si.as_ref(),
            &current,
            &targets[target_idx].position,
            budget,
            termination,
        )?
        else {
            log::debug!("chain.plan: unreachable target={}", targets[target_idx]);
            continue;
        };

        let mut segment = segment.with_target(Some(target_idx));
        if optimize_segments {
            segment =
                optimize_segment(ctx.si.as_ref(), segment, ctx.ptp.objective(), termination);
        }
        current = segment.last().clone();
        result.push(segment);
    }
    Ok(result)
}
