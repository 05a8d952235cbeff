use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde_json::Value;

use crate::{Configuration, Result, Target, planners::config::PlannerConfig, world::scene::Scene};

/// Mixed into the experiment seed for the task shuffle so it is independent
/// of problem generation.
const TASK_SHUFFLE_SALT: u64 = 0x5eed_7a5c;

/// One start configuration and target subset in one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanningProblem {
    pub id: usize,
    pub scene: Arc<Scene>,
    pub start: Configuration,
    pub targets: Vec<Target>,
    /// Per-problem seed for the planning context (oracle randomness).
    pub seed: u64,
}

/// A (planner configuration, planning problem) pair at a fixed position of
/// the shuffled task list.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub index: usize,
    pub planner: PlannerConfig,
    pub planner_name: String,
    pub planner_parameters: Value,
    pub problem: Arc<PlanningProblem>,
}

impl Task {
    pub fn scene_name(&self) -> &str {
        &self.problem.scene.name
    }

    pub fn target_count(&self) -> usize {
        self.problem.targets.len()
    }
}

/// Problems for every scene × target count × run, all drawn from one
/// seeded stream so the list is reproducible. Subset sizes larger than a
/// scene's target set are clamped.
pub fn generate_problems(
    scenes: &[Arc<Scene>],
    target_counts: &[usize],
    runs: usize,
    start_clearance: f64,
    seed: u64,
) -> Result<Vec<Arc<PlanningProblem>>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut problems = Vec::with_capacity(scenes.len() * target_counts.len() * runs);

    for scene in scenes {
        for &requested in target_counts {
            let count = requested.min(scene.targets.len());
            if count < requested {
                log::warn!(
                    "experiment.tasks: clamped scene={} requested={requested} available={count}",
                    scene.name
                );
            }
            for _ in 0..runs {
                let mut picked: Vec<usize> = (0..scene.targets.len()).collect();
                picked.shuffle(&mut rng);
                picked.truncate(count);
                picked.sort_unstable();

                let start = scene.start_position(&mut rng, start_clearance)?;
                problems.push(Arc::new(PlanningProblem {
                    id: problems.len(),
                    scene: Arc::clone(scene),
                    start: Configuration::from_point(&start),
                    targets: picked.iter().map(|&i| scene.targets[i].clone()).collect(),
                    seed: rng.random(),
                }));
            }
        }
    }
    Ok(problems)
}

/// Cross product of planners and problems in a seeded shuffled order.
pub fn generate_tasks(
    planners: &[PlannerConfig],
    problems: &[Arc<PlanningProblem>],
    seed: u64,
) -> Vec<Task> {
    let identities: Vec<(String, Value)> = planners
        .iter()
        .map(|config| {
            let planner = config.allocate();
            (planner.name(), planner.parameters())
        })
        .collect();

    let mut pairs: Vec<(usize, usize)> = (0..planners.len())
        .flat_map(|p| (0..problems.len()).map(move |q| (p, q)))
        .collect();
    pairs.shuffle(&mut StdRng::seed_from_u64(seed ^ TASK_SHUFFLE_SALT));

    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (p, q))| Task {
            index,
            planner: planners[p].clone(),
            planner_name: identities[p].0.clone(),
            planner_parameters: identities[p].1.clone(),
            problem: Arc::clone(&problems[q]),
        })
        .collect()
}
